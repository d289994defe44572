//! Session configuration: message-size negotiation, debug logging flags,
//! and the stat decorator pipeline.

use bitflags::bitflags;

use crate::fcall::DEFAULT_MSIZE;
use crate::stat::{StatModifierFn, default_now, default_owner, umask};

bitflags! {
    /// Flags controlling what the session engine logs via the `log` facade.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
    pub struct DebugFlags: u32 {
        const RECEIVED       = 0x01;
        const SENT           = 0x02;
        const FLUSH          = 0x04;
        const MESSAGES       = Self::RECEIVED.bits() | Self::SENT.bits() | Self::FLUSH.bits();
        const DATA           = 0x08;
        const KNOWN_ERRORS   = 0x10;
        const UNKNOWN_ERRORS = 0x20;
        const ERRORS         = Self::KNOWN_ERRORS.bits() | Self::UNKNOWN_ERRORS.bits();
        const ALL            = Self::MESSAGES.bits() | Self::ERRORS.bits();
    }
}

/// A session configuration change, composed at session start.
///
/// A plain-function option: each `Option` is applied in order to a freshly
/// constructed [`Config`].
pub type Option = Box<dyn FnOnce(&mut Config) + Send>;

/// Resolved session configuration after applying all `Option`s.
pub struct Config {
    pub msize: u32,
    pub debug: DebugFlags,
    pub stat_modifiers: Vec<StatModifierFn>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            msize: DEFAULT_MSIZE,
            debug: DebugFlags::empty(),
            stat_modifiers: Vec::new(),
        }
    }
}

impl Config {
    pub fn build(opts: impl IntoIterator<Item = Option>) -> Config {
        let mut cfg = Config::default();
        for opt in opts {
            opt(&mut cfg);
        }
        cfg
    }
}

/// Set the maximum negotiated message size.
pub fn msize(bytes: u32) -> Option {
    Box::new(move |cfg: &mut Config| cfg.msize = bytes)
}

/// Enable the given debug-logging flags.
pub fn debug(flags: DebugFlags) -> Option {
    Box::new(move |cfg: &mut Config| cfg.debug |= flags)
}

/// Append a stat decorator to the pipeline.
pub fn stat_modifier(f: StatModifierFn) -> Option {
    Box::new(move |cfg: &mut Config| cfg.stat_modifiers.push(f))
}

/// Convenience decorator: fill empty owner/group/modifier identities.
pub fn default_owner_opt(user: impl Into<String> + 'static, group: impl Into<String> + 'static) -> Option {
    stat_modifier(default_owner(user, group))
}

/// Convenience decorator: clear the given mode bits from every stat.
pub fn umask_opt(bits: u32) -> Option {
    stat_modifier(umask(bits))
}

/// Convenience decorator: fill unset atime/mtime with the current time.
pub fn default_now_opt() -> Option {
    stat_modifier(default_now())
}
