//! Field descriptors: the declarative schema a [`Record`](super::Record)
//! returns from `fields()`, one entry per annotated struct field in the
//! original reflection-based design (`np:"<name>,<opt>,..."` struct tags).
//!
//! Rust has no runtime struct-tag reflection, so the annotation syntax is
//! realized as a small builder API instead: a `Record` impl constructs this
//! list by hand, one [`Field`] per child/splat/stat component it wants to
//! contribute.

use bitflags::bitflags;

use crate::fcall::{QId, Stat};
use crate::ffs::node_value::NodeValue;

bitflags! {
    /// Extra mode bits a child field ORs into its node's default 0o444,
    /// mirroring the `write`/`exec` annotation options.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
    pub struct FieldMode: u32 {
        const WRITE = 0o222;
        const EXEC  = 0o111;
    }
}

/// One field descriptor contributed by a [`Record`](super::Record).
///
/// A record's `fields()` call returns a mix of [`Field::Child`]/
/// [`Field::Splat`] entries (which make the record present as a
/// directory) and the `Stat`-component variants (`qid`, `name`, `len`,
/// ... — the `special` fields of the original annotation syntax), which
/// contribute to the record's own `Stat` regardless of whether it also
/// has children.
pub enum Field {
    /// A named child. Default node mode is 0o444; `mode` ORs in
    /// [`FieldMode::WRITE`]/[`FieldMode::EXEC`] on top of that.
    Child {
        name: String,
        mode: FieldMode,
        value: NodeValue,
    },
    /// The field's value must convert to a [`Dir`](crate::node::Dir);
    /// its children are hoisted into the enclosing directory's listing.
    /// Collisions with explicit `Child` names (or earlier splats) are
    /// resolved first-wins.
    Splat(NodeValue),
    /// This field supplies the record's initial `Stat` value, which the
    /// other special fields and `Params` are then layered on top of.
    Stat(Stat),
    Qid(QId),
    Name(String),
    Len(u64),
    Typ(u16),
    Dev(u32),
    Ver(u32),
    /// Seconds since the Unix epoch.
    Atime(u32),
    /// Seconds since the Unix epoch.
    Mtime(u32),
    Uid(String),
    Gid(String),
    Muid(String),
}

impl Field {
    /// A read-only child (default mode 0o444, no extra bits).
    pub fn child(name: impl Into<String>, value: impl Into<NodeValue>) -> Field {
        Field::Child {
            name: name.into(),
            mode: FieldMode::empty(),
            value: value.into(),
        }
    }

    /// A child with extra mode bits ORed in (`write`/`exec` annotations).
    pub fn child_mode(name: impl Into<String>, mode: FieldMode, value: impl Into<NodeValue>) -> Field {
        Field::Child {
            name: name.into(),
            mode,
            value: value.into(),
        }
    }

    /// The `omitnil` annotation's Rust-idiomatic translation: the field
    /// is only present in the returned `fields()` list when `value` is
    /// `Some`, so a record built from an `Option<T>` simply omits the
    /// child by returning `None` here rather than needing a sentinel
    /// "nil" node value.
    pub fn child_opt(
        name: impl Into<String>,
        mode: FieldMode,
        value: Option<impl Into<NodeValue>>,
    ) -> Option<Field> {
        value.map(|v| Field::Child {
            name: name.into(),
            mode,
            value: v.into(),
        })
    }

    /// A splat field (`splat` annotation).
    pub fn splat(value: impl Into<NodeValue>) -> Field {
        Field::Splat(value.into())
    }
}
