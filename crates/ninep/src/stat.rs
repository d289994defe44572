//! The stat decorator pipeline: fills empty stat fields before a `Stat` is
//! sent to the client.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::fcall::{Stat, dm};

/// A decorator run over every `Stat` leaving the session, in registration
/// order, before the engine's own qid-filling pass.
///
/// `qid_only` is `true` during `Walk`'s intermediate steps, when only the
/// qid portion of the stat will ever reach the client, and `false` for
/// `Stat`/`Open`/`Attach`.
pub type StatModifierFn = Box<dyn Fn(&[String], &mut Stat, bool) -> Result<()> + Send + Sync>;

/// Sets empty owner/group/modifier identities.
pub fn default_owner(user: impl Into<String>, group: impl Into<String>) -> StatModifierFn {
    let user = user.into();
    let group = group.into();
    Box::new(move |_path, st, qid_only| {
        if qid_only {
            return Ok(());
        }
        if st.uid.is_empty() {
            st.uid = user.clone();
        }
        if st.gid.is_empty() {
            st.gid = group.clone();
        }
        if st.muid.is_empty() {
            st.muid = user.clone();
        }
        Ok(())
    })
}

/// Clears the given mode bits from every stat.
pub fn umask(bits: u32) -> StatModifierFn {
    Box::new(move |_path, st, _qid_only| {
        st.mode &= !bits;
        Ok(())
    })
}

/// Assigns "now" to any unset atime/mtime.
pub fn default_now() -> StatModifierFn {
    Box::new(move |_path, st, qid_only| {
        if qid_only {
            return Ok(());
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        if st.atime == 0 {
            st.atime = now;
        }
        if st.mtime == 0 {
            st.mtime = now;
        }
        Ok(())
    })
}

/// 64-bit FNV-1a over the concatenation of `path`'s components.
pub fn fnv1a_path_hash(path: &[String]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for component in path {
        for byte in component.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// Runs the decorator pipeline followed by the engine's own qid-filling
/// pass: sets the qid's directory bit when `Stat.mode` indicates a
/// directory (if unset), and derives `qid.path` from `path` by FNV-1a
/// (if unset).
pub fn fill_stat(
    decorators: &[StatModifierFn],
    path: &[String],
    st: &mut Stat,
    qid_only: bool,
) -> Result<()> {
    for decorator in decorators {
        decorator(path, st, qid_only)?;
    }

    if st.qid.typ.bits() == 0 && st.is_dir() {
        st.qid.typ = crate::fcall::QIdType::DIR;
    }
    if st.qid.path == 0 {
        st.qid.path = fnv1a_path_hash(path);
    }

    Ok(())
}

/// Whether `mode` has the directory bit set (convenience for callers
/// building a `Stat` by hand before it's gone through `fill_stat`).
pub fn mode_is_dir(mode: u32) -> bool {
    mode & dm::DIR != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcall::{QId, QIdType};

    fn blank_stat() -> Stat {
        Stat {
            typ: 0,
            dev: 0,
            qid: QId::default(),
            mode: 0,
            atime: 0,
            mtime: 0,
            length: 0,
            name: String::new(),
            uid: String::new(),
            gid: String::new(),
            muid: String::new(),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let path = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(fnv1a_path_hash(&path), fnv1a_path_hash(&path));
        assert_ne!(fnv1a_path_hash(&path), fnv1a_path_hash(&["a".to_owned()]));
    }

    #[test]
    fn fill_stat_derives_qid_path_and_dir_bit() {
        let mut st = blank_stat();
        st.mode = dm::DIR | 0o555;
        let path = vec!["sub".to_owned()];
        fill_stat(&[], &path, &mut st, false).unwrap();
        assert_eq!(st.qid.typ, QIdType::DIR);
        assert_eq!(st.qid.path, fnv1a_path_hash(&path));
    }

    #[test]
    fn default_owner_only_applies_when_not_qid_only() {
        let dec = default_owner("glenda", "glenda");
        let mut st = blank_stat();
        dec(&[], &mut st, true).unwrap();
        assert!(st.uid.is_empty());
        dec(&[], &mut st, false).unwrap();
        assert_eq!(st.uid, "glenda");
        assert_eq!(st.muid, "glenda");
    }

    #[test]
    fn umask_clears_bits() {
        let dec = umask(0o222);
        let mut st = blank_stat();
        st.mode = 0o777;
        dec(&[], &mut st, false).unwrap();
        assert_eq!(st.mode, 0o555);
    }
}
