//! Per-message operation handlers: Version, Auth, Attach, Walk, Open, Read,
//! Write, Clunk, Stat, Create, Remove, Wstat. `Flush` is handled by the
//! session engine itself (it mutates the tag table, not the fid table).

use std::sync::Arc;

use crate::error::{Error, Proto, Result};
use crate::fcall::{Data, FCall, P92000, QId, QIdType, Stat};
use crate::fid::FidState;
use crate::node::{self, Node};
use crate::session::SessionState;

/// Dispatch one decoded request body against session state, producing the
/// reply body. `Tflush` is handled by the caller (it mutates the tag
/// table, not the fid table); everything else, including `Tversion`,
/// passes through here.
pub async fn handle(state: &SessionState, req: &FCall) -> Result<FCall> {
    match req {
        FCall::TVersion { version, .. } => version_handler(state, version),
        FCall::TAuth { .. } => auth_handler(),
        FCall::TAttach { fid, .. } => attach_handler(state, *fid).await,
        FCall::TWalk {
            fid,
            newfid,
            wnames,
        } => walk_handler(state, *fid, *newfid, wnames).await,
        FCall::TOpen { fid, mode } => open_handler(state, *fid, *mode).await,
        FCall::TCreate { .. } => Err(Error::Proto(Proto::NoCreate)),
        FCall::TRead {
            fid,
            offset,
            count,
        } => read_handler(state, *fid, *offset, *count).await,
        FCall::TWrite { fid, offset, data } => {
            write_handler(state, *fid, *offset, &data.0).await
        }
        FCall::TClunk { fid } => clunk_handler(state, *fid).await,
        FCall::TRemove { .. } => Err(Error::Proto(Proto::NoRemove)),
        FCall::TStat { fid } => stat_handler(state, *fid).await,
        FCall::TWStat { .. } => Ok(FCall::RWStat),
        FCall::TFlush { .. } => Ok(FCall::RFlush),
        _ => Err(Error::Proto(Proto::Botch)),
    }
}

fn version_handler(state: &SessionState, _client_version: &str) -> Result<FCall> {
    Ok(FCall::RVersion {
        msize: state.msize,
        version: P92000.to_owned(),
    })
}

/// Authentication is a no-op: every attach is accepted without a separate
/// auth exchange, so this always succeeds with a fixed auth qid.
fn auth_handler() -> Result<FCall> {
    Ok(FCall::RAuth {
        aqid: QId {
            typ: QIdType::AUTH,
            version: 0,
            path: 0,
        },
    })
}

/// Replays `path` from the root, probing for `Dir` and walking by name at
/// each step. Used whenever a fid's node must be re-derived (no bound
/// `open` node, or a fresh `Walk`/`Stat`).
async fn walk_from_root(state: &SessionState, path: &[String]) -> Result<Arc<dyn Node>> {
    let mut node = state.root.clone();
    for name in path {
        let dir = node::probe_dir(node.clone()).ok_or(Error::Proto(Proto::WalkNoDir))?;
        node = dir.walk(name).await?;
    }
    Ok(node)
}

async fn attach_handler(state: &SessionState, fid: u32) -> Result<FCall> {
    let mut st = state.root.stat().await?;
    state.fill_stat(&[], &mut st, true)?;

    let inserted = state.fids.insert(fid, FidState::new(Vec::new())).await;
    if !inserted {
        return Err(Error::Proto(Proto::DupFid));
    }

    Ok(FCall::RAttach { qid: st.qid })
}

async fn walk_handler(
    state: &SessionState,
    fid: u32,
    newfid: u32,
    wnames: &[String],
) -> Result<FCall> {
    let fd = state.fids.get(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;

    if fid != newfid && state.fids.contains(newfid).await {
        return Err(Error::Proto(Proto::DupFid));
    }

    let mut node = walk_from_root(state, &fd.path).await.map_err(|_| Error::Proto(Proto::WalkNoDir))?;

    let mut path = fd.path.clone();
    let mut qids: Vec<QId> = Vec::with_capacity(wnames.len());
    let mut walk_err: Option<Error> = None;

    for name in wnames.iter() {
        if name == ".." {
            let mut parent_path = path.clone();
            if !parent_path.is_empty() {
                parent_path.pop();
            }
            match walk_from_root(state, &parent_path).await {
                Ok(n) => {
                    node = n;
                    path = parent_path;
                    continue;
                }
                Err(e) => {
                    walk_err = Some(e);
                    break;
                }
            }
        }

        let dir = match node::probe_dir(node.clone()) {
            Some(d) => d,
            None => {
                walk_err = Some(Error::Proto(Proto::WalkNoDir));
                break;
            }
        };

        let next = match dir.walk(name).await {
            Ok(n) => n,
            Err(e) => {
                walk_err = Some(e);
                break;
            }
        };

        let mut st = match next.stat().await {
            Ok(s) => s,
            Err(e) => {
                walk_err = Some(e);
                break;
            }
        };

        path.push(name.clone());
        if let Err(e) = state.fill_stat(&path, &mut st, true) {
            walk_err = Some(e);
            break;
        }

        qids.push(st.qid);
        node = next;
    }

    if let Some(err) = walk_err {
        if !qids.is_empty() {
            return Ok(FCall::RWalk { wqids: qids });
        }
        return Err(err);
    }

    state.fids.set(newfid, FidState::new(path)).await;
    Ok(FCall::RWalk { wqids: qids })
}

async fn open_handler(state: &SessionState, fid: u32, mode: u8) -> Result<FCall> {
    let fd = state.fids.get(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;
    let mut guard = fd.open.lock().await;

    let base = walk_from_root(state, &fd.path).await?;

    let mut iounit = 0u32;
    let bound: Arc<dyn Node> = if let Some(opener) = node::probe_opener(base.clone()) {
        let (val, unit) = opener.open(mode).await?;
        iounit = unit;
        val
    } else if let Some(dir) = node::probe_dir(base.clone()) {
        crate::dir::open_directory(state, dir, base.clone(), &fd.path).await?
    } else {
        base.clone()
    };

    let mut st = bound.stat().await?;
    state.fill_stat(&fd.path, &mut st, true)?;
    *guard = Some(bound);

    Ok(FCall::ROpen {
        qid: st.qid,
        iounit,
    })
}

async fn read_handler(state: &SessionState, fid: u32, offset: u64, count: u32) -> Result<FCall> {
    let fd = state.fids.get(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;
    let guard = fd.open.lock().await;

    let node = match guard.as_ref() {
        Some(n) => n.clone(),
        None => walk_from_root(state, &fd.path).await?,
    };

    let bytes = if let Some(reader) = node::probe_random_reader(node.clone()) {
        reader.read_at(offset, count).await?
    } else if let Some(reader) = node::probe_sequential_reader(node.clone()) {
        reader.seek(offset).await?;
        reader.read(count).await?
    } else {
        return Err(Error::Proto(Proto::OpNoSupported));
    };

    Ok(FCall::RRead { data: Data(bytes) })
}

async fn write_handler(
    state: &SessionState,
    fid: u32,
    offset: u64,
    data: &[u8],
) -> Result<FCall> {
    let fd = state.fids.get(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;
    let guard = fd.open.lock().await;

    let node = match guard.as_ref() {
        Some(n) => n.clone(),
        None => walk_from_root(state, &fd.path).await?,
    };

    let count = if let Some(writer) = node::probe_random_writer(node.clone()) {
        writer.write_at(offset, data).await?
    } else if let Some(writer) = node::probe_sequential_writer(node.clone()) {
        writer.seek(offset).await?;
        writer.write(data).await?
    } else {
        return Err(Error::Proto(Proto::NoWrite));
    };

    Ok(FCall::RWrite { count })
}

async fn clunk_handler(state: &SessionState, fid: u32) -> Result<FCall> {
    let fd = state.fids.remove(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;
    let guard = fd.open.lock().await;

    // Only re-derive the node from `path` when no open node is bound.
    let node = match guard.as_ref() {
        Some(n) => Some(n.clone()),
        None => walk_from_root(state, &fd.path).await.ok(),
    };

    if let Some(node) = node {
        if let Some(closer) = node::probe_closer(node) {
            closer.close().await?;
        }
    }

    Ok(FCall::RClunk)
}

async fn stat_handler(state: &SessionState, fid: u32) -> Result<FCall> {
    let fd = state.fids.get(fid).await.ok_or(Error::Proto(Proto::UnknownFid))?;
    let node = walk_from_root(state, &fd.path).await?;
    let mut st = node.stat().await?;
    state.fill_stat(&fd.path, &mut st, false)?;
    Ok(FCall::RStat { stat: st })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcall::{QIdType, dm};
    use crate::opts;
    use crate::session::SessionState;
    use std::sync::Arc;

    struct RootDir;

    #[async_trait::async_trait]
    impl Node for RootDir {
        async fn stat(&self) -> Result<Stat> {
            Ok(Stat {
                typ: 0,
                dev: 0,
                qid: QId {
                    typ: QIdType::empty(),
                    version: 0,
                    path: 0,
                },
                mode: dm::DIR | 0o555,
                atime: 0,
                mtime: 0,
                length: 0,
                name: "/".to_owned(),
                uid: String::new(),
                gid: String::new(),
                muid: String::new(),
            })
        }

        fn as_dir(self: Arc<Self>) -> Option<Arc<dyn crate::node::Dir>> {
            Some(self)
        }
    }

    #[async_trait::async_trait]
    impl crate::node::Dir for RootDir {
        async fn children(&self) -> Result<Vec<Stat>> {
            Ok(Vec::new())
        }

        async fn walk(&self, _name: &str) -> Result<Arc<dyn Node>> {
            Err(Error::Proto(Proto::NotFound))
        }
    }

    fn test_state() -> SessionState {
        SessionState::new(Arc::new(RootDir), opts::Config::default())
    }

    #[tokio::test]
    async fn attach_then_stat_root() {
        let state = test_state();
        let reply = attach_handler(&state, 1).await.unwrap();
        match reply {
            FCall::RAttach { qid } => assert!(qid.is_dir()),
            _ => panic!("unexpected reply"),
        }

        let reply = stat_handler(&state, 1).await.unwrap();
        match reply {
            FCall::RStat { stat } => {
                assert!(stat.is_dir());
                assert!(stat.qid.is_dir());
            }
            _ => panic!("unexpected reply"),
        }
    }

    #[tokio::test]
    async fn walk_missing_name_is_file_not_found() {
        let state = test_state();
        attach_handler(&state, 1).await.unwrap();
        let err = walk_handler(&state, 1, 2, &["foo".to_owned()])
            .await
            .unwrap_err();
        assert_eq!(err.catalog_string(), Proto::NotFound.message());
        assert!(!state.fids.contains(2).await);
    }

    struct SubDir;

    #[async_trait::async_trait]
    impl Node for SubDir {
        async fn stat(&self) -> Result<Stat> {
            Ok(Stat {
                mode: dm::DIR | 0o555,
                qid: QId {
                    typ: QIdType::DIR,
                    version: 0,
                    path: 0,
                },
                name: "sub".to_owned(),
                ..test_blank_stat()
            })
        }

        fn as_dir(self: Arc<Self>) -> Option<Arc<dyn crate::node::Dir>> {
            Some(self)
        }
    }

    #[async_trait::async_trait]
    impl crate::node::Dir for SubDir {
        async fn children(&self) -> Result<Vec<Stat>> {
            Ok(Vec::new())
        }

        async fn walk(&self, name: &str) -> Result<Arc<dyn Node>> {
            if name == "leaf" {
                Ok(Arc::new(RootDir))
            } else {
                Err(Error::Proto(Proto::NotFound))
            }
        }
    }

    struct TwoLevelRoot;

    #[async_trait::async_trait]
    impl Node for TwoLevelRoot {
        async fn stat(&self) -> Result<Stat> {
            Ok(Stat {
                mode: dm::DIR | 0o555,
                name: "/".to_owned(),
                ..test_blank_stat()
            })
        }

        fn as_dir(self: Arc<Self>) -> Option<Arc<dyn crate::node::Dir>> {
            Some(self)
        }
    }

    #[async_trait::async_trait]
    impl crate::node::Dir for TwoLevelRoot {
        async fn children(&self) -> Result<Vec<Stat>> {
            Ok(Vec::new())
        }

        async fn walk(&self, name: &str) -> Result<Arc<dyn Node>> {
            if name == "sub" {
                Ok(Arc::new(SubDir))
            } else {
                Err(Error::Proto(Proto::NotFound))
            }
        }
    }

    fn test_blank_stat() -> Stat {
        Stat {
            typ: 0,
            dev: 0,
            qid: QId {
                typ: QIdType::empty(),
                version: 0,
                path: 0,
            },
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

    #[tokio::test]
    async fn walk_in_place_with_same_fid_and_newfid_updates_path() {
        let state = SessionState::new(Arc::new(TwoLevelRoot), opts::Config::default());
        attach_handler(&state, 1).await.unwrap();

        walk_handler(&state, 1, 1, &["sub".to_owned()]).await.unwrap();
        // If `fid == newfid` silently failed to replace the table entry
        // (an insert-if-absent bug), fid 1's path would still be empty and
        // this second walk would look for "leaf" under the root instead of
        // under "sub", where it doesn't exist.
        let reply = walk_handler(&state, 1, 1, &["leaf".to_owned()]).await.unwrap();
        match reply {
            FCall::RWalk { wqids } => assert_eq!(wqids.len(), 1),
            _ => panic!("unexpected reply"),
        }
    }

    #[tokio::test]
    async fn clunk_unknown_fid() {
        let state = test_state();
        let err = clunk_handler(&state, 99).await.unwrap_err();
        assert_eq!(err.catalog_string(), Proto::UnknownFid.message());
    }

    #[tokio::test]
    async fn stat_after_clunk_is_unknown_fid() {
        let state = test_state();
        attach_handler(&state, 1).await.unwrap();
        clunk_handler(&state, 1).await.unwrap();
        let err = stat_handler(&state, 1).await.unwrap_err();
        assert_eq!(err.catalog_string(), Proto::UnknownFid.message());
    }
}
