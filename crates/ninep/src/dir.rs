//! Directory reader: snapshots a directory's children into the 9P
//! directory-entry wire layout on open, served thereafter as an ordinary
//! random-access read.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::fcall::Stat;
use crate::node::{Dir, Node, RandomReader};
use crate::serialize::Encodable;
use crate::session::SessionState;

/// An opened directory: the children's stats, decorated and serialized
/// once at open time. Stable for the life of the open handle — later
/// changes to the underlying tree are not reflected until reopen.
struct OpenDir {
    stat: Stat,
    data: Vec<u8>,
}

#[async_trait]
impl Node for OpenDir {
    async fn stat(&self) -> Result<Stat> {
        Ok(self.stat.clone())
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        Some(self)
    }
}

#[async_trait]
impl RandomReader for OpenDir {
    async fn read_at(&self, offset: u64, count: u32) -> Result<Vec<u8>> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(Vec::new());
        }
        let end = (offset + count as usize).min(self.data.len());
        Ok(self.data[offset..end].to_vec())
    }
}

/// Builds the open-directory node for `base`/`dir`: snapshots and
/// decorates `dir`'s children (full metadata, not qid-only — directory
/// listings embed complete stat records) and serializes them back to
/// back into a byte stream in declaration order.
pub async fn open_directory(
    state: &SessionState,
    dir: Arc<dyn Dir>,
    base: Arc<dyn Node>,
    path: &[String],
) -> Result<Arc<dyn Node>> {
    let mut children = dir.children().await?;
    for child in children.iter_mut() {
        let mut child_path = path.to_vec();
        child_path.push(child.name.clone());
        state.fill_stat(&child_path, child, false)?;
    }

    let mut data = Vec::new();
    for child in &children {
        child.encode(&mut data)?;
    }

    let stat = base.stat().await?;
    Ok(Arc::new(OpenDir { stat, data }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Proto};
    use crate::fcall::{QId, QIdType, dm};
    use crate::opts::Config;

    struct TwoFiles;

    #[async_trait]
    impl Node for TwoFiles {
        async fn stat(&self) -> Result<Stat> {
            Ok(blank_stat("/", dm::DIR | 0o555))
        }

        fn as_dir(self: Arc<Self>) -> Option<Arc<dyn Dir>> {
            Some(self)
        }
    }

    #[async_trait]
    impl Dir for TwoFiles {
        async fn children(&self) -> Result<Vec<Stat>> {
            Ok(vec![blank_stat("a", 0o444), blank_stat("b", 0o444)])
        }

        async fn walk(&self, _name: &str) -> Result<Arc<dyn Node>> {
            Err(Error::Proto(Proto::NotFound))
        }
    }

    fn blank_stat(name: &str, mode: u32) -> Stat {
        Stat {
            typ: 0,
            dev: 0,
            qid: QId {
                typ: QIdType::empty(),
                version: 0,
                path: 0,
            },
            mode,
            atime: 0,
            mtime: 0,
            length: 0,
            name: name.to_owned(),
            uid: String::new(),
            gid: String::new(),
            muid: String::new(),
        }
    }

    #[tokio::test]
    async fn sibling_children_get_distinct_qid_paths() {
        let root: Arc<dyn Node> = Arc::new(TwoFiles);
        let state = SessionState::new(root.clone(), Config::default());
        let dir = root.clone().as_dir().unwrap();

        let opened = open_directory(&state, dir, root, &[]).await.unwrap();
        let reader = opened.as_random_reader().unwrap();
        let bytes = reader.read_at(0, 4096).await.unwrap();

        let mut cursor = std::io::Cursor::new(bytes);
        let a: Stat = crate::serialize::Decodable::decode(&mut cursor).unwrap();
        let b: Stat = crate::serialize::Decodable::decode(&mut cursor).unwrap();
        assert_ne!(a.qid.path, b.qid.path);
    }
}
