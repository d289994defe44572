//! String/byte-blob → file, generalizing the original `ffs/data.go`'s
//! `data` node.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::fcall::Stat;
use crate::ffs::convert::Params;
use crate::node::{Node, RandomReader};

/// A read-only file backed by an in-memory byte blob, copied at
/// construction so later mutation of the source doesn't leak through.
pub struct DataNode {
    params: Params,
    data: Vec<u8>,
}

impl DataNode {
    pub fn new(params: Params, data: impl Into<Vec<u8>>) -> DataNode {
        DataNode {
            params,
            data: data.into(),
        }
    }
}

#[async_trait]
impl Node for DataNode {
    async fn stat(&self) -> Result<Stat> {
        let mut st = Stat {
            length: self.data.len() as u64,
            ..Default::default()
        };
        self.params.fill_stat(&mut st);
        Ok(st)
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        Some(self)
    }
}

#[async_trait]
impl RandomReader for DataNode {
    async fn read_at(&self, offset: u64, count: u32) -> Result<Vec<u8>> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(Vec::new());
        }
        let end = (offset + count as usize).min(self.data.len());
        Ok(self.data[offset..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stat_reports_length_and_applies_params() {
        let node = DataNode::new(Params::named("hello"), b"hello world".to_vec());
        let st = node.stat().await.unwrap();
        assert_eq!(st.name, "hello");
        assert_eq!(st.length, 11);
    }

    #[tokio::test]
    async fn read_at_short_reads_past_end() {
        let node = Arc::new(DataNode::new(Params::default(), b"hello world".to_vec()));
        let reader = node.as_random_reader().unwrap();
        assert_eq!(reader.read_at(0, 64).await.unwrap(), b"hello world");
        assert_eq!(reader.read_at(6, 64).await.unwrap(), b"world");
        assert_eq!(reader.read_at(100, 64).await.unwrap(), b"");
    }
}
