//! A write-only utility node that buffers written bytes until a newline,
//! trims the completed line, and invokes a user handler on it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::fcall::Stat;
use crate::node::{Node, OpenMode, Opener, RandomWriter};

/// Per-line callback. An error aborts the write that completed the line
/// and is surfaced to the client as that write's failure.
pub type LineHandler = Arc<dyn Fn(String) -> Result<()> + Send + Sync>;

/// Illustrates the `Opener` + random-access-writer contract: opening
/// produces a fresh per-open buffer, so concurrent opens of the same
/// `LineCmd` don't share partial lines.
pub struct LineCmd {
    handler: LineHandler,
}

impl LineCmd {
    pub fn new(handler: impl Fn(String) -> Result<()> + Send + Sync + 'static) -> Arc<LineCmd> {
        Arc::new(LineCmd {
            handler: Arc::new(handler),
        })
    }
}

#[async_trait]
impl Node for LineCmd {
    async fn stat(&self) -> Result<Stat> {
        Ok(Stat {
            mode: 0o222,
            ..Default::default()
        })
    }

    fn as_opener(self: Arc<Self>) -> Option<Arc<dyn Opener>> {
        Some(self)
    }
}

#[async_trait]
impl Opener for LineCmd {
    async fn open(&self, _mode: OpenMode) -> Result<(Arc<dyn Node>, u32)> {
        let handle: Arc<dyn Node> = Arc::new(LineCmdHandle {
            handler: self.handler.clone(),
            buf: Mutex::new(Vec::new()),
        });
        Ok((handle, 0))
    }
}

struct LineCmdHandle {
    handler: LineHandler,
    buf: Mutex<Vec<u8>>,
}

#[async_trait]
impl Node for LineCmdHandle {
    async fn stat(&self) -> Result<Stat> {
        Ok(Stat {
            mode: 0o222,
            ..Default::default()
        })
    }

    fn as_random_writer(self: Arc<Self>) -> Option<Arc<dyn RandomWriter>> {
        Some(self)
    }
}

#[async_trait]
impl RandomWriter for LineCmdHandle {
    async fn write_at(&self, _offset: u64, data: &[u8]) -> Result<u32> {
        let mut buf = self.buf.lock().await;
        let mut written = 0u32;
        let mut rest = data;

        loop {
            let Some(idx) = rest.iter().position(|&b| b == b'\n') else {
                buf.extend_from_slice(rest);
                written += rest.len() as u32;
                break;
            };

            buf.extend_from_slice(&rest[..idx]);
            let line = String::from_utf8_lossy(&buf).trim().to_owned();
            buf.clear();
            written += (idx + 1) as u32;

            if !line.is_empty() {
                (self.handler)(line)?;
            }

            rest = &rest[idx + 1..];
        }

        Ok(written)
    }
}
