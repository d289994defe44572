//! The session engine: framing, tag bookkeeping, cancellation, and the
//! cooperating tasks (receiver/dispatcher, per-request tasks, sender) that
//! service one connection.

use std::collections::HashMap;
use std::sync::Arc;

use log::{error, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::fcall::{FCall, Msg};
use crate::fid::FidTable;
use crate::node::Node;
use crate::opts::{Config, DebugFlags};
use crate::serialize::{read_msg, write_msg};
use crate::stat::{StatModifierFn, fill_stat};

/// Immutable-ish per-connection state shared by the handlers and the
/// engine's own tasks. Held behind an `Arc` so per-request tasks can each
/// get their own cheap handle.
pub struct SessionState {
    pub root: Arc<dyn Node>,
    pub msize: u32,
    pub debug: DebugFlags,
    pub fids: FidTable,
    stat_modifiers: Vec<StatModifierFn>,
}

impl SessionState {
    pub fn new(root: Arc<dyn Node>, cfg: Config) -> SessionState {
        SessionState {
            root,
            msize: cfg.msize,
            debug: cfg.debug,
            fids: FidTable::new(),
            stat_modifiers: cfg.stat_modifiers,
        }
    }

    /// Runs the decorator pipeline and the engine's own qid-filling pass
    /// over `st`, scoped to `path`.
    pub fn fill_stat(
        &self,
        path: &[String],
        st: &mut crate::fcall::Stat,
        qid_only: bool,
    ) -> Result<()> {
        fill_stat(&self.stat_modifiers, path, st, qid_only)
    }
}

/// The tag table: one entry per in-flight request, holding the oneshot
/// sender the dispatched task watches for cancellation. Removing (and so
/// dropping) the entry is what `Tflush` uses to cancel a request: the
/// per-request task's `select!` observes the sender's closure and drops
/// its reply instead of sending it. This replaces a shared `cancelled`
/// flag with an ownership handoff — ownership of the tag's lifetime moves
/// cleanly between dispatcher, flush handling, and the sender.
type TagTable = RwLock<HashMap<u16, oneshot::Sender<()>>>;

/// Serve one connection end to end: decode, dispatch, and reply in a loop
/// until the transport closes or a fatal error occurs.
pub async fn serve<S>(
    stream: S,
    root: Arc<dyn Node>,
    opts: Vec<crate::opts::Option>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let cfg = Config::build(opts);
    let state = Arc::new(SessionState::new(root, cfg));
    let (mut reader, mut writer) = tokio::io::split(stream);

    let tags: Arc<TagTable> = Arc::new(RwLock::new(HashMap::new()));
    let (reply_tx, mut reply_rx) = mpsc::channel::<(u16, Result<FCall>)>(64);

    let sender_state = state.clone();
    let sender_tags = tags.clone();
    let sender = tokio::spawn(async move {
        while let Some((tag, result)) = reply_rx.recv().await {
            if sender_tags.write().await.remove(&tag).is_none() {
                // Already flushed: drop the reply silently.
                continue;
            }

            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    if e.is_cataloged() {
                        if sender_state.debug.contains(DebugFlags::KNOWN_ERRORS) {
                            error!("known error on tag {:x}: {}", tag, e);
                        }
                    } else if sender_state.debug.contains(DebugFlags::UNKNOWN_ERRORS) {
                        error!("unknown error on tag {:x}: {}", tag, e);
                    }
                    FCall::RError {
                        ename: e.catalog_string().to_owned(),
                    }
                }
            };

            if sender_state.debug.contains(DebugFlags::SENT) {
                info!("-> {:x} {:?}", tag, body);
                if sender_state.debug.contains(DebugFlags::DATA) {
                    if let Some(data) = payload_bytes(&body) {
                        info!("-> {:x} data: {:?}", tag, data);
                    }
                }
            }

            let msg = Msg { tag, body };
            let mut buf = Vec::new();
            if encode_framed(&msg, &mut buf).is_err() {
                break;
            }
            if writer.write_all(&buf).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let run_result = receive_and_dispatch(&mut reader, &state, &tags, &reply_tx).await;

    drop(reply_tx);
    let _ = sender.await;

    run_result
}

async fn receive_and_dispatch<R>(
    reader: &mut R,
    state: &Arc<SessionState>,
    tags: &Arc<TagTable>,
    reply_tx: &mpsc::Sender<(u16, Result<FCall>)>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let msg = decode_framed(reader, state.msize).await?;

        if state.debug.contains(DebugFlags::RECEIVED) {
            info!("<- {:x} {:?}", msg.tag, msg.body);
            if state.debug.contains(DebugFlags::DATA) {
                if let Some(data) = payload_bytes(&msg.body) {
                    info!("<- {:x} data: {:?}", msg.tag, data);
                }
            }
        }

        if let FCall::TFlush { oldtag } = msg.body {
            let found = tags.write().await.remove(&oldtag).is_some();
            if found && state.debug.contains(DebugFlags::FLUSH) {
                info!("xx {:x}", oldtag);
            }
            // Register the flush's own tag so the sender's "already
            // removed" gate doesn't mistake this for a stale reply and
            // drop it; nothing will ever cancel a flush's own reply.
            let (cancel_tx, _cancel_rx) = oneshot::channel::<()>();
            tags.write().await.insert(msg.tag, cancel_tx);
            let _ = reply_tx.send((msg.tag, Ok(FCall::RFlush))).await;
            continue;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        tags.write().await.insert(msg.tag, cancel_tx);

        let task_state = state.clone();
        let task_tx = reply_tx.clone();
        let tag = msg.tag;
        tokio::spawn(async move {
            let result = crate::handlers::handle(&task_state, &msg.body).await;
            tokio::select! {
                biased;
                _ = cancel_rx => {}
                _ = task_tx.send((tag, result)) => {}
            }
        });
    }
}

/// The raw data payload of a message, for `DebugFlags::DATA` logging: the
/// bytes a `Tread`'s reply or a `Twrite`'s request actually carries.
fn payload_bytes(body: &FCall) -> Option<&[u8]> {
    match body {
        FCall::TWrite { data, .. } => Some(&data.0),
        FCall::RRead { data } => Some(&data.0),
        _ => None,
    }
}

/// Encodes `msg` with its leading 4-byte little-endian total-length prefix,
/// matching the classic 9P wire layout: `size[4] type[1] tag[2] ...body`.
fn encode_framed(msg: &Msg, out: &mut Vec<u8>) -> Result<()> {
    let mut body = Vec::new();
    write_msg(&mut body, msg)?;
    let total_len = (body.len() + 4) as u32;
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(())
}

/// Reads one length-prefixed message, rejecting anything past `msize`.
async fn decode_framed<R: AsyncRead + Unpin>(reader: &mut R, msize: u32) -> Result<Msg> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(Error::from)?;
    let total_len = u32::from_le_bytes(len_buf);

    if total_len < 4 {
        return Err(Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "message shorter than its own length prefix",
        )));
    }
    if total_len > msize {
        return Err(Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "message exceeds negotiated msize",
        )));
    }

    let mut body = vec![0u8; (total_len - 4) as usize];
    reader.read_exact(&mut body).await.map_err(Error::from)?;

    let mut cursor = std::io::Cursor::new(body);
    read_msg(&mut cursor).map_err(Error::from)
}
