//! End-to-end session tests driving `ninep::serve` over an in-process
//! `tokio::io::duplex` transport, exercised against the real wire codec
//! rather than calling handlers directly (see `handlers.rs`'s own unit
//! tests for that level).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ninep::error::{Proto, Result};
use ninep::fcall::{FCall, Msg, NOFID, QIdType};
use ninep::ffs::{Field, FieldMode, NodeValue, Params, Record, record_node};
use ninep::node::{Node, RandomReader};
use ninep::serialize::{read_msg, write_msg};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

async fn send<S: AsyncWrite + Unpin>(stream: &mut S, tag: u16, body: FCall) {
    let msg = Msg { tag, body };
    let mut buf = Vec::new();
    write_msg(&mut buf, &msg).unwrap();
    let mut framed = Vec::with_capacity(buf.len() + 4);
    framed.extend_from_slice(&((buf.len() + 4) as u32).to_le_bytes());
    framed.extend_from_slice(&buf);
    stream.write_all(&framed).await.unwrap();
}

async fn recv<S: AsyncRead + Unpin>(stream: &mut S) -> Msg {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let total_len = u32::from_le_bytes(len_buf);
    let mut body = vec![0u8; (total_len - 4) as usize];
    stream.read_exact(&mut body).await.unwrap();
    let mut cursor = std::io::Cursor::new(body);
    read_msg(&mut cursor).unwrap()
}

async fn try_recv<S: AsyncRead + Unpin>(stream: &mut S, timeout: Duration) -> Option<Msg> {
    tokio::time::timeout(timeout, recv(stream)).await.ok()
}

struct Leaf {
    hello: String,
}

impl Record for Leaf {
    fn fields(&self) -> Vec<Field> {
        vec![Field::child_mode(
            "Hello",
            FieldMode::EXEC,
            NodeValue::from(self.hello.clone()),
        )]
    }
}

struct SlowRoot {
    gate: Arc<Notify>,
}

impl Record for SlowRoot {
    fn fields(&self) -> Vec<Field> {
        let slow: Arc<dyn Node> = Arc::new(GatedFile {
            gate: self.gate.clone(),
        });
        vec![Field::child("slow", slow)]
    }
}

struct GatedFile {
    gate: Arc<Notify>,
}

#[async_trait]
impl Node for GatedFile {
    async fn stat(&self) -> Result<ninep::fcall::Stat> {
        Ok(ninep::fcall::Stat::default())
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        Some(self)
    }
}

#[async_trait]
impl RandomReader for GatedFile {
    async fn read_at(&self, _offset: u64, _count: u32) -> Result<Vec<u8>> {
        self.gate.notified().await;
        Ok(b"done".to_vec())
    }
}

#[tokio::test]
async fn attach_and_stat_root() {
    let root = record_node(Arc::new(Leaf { hello: "hi".to_owned() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RAttach { qid } => assert!(qid.is_dir()),
        other => panic!("unexpected reply: {other:?}"),
    }

    send(&mut client, 2, FCall::TStat { fid: 1 }).await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RStat { stat } => {
            assert!(stat.is_dir());
            assert!(stat.qid.typ.contains(QIdType::DIR));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn walk_open_and_read_a_string_field() {
    let root = record_node(
        Arc::new(Leaf {
            hello: "hello world".to_owned(),
        }),
        Params::named("/"),
    )
    .unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TWalk {
            fid: 1,
            newfid: 2,
            wnames: vec!["Hello".to_owned()],
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RWalk { wqids } => assert_eq!(wqids.len(), 1),
        other => panic!("unexpected reply: {other:?}"),
    }

    send(&mut client, 3, FCall::TOpen { fid: 2, mode: 0 }).await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::ROpen { qid, .. } => assert!(!qid.is_dir()),
        other => panic!("unexpected reply: {other:?}"),
    }

    send(
        &mut client,
        4,
        FCall::TRead {
            fid: 2,
            offset: 0,
            count: 64,
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RRead { data } => assert_eq!(data.0, b"hello world"),
        other => panic!("unexpected reply: {other:?}"),
    }

    send(&mut client, 5, FCall::TStat { fid: 2 }).await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RStat { stat } => assert_eq!(stat.mode & 0o111, 0o111),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn sequence_indexing() {
    let seq = NodeValue::sequence(vec![
        NodeValue::Record(Arc::new(Leaf { hello: "a".to_owned() }) as Arc<dyn Record>),
        NodeValue::Record(Arc::new(Leaf { hello: "b".to_owned() }) as Arc<dyn Record>),
    ]);
    let root = seq.to_node(&Params::named("/")).unwrap();

    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TWalk {
            fid: 1,
            newfid: 2,
            wnames: vec!["1".to_owned(), "Hello".to_owned()],
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RWalk { wqids } => assert_eq!(wqids.len(), 2),
        other => panic!("unexpected reply: {other:?}"),
    }

    send(&mut client, 3, FCall::TOpen { fid: 2, mode: 0 }).await;
    recv(&mut client).await;
    send(
        &mut client,
        4,
        FCall::TRead {
            fid: 2,
            offset: 0,
            count: 8,
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RRead { data } => assert_eq!(data.0, b"b"),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn flush_cancels_a_slow_read_and_fid_survives() {
    let gate = Arc::new(Notify::new());
    let root = record_node(Arc::new(SlowRoot { gate: gate.clone() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TWalk {
            fid: 1,
            newfid: 2,
            wnames: vec!["slow".to_owned()],
        },
    )
    .await;
    recv(&mut client).await;

    send(&mut client, 3, FCall::TOpen { fid: 2, mode: 0 }).await;
    recv(&mut client).await;

    send(
        &mut client,
        7,
        FCall::TRead {
            fid: 2,
            offset: 0,
            count: 8,
        },
    )
    .await;

    send(&mut client, 8, FCall::TFlush { oldtag: 7 }).await;

    let reply = try_recv(&mut client, Duration::from_secs(2))
        .await
        .expect("expected a reply to the flush");
    assert_eq!(reply.tag, 8);
    assert!(matches!(reply.body, FCall::RFlush));

    // No reply for tag 7 should ever arrive.
    assert!(try_recv(&mut client, Duration::from_millis(200)).await.is_none());

    // Release the gate (the cancelled read's future was dropped, so its
    // permit is unconsumed) and confirm a fresh read on the same fid
    // still works.
    gate.notify_one();
    send(
        &mut client,
        9,
        FCall::TRead {
            fid: 2,
            offset: 0,
            count: 8,
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RRead { data } => assert_eq!(data.0, b"done"),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_fid_is_an_error() {
    let root = record_node(Arc::new(Leaf { hello: "hi".to_owned() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(&mut client, 1, FCall::TClunk { fid: 99 }).await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RError { ename } => assert_eq!(ename, Proto::UnknownFid.message()),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn clunk_then_stat_is_unknown_fid() {
    let root = record_node(Arc::new(Leaf { hello: "hi".to_owned() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(&mut client, 2, FCall::TClunk { fid: 1 }).await;
    let reply = recv(&mut client).await;
    assert!(matches!(reply.body, FCall::RClunk));

    send(&mut client, 3, FCall::TStat { fid: 1 }).await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RError { ename } => assert_eq!(ename, Proto::UnknownFid.message()),
        other => panic!("unexpected reply: {other:?}"),
    }
}

struct NestedRoot;

impl Record for NestedRoot {
    fn fields(&self) -> Vec<Field> {
        let b: Arc<dyn Record> = Arc::new(Leaf { hello: "b-leaf".to_owned() });
        let a: Arc<dyn Record> = Arc::new(OneChildDir { child: b });
        vec![
            Field::child_mode("marker", FieldMode::EXEC, NodeValue::from("root-marker".to_owned())),
            Field::child("a", NodeValue::Record(a).to_node(&Params::named("a")).unwrap()),
        ]
    }
}

struct OneChildDir {
    child: Arc<dyn Record>,
}

impl Record for OneChildDir {
    fn fields(&self) -> Vec<Field> {
        vec![Field::child(
            "b",
            NodeValue::Record(self.child.clone())
                .to_node(&Params::named("b"))
                .unwrap(),
        )]
    }
}

#[tokio::test]
async fn walk_dotdot_from_nested_fid_resolves_through_running_path() {
    let root = record_node(Arc::new(NestedRoot), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TWalk {
            fid: 1,
            newfid: 2,
            wnames: vec!["a".to_owned(), "b".to_owned()],
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RWalk { wqids } => assert_eq!(wqids.len(), 2),
        other => panic!("unexpected reply: {other:?}"),
    }

    // fid 2 now sits at "/a/b". Walking ".." ".." "marker" must land back at
    // root, not at "a" (which has no "marker" child) — this is the scenario
    // a naive rebuild-from-wnames-prefix implementation gets wrong.
    send(
        &mut client,
        3,
        FCall::TWalk {
            fid: 2,
            newfid: 3,
            wnames: vec!["..".to_owned(), "..".to_owned(), "marker".to_owned()],
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RWalk { wqids } => assert_eq!(wqids.len(), 3),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn walk_dotdot_at_root_is_a_no_op() {
    let root = record_node(Arc::new(Leaf { hello: "hi".to_owned() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TWalk {
            fid: 1,
            newfid: 2,
            wnames: vec!["..".to_owned(), "..".to_owned(), "foo".to_owned()],
        },
    )
    .await;
    let reply = recv(&mut client).await;
    match reply.body {
        FCall::RError { ename } => assert_eq!(ename, Proto::NotFound.message()),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn create_remove_and_wstat_are_fixed() {
    let root = record_node(Arc::new(Leaf { hello: "hi".to_owned() }), Params::named("/")).unwrap();
    let (mut client, server) = tokio::io::duplex(65536);
    tokio::spawn(ninep::serve(server, root, vec![]));

    send(
        &mut client,
        1,
        FCall::TAttach {
            fid: 1,
            afid: NOFID,
            uname: String::new(),
            aname: String::new(),
        },
    )
    .await;
    recv(&mut client).await;

    send(
        &mut client,
        2,
        FCall::TCreate {
            fid: 1,
            name: "x".to_owned(),
            perm: 0o644,
            mode: 0,
        },
    )
    .await;
    let reply = recv(&mut client).await;
    assert!(matches!(reply.body, FCall::RError { ename } if ename == Proto::NoCreate.message()));

    send(&mut client, 3, FCall::TRemove { fid: 1 }).await;
    let reply = recv(&mut client).await;
    assert!(matches!(reply.body, FCall::RError { ename } if ename == Proto::NoRemove.message()));

    send(
        &mut client,
        4,
        FCall::TWStat {
            fid: 1,
            stat: ninep::fcall::Stat::default(),
        },
    )
    .await;
    let reply = recv(&mut client).await;
    assert!(matches!(reply.body, FCall::RWStat));
}
