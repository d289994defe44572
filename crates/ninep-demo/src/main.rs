//! A small server demonstrating `ninep` end to end over a Unix domain
//! socket: parse argv with `clap`, initialize `env_logger`, accept
//! connections in a loop and hand each one to `ninep::serve`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Parser;
use ninep::error::Result;
use ninep::fcall::Stat;
use ninep::ffs::{Field, NodeValue, Params, Record, record_node};
use ninep::linecmd::LineCmd;
use ninep::node::{Node, RandomReader, RandomWriter};
use ninep::opts;

#[derive(Debug, Parser)]
struct Cli {
    /// Path to the Unix domain socket to listen on.
    socket: PathBuf,

    /// Negotiated maximum message size.
    #[arg(long, default_value_t = ninep::DEFAULT_MSIZE)]
    msize: u32,
}

/// A readable and writable text file backed by a shared `Mutex<String>`,
/// so writes to it are visible to later reads (unlike a plain `DataNode`,
/// which snapshots its content once and never implements `RandomWriter`).
struct GreetingFile {
    text: Arc<Mutex<String>>,
}

#[async_trait]
impl Node for GreetingFile {
    async fn stat(&self) -> Result<Stat> {
        Ok(Stat {
            mode: 0o644,
            length: self.text.lock().unwrap().len() as u64,
            ..Default::default()
        })
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        Some(self)
    }

    fn as_random_writer(self: Arc<Self>) -> Option<Arc<dyn RandomWriter>> {
        Some(self)
    }
}

#[async_trait]
impl RandomReader for GreetingFile {
    async fn read_at(&self, offset: u64, count: u32) -> Result<Vec<u8>> {
        let text = self.text.lock().unwrap();
        let bytes = text.as_bytes();
        let offset = offset as usize;
        if offset >= bytes.len() {
            return Ok(Vec::new());
        }
        let end = (offset + count as usize).min(bytes.len());
        Ok(bytes[offset..end].to_vec())
    }
}

#[async_trait]
impl RandomWriter for GreetingFile {
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<u32> {
        let mut text = self.text.lock().unwrap();
        let mut bytes = std::mem::take(&mut *text).into_bytes();
        let offset = offset as usize;
        if bytes.len() < offset + data.len() {
            bytes.resize(offset + data.len(), 0);
        }
        bytes[offset..offset + data.len()].copy_from_slice(data);
        *text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(data.len() as u32)
    }
}

/// The demo's root: a `greeting` file (readable and writable) and a `log`
/// line-command file that prints whatever's written to it.
struct Root {
    greeting: Arc<Mutex<String>>,
}

impl Record for Root {
    fn fields(&self) -> Vec<Field> {
        let greeting: Arc<dyn Node> = Arc::new(GreetingFile {
            text: self.greeting.clone(),
        });
        let log: Arc<dyn Node> = LineCmd::new(|line| {
            println!("[log] {line}");
            Ok(())
        });
        vec![
            Field::child("greeting", NodeValue::from(greeting)),
            Field::child("log", log),
        ]
    }
}

async fn demo_main(cli: Cli) -> ninep::Result<i32> {
    let root: Arc<dyn Record> = Arc::new(Root {
        greeting: Arc::new(Mutex::new("hello world".to_owned())),
    });
    let root_node = record_node(root, Params::named("/"))?;

    if tokio::fs::metadata(&cli.socket).await.is_ok() {
        tokio::fs::remove_file(&cli.socket).await?;
    }
    let listener = tokio::net::UnixListener::bind(&cli.socket)?;
    println!("[*] Ready to accept clients on {}", cli.socket.display());

    loop {
        let (stream, _) = listener.accept().await?;
        let root_node = root_node.clone();
        let msize = cli.msize;
        tokio::spawn(async move {
            if let Err(e) = ninep::serve(stream, root_node, vec![opts::msize(msize)]).await {
                log::error!("session ended: {e}");
            }
        });
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let exit_code = demo_main(Cli::parse()).await.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        -1
    });

    std::process::exit(exit_code);
}
