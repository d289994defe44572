//! Capability traits for served values and the capability probe.
//!
//! A [`Node`] is anything that can produce a [`Stat`](crate::fcall::Stat).
//! Everything else — directory listing, opening, positioned or sequential
//! I/O, closing, unwrapping — is an optional capability a concrete type may
//! additionally implement. Rather than Go-style runtime interface assertions,
//! each capability is surfaced through an `as_*` accessor on `Node` with a
//! `None` default; [`probe`] walks the `Unwrappable` chain looking for one
//! that returns `Some`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::fcall::Stat;

/// A value hosted in the served tree.
///
/// Implementors provide at least `stat`; capabilities beyond that are
/// advertised by overriding the relevant `as_*` accessor to return `Some`.
/// All accessors take `self: Arc<Self>` so they can be called through a
/// `Arc<dyn Node>` trait object and hand back `Arc`-owned capability views
/// that outlive the original reference.
#[async_trait]
pub trait Node: Send + Sync {
    async fn stat(&self) -> Result<Stat>;

    fn as_dir(self: Arc<Self>) -> Option<Arc<dyn Dir>> {
        None
    }

    fn as_opener(self: Arc<Self>) -> Option<Arc<dyn Opener>> {
        None
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        None
    }

    fn as_random_writer(self: Arc<Self>) -> Option<Arc<dyn RandomWriter>> {
        None
    }

    fn as_sequential_reader(self: Arc<Self>) -> Option<Arc<dyn SequentialReader>> {
        None
    }

    fn as_sequential_writer(self: Arc<Self>) -> Option<Arc<dyn SequentialWriter>> {
        None
    }

    fn as_closer(self: Arc<Self>) -> Option<Arc<dyn Closer>> {
        None
    }

    /// Exposes an inner value the probe should continue into when this
    /// node itself doesn't satisfy the requested capability.
    fn as_unwrappable(self: Arc<Self>) -> Option<Arc<dyn Node>> {
        None
    }
}

/// Directory capability: enumerate children, walk to one by name.
#[async_trait]
pub trait Dir: Send + Sync {
    /// The directory's children, in whatever order the implementation
    /// considers canonical (alphabetical for record-backed directories,
    /// insertion order for sequence-backed ones — see `ffs`).
    async fn children(&self) -> Result<Vec<Stat>>;

    /// Resolve a single path component to a child node.
    async fn walk(&self, name: &str) -> Result<Arc<dyn Node>>;
}

/// Open-mode bits passed to [`Opener::open`], mirroring `fcall::om`.
pub type OpenMode = u8;

/// Opener capability: produces a per-open handle plus a suggested I/O unit.
#[async_trait]
pub trait Opener: Send + Sync {
    /// Open this node for `mode`. The returned node replaces the fid's
    /// current node for subsequent Read/Write/Clunk.
    async fn open(&self, mode: OpenMode) -> Result<(Arc<dyn Node>, u32)>;
}

/// Positioned (pread-style) read capability.
#[async_trait]
pub trait RandomReader: Send + Sync {
    async fn read_at(&self, offset: u64, count: u32) -> Result<Vec<u8>>;
}

/// Positioned (pwrite-style) write capability.
#[async_trait]
pub trait RandomWriter: Send + Sync {
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<u32>;
}

/// Sequential read capability, positioned via `seek` before each read.
#[async_trait]
pub trait SequentialReader: Send + Sync {
    async fn seek(&self, offset: u64) -> Result<()>;
    async fn read(&self, count: u32) -> Result<Vec<u8>>;
}

/// Sequential write capability, positioned via `seek` before each write.
#[async_trait]
pub trait SequentialWriter: Send + Sync {
    async fn seek(&self, offset: u64) -> Result<()>;
    async fn write(&self, data: &[u8]) -> Result<u32>;
}

/// Resource-release capability invoked on `Tclunk`.
#[async_trait]
pub trait Closer: Send + Sync {
    async fn close(&self) -> Result<()>;
}

/// Maximum number of `Unwrap` hops the probe will follow before giving up.
///
/// A fixed bound rather than cycle detection: user wrapper chains are
/// expected to be shallow (a handful of layers at most), and a bound avoids
/// an adversarial or accidentally-cyclic `Unwrap` impl hanging a request.
const MAX_PROBE_DEPTH: usize = 32;

/// Walk `start`'s `Unwrap` chain looking for a value `try_get` can turn into
/// a capability, stopping after [`MAX_PROBE_DEPTH`] hops or when the chain
/// ends.
pub fn probe<T>(start: Arc<dyn Node>, try_get: impl Fn(Arc<dyn Node>) -> Option<T>) -> Option<T> {
    let mut cur = start;
    for _ in 0..MAX_PROBE_DEPTH {
        if let Some(v) = try_get(cur.clone()) {
            return Some(v);
        }
        match cur.clone().as_unwrappable() {
            Some(inner) => cur = inner,
            None => return None,
        }
    }
    None
}

pub fn probe_dir(node: Arc<dyn Node>) -> Option<Arc<dyn Dir>> {
    probe(node, |n| n.as_dir())
}

pub fn probe_opener(node: Arc<dyn Node>) -> Option<Arc<dyn Opener>> {
    probe(node, |n| n.as_opener())
}

pub fn probe_random_reader(node: Arc<dyn Node>) -> Option<Arc<dyn RandomReader>> {
    probe(node, |n| n.as_random_reader())
}

pub fn probe_random_writer(node: Arc<dyn Node>) -> Option<Arc<dyn RandomWriter>> {
    probe(node, |n| n.as_random_writer())
}

pub fn probe_sequential_reader(node: Arc<dyn Node>) -> Option<Arc<dyn SequentialReader>> {
    probe(node, |n| n.as_sequential_reader())
}

pub fn probe_sequential_writer(node: Arc<dyn Node>) -> Option<Arc<dyn SequentialWriter>> {
    probe(node, |n| n.as_sequential_writer())
}

pub fn probe_closer(node: Arc<dyn Node>) -> Option<Arc<dyn Closer>> {
    probe(node, |n| n.as_closer())
}

/// A thin [`Node`] that presents a fixed `Stat` while deferring every other
/// capability to an inner value. Used by `Open` when the opener's returned
/// value isn't itself a `Node`.
pub struct Wrapped {
    pub stat: Stat,
    pub inner: Arc<dyn Node>,
}

#[async_trait]
impl Node for Wrapped {
    async fn stat(&self) -> Result<Stat> {
        Ok(self.stat.clone())
    }

    fn as_dir(self: Arc<Self>) -> Option<Arc<dyn Dir>> {
        self.inner.clone().as_dir()
    }

    fn as_opener(self: Arc<Self>) -> Option<Arc<dyn Opener>> {
        self.inner.clone().as_opener()
    }

    fn as_random_reader(self: Arc<Self>) -> Option<Arc<dyn RandomReader>> {
        self.inner.clone().as_random_reader()
    }

    fn as_random_writer(self: Arc<Self>) -> Option<Arc<dyn RandomWriter>> {
        self.inner.clone().as_random_writer()
    }

    fn as_sequential_reader(self: Arc<Self>) -> Option<Arc<dyn SequentialReader>> {
        self.inner.clone().as_sequential_reader()
    }

    fn as_sequential_writer(self: Arc<Self>) -> Option<Arc<dyn SequentialWriter>> {
        self.inner.clone().as_sequential_writer()
    }

    fn as_closer(self: Arc<Self>) -> Option<Arc<dyn Closer>> {
        self.inner.clone().as_closer()
    }

    fn as_unwrappable(self: Arc<Self>) -> Option<Arc<dyn Node>> {
        Some(self.inner.clone())
    }
}
