#![forbid(unsafe_code)]
//! An asynchronous 9P2000 file-service session engine for Rust.
//!
//! `ninep` implements the server half of classic 9P2000 (no `.L`/`.u`
//! extensions): framing, concurrent per-request handling, fid/tag state
//! machines, `Tflush` cancellation, and the Walk/Open/Read/Write/Clunk
//! lifecycle against a user-supplied [`Node`] tree. A served tree is any
//! value implementing [`Node`] plus whichever of [`Dir`], [`Opener`],
//! [`RandomReader`]/[`RandomWriter`], [`SequentialReader`]/
//! [`SequentialWriter`], [`Closer`], or an unwrap hook it chooses to
//! advertise.
//!
//! The [`ffs`] submodule turns ordinary Rust values — strings, byte
//! blobs, sequences, and records with declared field descriptors — into
//! such a tree, so a complete file server can be built without hand
//! writing [`Node`] impls for every piece of served state.
//!
//! # Getting started
//!
//! 1. Build (or derive, via [`ffs`]) a root [`Node`].
//! 2. Accept a connected byte stream (a Unix domain socket, typically).
//! 3. Call [`session::serve`] with the stream, the root node, and any
//!    [`opts`].
//!
//! ```no_run
//! # async fn doc() -> ninep::Result<()> {
//! use ninep::ffs::{Field, FieldMode, NodeValue, Record};
//!
//! struct Root { hello: String }
//!
//! impl Record for Root {
//!     fn fields(&self) -> Vec<Field> {
//!         vec![Field::child_mode("hello", FieldMode::EXEC, NodeValue::from(self.hello.clone()))]
//!     }
//! }
//!
//! let root = ninep::ffs::record_node(
//!     std::sync::Arc::new(Root { hello: "hello world".to_owned() }),
//!     ninep::ffs::Params::named("/"),
//! )?;
//!
//! let listener = tokio::net::UnixListener::bind("/tmp/ninep-doc.sock")?;
//! let (stream, _) = listener.accept().await?;
//! ninep::serve(stream, root, vec![ninep::opts::msize(8192)]).await
//! # }
//! ```
//!
//! # Error handling
//!
//! Handlers return [`Error`]; cataloged ([`error::Proto`]) failures reach
//! the client verbatim as `Rerror`, anything else is logged and remapped
//! to a generic I/O error (see [`error`]).
//!
//! # Out of scope
//!
//! Transport construction/acceptance, authentication enforcement beyond
//! `Tauth`'s no-op success, file creation/removal, persistent storage, and
//! multi-version negotiation are left to the caller.

pub mod dir;
pub mod error;
pub mod fcall;
pub mod ffs;
pub mod fid;
pub mod handlers;
pub mod linecmd;
pub mod node;
pub mod opts;
pub mod serialize;
pub mod session;
pub mod stat;

pub use crate::error::{Error, Result};
pub use crate::fcall::{DEFAULT_MSIZE, FCall, Msg, NOFID, NOTAG, P92000, QId, QIdType, Stat};
pub use crate::node::{
    Closer, Dir, Node, OpenMode, Opener, RandomReader, RandomWriter, SequentialReader,
    SequentialWriter, Wrapped,
};
pub use crate::session::serve;
