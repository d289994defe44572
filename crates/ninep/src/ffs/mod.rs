//! The reflective tree adapter: turns ordinary Rust values — strings, byte
//! blobs, ordered sequences, and records with declared field descriptors —
//! into a navigable [`Node`](crate::node::Node) tree.
//!
//! The original (`noonien/np`'s `ffs` package) does this by reflecting over
//! Go struct tags (`np:"<name>,<opt>,..."`) at conversion time. Rust has no
//! equivalent runtime struct-tag reflection, so this module takes the
//! declarative-builder path instead: a type implements [`Record`] and
//! returns a `Vec<`[`Field`]`>` schema from `fields()`, one entry per
//! annotated field in the original — same annotation *semantics*
//! (`write`/`exec`/`splat`/`omitnil`/the stat-component options), expressed
//! as builder calls instead of a tag string.
//!
//! - [`NodeValue`] is the conversion target: `String` → file, `Vec<u8>` →
//!   file, `Vec<NodeValue>` → directory by index, [`Record`] → directory or
//!   stat-wrapped value.
//! - [`Field`] is one child/splat/stat-component contribution from a
//!   record, built with [`Field::child`]/[`Field::child_mode`]/
//!   [`Field::splat`]/[`Field::child_opt`] or one of the `Field::<Stat
//!   component>` variants directly.
//! - [`record_node`] drives the conversion given a [`Record`] and default
//!   [`Params`].

pub mod array;
pub mod convert;
pub mod data;
pub mod field;
pub mod node_value;
pub mod struct_;

pub use array::SequenceDir;
pub use convert::{ParamNode, Params};
pub use data::DataNode;
pub use field::{Field, FieldMode};
pub use node_value::NodeValue;
pub use struct_::{Record, record_node};
