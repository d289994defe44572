//! `NodeValue`: the Rust-idiomatic target of the original `ffs/reflect.go`'s
//! `ToNode`. This crate has no runtime struct-tag reflection, so a
//! [`Field`](super::field::Field) or sequence element contributes an
//! already-typed value instead of an arbitrary Go `any`; [`to_node`]
//! dispatches it to a concrete [`Node`] the same way `ToNode` switched on
//! `string`/`[]byte`/slice/struct.

use std::sync::Arc;

use crate::error::Result;
use crate::ffs::array::SequenceDir;
use crate::ffs::convert::Params;
use crate::ffs::data::DataNode;
use crate::ffs::struct_::{Record, record_node};
use crate::node::Node;

/// A value a [`Field`](super::field::Field) or sequence element can hold.
#[derive(Clone)]
pub enum NodeValue {
    /// `String` → file whose content is the string's bytes.
    Text(String),
    /// `Vec<u8>` → file whose content is the bytes (copied at conversion).
    Bytes(Vec<u8>),
    /// Ordered sequence of `NodeValue` → directory, indexed by position.
    Sequence(Vec<NodeValue>),
    /// A nested [`Record`] → directory or stat-wrapped value, recursively.
    Record(Arc<dyn Record>),
    /// An already-built [`Node`], used as-is (bypasses `Params`, the same
    /// way `ToNode` falls through to a value's own `np.Node` implementation
    /// without touching it).
    Node(Arc<dyn Node>),
}

impl From<String> for NodeValue {
    fn from(s: String) -> Self {
        NodeValue::Text(s)
    }
}

impl From<&str> for NodeValue {
    fn from(s: &str) -> Self {
        NodeValue::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for NodeValue {
    fn from(b: Vec<u8>) -> Self {
        NodeValue::Bytes(b)
    }
}

impl From<&[u8]> for NodeValue {
    fn from(b: &[u8]) -> Self {
        NodeValue::Bytes(b.to_vec())
    }
}

impl From<Vec<NodeValue>> for NodeValue {
    fn from(items: Vec<NodeValue>) -> Self {
        NodeValue::Sequence(items)
    }
}

impl From<Arc<dyn Node>> for NodeValue {
    fn from(n: Arc<dyn Node>) -> Self {
        NodeValue::Node(n)
    }
}

impl From<Arc<dyn Record>> for NodeValue {
    fn from(r: Arc<dyn Record>) -> Self {
        NodeValue::Record(r)
    }
}

impl NodeValue {
    /// Convenience for building a [`NodeValue::Sequence`] from anything
    /// that converts to one.
    pub fn sequence<T: Into<NodeValue>>(items: impl IntoIterator<Item = T>) -> NodeValue {
        NodeValue::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Dispatches to a concrete [`Node`], applying `params` the way
    /// `ToNode` applied its `Params` argument to the string/byte-blob/
    /// struct cases.
    pub fn to_node(&self, params: &Params) -> Result<Arc<dyn Node>> {
        match self {
            NodeValue::Text(s) => Ok(Arc::new(DataNode::new(params.clone(), s.as_bytes().to_vec()))),
            NodeValue::Bytes(b) => Ok(Arc::new(DataNode::new(params.clone(), b.clone()))),
            NodeValue::Sequence(items) => Ok(Arc::new(SequenceDir::new(items.clone(), params.clone()))),
            NodeValue::Record(r) => record_node(r.clone(), params.clone()),
            NodeValue::Node(n) => Ok(n.clone()),
        }
    }
}
