//! Ordered sequence → directory, generalizing the original `ffs/array.go`'s
//! `reflectArray` (Go slices/arrays) to a declared `Vec<NodeValue>`: Rust has
//! no runtime slice reflection, so the sequence is just handed to us already
//! typed.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Proto, Result};
use crate::fcall::{QIdType, Stat, dm};
use crate::ffs::convert::Params;
use crate::ffs::node_value::NodeValue;
use crate::node::{Dir, Node};

/// A directory whose children are `items`' elements, named by index
/// unless an element's own `Stat` supplies a name. Listed in insertion
/// order, unlike a record's children (which sort by name) — a sequence
/// preserves the order its elements were given in.
pub struct SequenceDir {
    items: Vec<NodeValue>,
    params: Params,
}

impl SequenceDir {
    pub fn new(items: Vec<NodeValue>, params: Params) -> SequenceDir {
        SequenceDir { items, params }
    }
}

#[async_trait]
impl Node for SequenceDir {
    async fn stat(&self) -> Result<Stat> {
        let mut st = Stat {
            mode: 0o555,
            ..Default::default()
        };
        self.params.fill_stat(&mut st);
        st.mode |= dm::DIR;
        st.qid.typ |= QIdType::DIR;
        Ok(st)
    }

    fn as_dir(self: Arc<Self>) -> Option<Arc<dyn Dir>> {
        Some(self)
    }
}

#[async_trait]
impl Dir for SequenceDir {
    async fn children(&self) -> Result<Vec<Stat>> {
        let mut out = Vec::with_capacity(self.items.len());
        let mut seen = HashSet::with_capacity(self.items.len());
        for (i, item) in self.items.iter().enumerate() {
            let node = item.to_node(&Params::named(i.to_string()))?;
            let st = node.stat().await?;
            // Duplicate names after conversion (elements supplying their
            // own name) are dropped, first-wins.
            if !seen.insert(st.name.clone()) {
                continue;
            }
            out.push(st);
        }
        Ok(out)
    }

    async fn walk(&self, name: &str) -> Result<Arc<dyn Node>> {
        for (i, item) in self.items.iter().enumerate() {
            let node = item.to_node(&Params::named(i.to_string()))?;
            let st = node.stat().await?;
            if st.name == name {
                return Ok(node);
            }
        }
        Err(Error::Proto(Proto::NotFound))
    }
}
