//! Per-value default stat fields and the param-filling wrapper node,
//! generalizing the original `ffs/reflect.go`'s `Params`/`paramWrap` to
//! Rust's declarative conversion path (there is no `ToNode` dispatch over
//! `any` here — see [`NodeValue::to_node`](super::node_value::NodeValue::to_node)).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::fcall::Stat;
use crate::node::Node;

/// Defaults layered onto a converted value's `Stat` when it left its own
/// name, mode, typ, or dev unset.
#[derive(Clone, Debug, Default)]
pub struct Params {
    pub name: String,
    pub mode: u32,
    pub typ: u16,
    pub dev: u32,
}

impl Params {
    /// A `Params` carrying only a name, no mode/typ/dev defaults.
    pub fn named(name: impl Into<String>) -> Params {
        Params {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fills `st`'s empty fields from `self`, matching `fillStat`: name is
    /// only ever set when absent, mode is ORed in (not replaced), typ/dev
    /// are set only when absent.
    pub fn fill_stat(&self, st: &mut Stat) {
        if st.name.is_empty() {
            st.name = self.name.clone();
        }
        if self.mode != 0 {
            st.mode |= self.mode;
        }
        if st.typ == 0 {
            st.typ = self.typ;
        }
        if st.dev == 0 {
            st.dev = self.dev;
        }
    }
}

/// Wraps a converted node so that `params` fills in whatever its `Stat`
/// left unset, while every other capability is reached by continuing the
/// unwrap chain into the inner node — the Rust analogue of `paramWrap`.
/// Used when a field or sequence element's own converted `Stat` has no
/// name or mode of its own (the common case: strings, byte blobs, nested
/// records/sequences never know the name they're served under).
pub struct ParamNode {
    pub params: Params,
    pub inner: Arc<dyn Node>,
}

#[async_trait]
impl Node for ParamNode {
    async fn stat(&self) -> Result<Stat> {
        let mut st = self.inner.stat().await?;
        self.params.fill_stat(&mut st);
        Ok(st)
    }

    fn as_unwrappable(self: Arc<Self>) -> Option<Arc<dyn Node>> {
        Some(self.inner.clone())
    }
}
