//! The record → directory path of the reflective tree adapter, generalizing
//! the original `ffs/struct.go`'s `reflectStruct` to Rust's declarative
//! [`Field`] builder, since Rust has no runtime struct-tag reflection: a
//! record describes its own shape by returning a small schema value instead
//! of being inspected for tagged fields.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Proto, Result};
use crate::fcall::{QId, QIdType, Stat, dm};
use crate::ffs::convert::Params;
use crate::ffs::field::{Field, FieldMode};
use crate::ffs::node_value::NodeValue;
use crate::node::{Dir, Node, probe_dir};

/// A value that describes itself as a set of [`Field`]s: the builder
/// analogue of a Go struct's `np:"<name>,<opt>,..."` tagged fields.
/// `fields()` is called fresh on every `Stat`/`Children`/`Walk`, so a
/// `Record` backed by mutable state (behind a `Mutex`, an atomic, a
/// `RwLock`, ...) stays live — the caller's own synchronization, same as
/// any other [`Node`] capability.
pub trait Record: Send + Sync {
    fn fields(&self) -> Vec<Field>;

    /// If this record's own value additionally implements [`Node`] — to
    /// supply a base `Stat` or extra capabilities when it presents with no
    /// children and no special fields — return it. Mirrors `reflectStruct`'s
    /// fallback `if n, ok := iface.(np.Node); ok { return n }`.
    fn as_node(self: Arc<Self>) -> Option<Arc<dyn Node>> {
        None
    }
}

#[derive(Default)]
struct Special {
    stat: Option<Stat>,
    qid: Option<QId>,
    name: Option<String>,
    len: Option<u64>,
    typ: Option<u16>,
    dev: Option<u32>,
    ver: Option<u32>,
    atime: Option<u32>,
    mtime: Option<u32>,
    uid: Option<String>,
    gid: Option<String>,
    muid: Option<String>,
}

impl Special {
    fn any(&self) -> bool {
        self.stat.is_some()
            || self.qid.is_some()
            || self.name.is_some()
            || self.len.is_some()
            || self.typ.is_some()
            || self.dev.is_some()
            || self.ver.is_some()
            || self.atime.is_some()
            || self.mtime.is_some()
            || self.uid.is_some()
            || self.gid.is_some()
            || self.muid.is_some()
    }

    /// Applies the special fields on top of `st`, in the same order as
    /// `specialFields.toStat`: a whole-`Stat` override first, then each
    /// individual component layered on top of it.
    fn apply(&self, st: &mut Stat) {
        if let Some(s) = &self.stat {
            *st = s.clone();
        }
        if let Some(q) = self.qid {
            st.qid = q;
        }
        if let Some(n) = &self.name {
            st.name = n.clone();
        }
        if let Some(l) = self.len {
            st.length = l;
        }
        if let Some(t) = self.typ {
            st.typ = t;
        }
        if let Some(d) = self.dev {
            st.dev = d;
        }
        if let Some(v) = self.ver {
            st.qid.version = v;
        }
        if let Some(a) = self.atime {
            st.atime = a;
        }
        if let Some(m) = self.mtime {
            st.mtime = m;
        }
        if let Some(u) = &self.uid {
            st.uid = u.clone();
        }
        if let Some(g) = &self.gid {
            st.gid = g.clone();
        }
        if let Some(m) = &self.muid {
            st.muid = m.clone();
        }
    }
}

struct Child {
    name: String,
    mode: FieldMode,
    value: NodeValue,
}

/// Splits a record's `fields()` into child-producing fields, splat
/// values, and the stat-component ("special") fields, matching
/// `reflectStruct`'s per-field tag dispatch.
fn partition(fields: Vec<Field>) -> (Vec<Child>, Vec<NodeValue>, Special) {
    let mut children = Vec::new();
    let mut splats = Vec::new();
    let mut special = Special::default();
    for f in fields {
        match f {
            Field::Child { name, mode, value } => children.push(Child { name, mode, value }),
            Field::Splat(value) => splats.push(value),
            Field::Stat(s) => special.stat = Some(s),
            Field::Qid(q) => special.qid = Some(q),
            Field::Name(n) => special.name = Some(n),
            Field::Len(l) => special.len = Some(l),
            Field::Typ(t) => special.typ = Some(t),
            Field::Dev(d) => special.dev = Some(d),
            Field::Ver(v) => special.ver = Some(v),
            Field::Atime(a) => special.atime = Some(a),
            Field::Mtime(m) => special.mtime = Some(m),
            Field::Uid(u) => special.uid = Some(u),
            Field::Gid(g) => special.gid = Some(g),
            Field::Muid(m) => special.muid = Some(m),
        }
    }
    (children, splats, special)
}

/// Shared `Stat` computation for both `RecordDir` and `RecordValue`:
/// starts from the record's own `Stat` (if it additionally implements
/// `Node`), defaults mode to 0o555 if still unset, layers `params`, then
/// the special fields on top — matching `structNode.Stat()` minus the
/// unconditional directory-bit forcing: directory bits are only forced when
/// the record actually presents as a directory (see `RecordDir::stat`).
async fn base_stat(record: &Arc<dyn Record>, params: &Params, special: &Special) -> Result<Stat> {
    let mut st = match record.clone().as_node() {
        Some(n) => n.stat().await?,
        None => Stat::default(),
    };
    if st.mode == 0 {
        st.mode = 0o555;
    }
    params.fill_stat(&mut st);
    special.apply(&mut st);
    Ok(st)
}

/// Resolves a child field's value to its node, wrapping with the field's
/// own name/mode when the converted node didn't already supply them —
/// matching `field.Node`'s post-`ToNode` check.
async fn build_child(child: &Child) -> Result<Arc<dyn Node>> {
    let node = child.value.to_node(&Params::default())?;
    let st = node.stat().await?;
    if st.name.is_empty() || st.mode == 0 {
        let params = Params {
            name: child.name.clone(),
            mode: 0o444 | child.mode.bits(),
            typ: 0,
            dev: 0,
        };
        Ok(Arc::new(crate::ffs::convert::ParamNode {
            params,
            inner: node,
        }))
    } else {
        Ok(node)
    }
}

/// Converts `record` into a served [`Node`], deciding — from the fields it
/// reports right now — whether it presents as a directory (has children
/// or splats), a stat-wrapped value (no children, but special fields), or
/// (neither) whatever `as_node` returns. Mirrors `reflectStruct`'s
/// three-way branch.
pub fn record_node(record: Arc<dyn Record>, params: Params) -> Result<Arc<dyn Node>> {
    let (children, splats, special) = partition(record.fields());

    if !children.is_empty() || !splats.is_empty() {
        return Ok(Arc::new(RecordDir { record, params }));
    }

    if special.any() {
        return Ok(Arc::new(RecordValue { record, params }));
    }

    record.as_node().ok_or(Error::Proto(Proto::NotImplemented))
}

/// A record presenting as a directory: its child fields and splats are
/// re-read from `record.fields()` on every call, so mutable backing state
/// stays live.
struct RecordDir {
    record: Arc<dyn Record>,
    params: Params,
}

#[async_trait]
impl Node for RecordDir {
    async fn stat(&self) -> Result<Stat> {
        let (_, _, special) = partition(self.record.fields());
        let mut st = base_stat(&self.record, &self.params, &special).await?;
        st.mode |= dm::DIR;
        st.qid.typ |= QIdType::DIR;
        Ok(st)
    }

    fn as_dir(self: Arc<Self>) -> Option<Arc<dyn Dir>> {
        Some(self)
    }
}

#[async_trait]
impl Dir for RecordDir {
    async fn children(&self) -> Result<Vec<Stat>> {
        let (children, splats, _) = partition(self.record.fields());
        let mut out = Vec::with_capacity(children.len());
        let mut seen = HashSet::with_capacity(children.len());

        for child in &children {
            let node = build_child(child).await?;
            let st = node.stat().await?;
            if !seen.insert(st.name.clone()) {
                continue;
            }
            out.push(st);
        }

        for splat in &splats {
            let node = splat.to_node(&Params::default())?;
            let dir = probe_dir(node).ok_or(Error::Proto(Proto::WalkNoDir))?;
            for st in dir.children().await? {
                if !seen.insert(st.name.clone()) {
                    continue;
                }
                out.push(st);
            }
        }

        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn walk(&self, name: &str) -> Result<Arc<dyn Node>> {
        let (children, splats, _) = partition(self.record.fields());

        for child in &children {
            let node = build_child(child).await?;
            let st = node.stat().await?;
            if st.name == name {
                return Ok(node);
            }
        }

        for splat in &splats {
            let node = splat.to_node(&Params::default())?;
            let dir = probe_dir(node).ok_or(Error::Proto(Proto::WalkNoDir))?;
            match dir.walk(name).await {
                Ok(n) => return Ok(n),
                Err(Error::Proto(Proto::NotFound)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::Proto(Proto::NotFound))
    }
}

/// A record presenting as a plain value (no children, no splats, but at
/// least one special field): `Stat` comes from `base_stat`; every other
/// capability is reached by unwrapping to `record.as_node()`, the same
/// role `np.Wrapped` plays around `&sn` in the original.
struct RecordValue {
    record: Arc<dyn Record>,
    params: Params,
}

#[async_trait]
impl Node for RecordValue {
    async fn stat(&self) -> Result<Stat> {
        let (_, _, special) = partition(self.record.fields());
        base_stat(&self.record, &self.params, &special).await
    }

    fn as_unwrappable(self: Arc<Self>) -> Option<Arc<dyn Node>> {
        self.record.clone().as_node()
    }
}
