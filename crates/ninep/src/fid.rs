//! The fid table: client-chosen 32-bit handles mapped to server-side state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::node::Node;

/// Per-fid state. `path` is immutable after construction; `open` is the
/// node bound by a prior `Open`, mutated only under `open`'s own lock,
/// which also serializes Open/Read/Write/Clunk on this one fid.
pub struct FidState {
    /// Path components from root, as walked to reach this fid.
    pub path: Vec<String>,
    /// The node bound by `Open`, if any. `None` means Read/Write/Clunk
    /// should resolve the node fresh from `path`.
    pub open: Mutex<Option<Arc<dyn Node>>>,
}

impl FidState {
    pub fn new(path: Vec<String>) -> Arc<FidState> {
        Arc::new(FidState {
            path,
            open: Mutex::new(None),
        })
    }
}

/// Concurrent `fid -> FidState` map. The table itself is one `RwLock`
/// guarding O(1) insert/get/remove; the mutable `open` slot of each entry
/// has its own lock so operations on different fids never contend.
#[derive(Default)]
pub struct FidTable {
    fids: RwLock<HashMap<u32, Arc<FidState>>>,
}

impl FidTable {
    pub fn new() -> FidTable {
        FidTable {
            fids: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, fid: u32) -> Option<Arc<FidState>> {
        self.fids.read().await.get(&fid).cloned()
    }

    pub async fn contains(&self, fid: u32) -> bool {
        self.fids.read().await.contains_key(&fid)
    }

    /// Inserts a fresh fid. Returns `false` (without inserting) if `fid`
    /// is already in use.
    pub async fn insert(&self, fid: u32, state: Arc<FidState>) -> bool {
        let mut fids = self.fids.write().await;
        if fids.contains_key(&fid) {
            return false;
        }
        fids.insert(fid, state);
        true
    }

    pub async fn remove(&self, fid: u32) -> Option<Arc<FidState>> {
        self.fids.write().await.remove(&fid)
    }

    /// Unconditionally binds `fid` to `state`, overwriting any existing
    /// entry. Used by `Walk`'s final step, where `fid == newfid` (walking a
    /// fid to a new path in place) must replace the existing entry rather
    /// than be rejected the way [`insert`](FidTable::insert) would reject it.
    pub async fn set(&self, fid: u32, state: Arc<FidState>) {
        self.fids.write().await.insert(fid, state);
    }
}
