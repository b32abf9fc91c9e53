//! Latest-snapshot cache
//!
//! Holds the most recently completed snapshot behind an atomically replaced
//! `Arc`. Readers never block on a live scan and always see the last known
//! good state; the snapshot itself is never mutated in place.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::HardwareSnapshot;

#[derive(Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<RwLock<Option<Arc<HardwareSnapshot>>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot. Concurrent readers holding the previous
    /// `Arc` keep a consistent view.
    pub async fn publish(&self, snapshot: HardwareSnapshot) {
        let mut guard = self.inner.write().await;
        *guard = Some(Arc::new(snapshot));
    }

    /// Most recently published snapshot, or `None` if no successful tick has
    /// occurred yet.
    pub async fn latest(&self) -> Option<Arc<HardwareSnapshot>> {
        self.inner.read().await.clone()
    }
}
