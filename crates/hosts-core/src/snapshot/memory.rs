// # Memory Snapshot Store
//
// In-memory implementation of SnapshotStore.
//
// ## Purpose
//
// Keeps the last saved snapshot in memory. Useful for embedding the record
// store in tests or in processes that seed their records from elsewhere.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - Clones share the same slot, so a clone can observe what the store saved

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::snapshot_store::{Snapshot, SnapshotStore};

/// In-memory snapshot store
///
/// # Example
///
/// ```rust,no_run
/// use hosts_core::snapshot::MemorySnapshotStore;
/// use hosts_core::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let snapshots = MemorySnapshotStore::new();
///     let store = RecordStore::open(Box::new(snapshots.clone()), Default::default()).await?;
///
///     store.add_record("router", "192.0.2.1").await?;
///     assert_eq!(snapshots.saved().await.map(|s| s.len()), Some(1));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<RwLock<Option<Snapshot>>>,
    save_count: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    /// Create an empty memory snapshot store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose first `load` returns `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(snapshot))),
            save_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Last saved (or seeded) snapshot
    pub async fn saved(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Snapshot, Error> {
        Ok(self.inner.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), Error> {
        *self.inner.write().await = Some(snapshot.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
