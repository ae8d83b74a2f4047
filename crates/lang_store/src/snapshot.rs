// ==============================================================================
// Snapshot Cache
// ==============================================================================
//
// Process-wide stores keyed by workspace. A snapshot is replaced only when
// its content checksum changes. Rebuilds of one key are single-flight: the
// first caller builds, concurrent callers for the same checksum wait for it
// and share the result. Readers never wait on a rebuild; they see the
// previous snapshot until the new one is published.

use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;

use crate::Store;

#[derive(Clone)]
pub struct Snapshot {
    pub checksum: u64,
    pub store: Arc<Store>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("checksum", &self.checksum)
            .field("pins", &self.store.pin_count())
            .finish()
    }
}

#[derive(Default)]
struct Slot {
    published: RwLock<Option<Snapshot>>,
    rebuild: Mutex<()>,
}

impl Slot {
    fn published(&self) -> Option<Snapshot> {
        match self.published.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let mut guard = match self.published.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(snapshot);
    }
}

pub struct SnapshotCache<K> {
    slots: DashMap<K, Arc<Slot>>,
}

impl<K: Eq + Hash + Clone> Default for SnapshotCache<K> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> SnapshotCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published snapshot for `key`, without waiting on a rebuild.
    pub fn current(&self, key: &K) -> Option<Snapshot> {
        // clone the slot out so no map shard stays locked
        let slot = self.slots.get(key).map(|entry| entry.value().clone())?;
        slot.published()
    }

    /// The snapshot for `key` at `checksum`, building it with `build` when
    /// the published one is missing or stale.
    pub fn refresh(&self, key: &K, checksum: u64, build: impl FnOnce() -> Store) -> Snapshot {
        let slot = self.slots.entry(key.clone()).or_default().value().clone();
        if let Some(snapshot) = slot.published().filter(|s| s.checksum == checksum) {
            return snapshot;
        }

        let _rebuilding = match slot.rebuild.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // another caller may have finished this rebuild while we waited
        if let Some(snapshot) = slot.published().filter(|s| s.checksum == checksum) {
            return snapshot;
        }

        let snapshot = Snapshot {
            checksum,
            store: Arc::new(build()),
        };
        log::info!(
            "published snapshot {checksum:#x} with {} pins",
            snapshot.store.pin_count()
        );
        slot.publish(snapshot.clone());
        snapshot
    }

    /// Drop the snapshot for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
