//! Process-wide watch-list cache.
//!
//! A snapshot of the store's `(name, embedding)` pairs, rebuilt in full
//! after every mutation. The ≤10-row registration cap makes the full-reload
//! strategy deliberately simple; do not replace it with incremental updates
//! without also revisiting that cap.
//!
//! Readers take an `Arc` snapshot and never observe a half-rebuilt cache;
//! `reload` swaps the whole generation under a write lock.

use crate::store::{FaceStore, StoreError};
use lookout_core::WatchedFace;
use std::sync::{Arc, RwLock};

pub struct FaceCache {
    inner: RwLock<Arc<Vec<WatchedFace>>>,
}

impl FaceCache {
    /// An empty cache; call [`reload`](Self::reload) to populate it.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Replace the cache contents with a fresh full read of the store.
    /// Returns the new entry count.
    pub fn reload(&self, store: &FaceStore) -> Result<usize, StoreError> {
        let faces = store.list()?;
        let watched: Vec<WatchedFace> = faces
            .into_iter()
            .map(|f| WatchedFace {
                name: f.name,
                embedding: f.embedding,
            })
            .collect();
        let count = watched.len();

        let mut guard = self.inner.write().expect("face cache lock poisoned");
        *guard = Arc::new(watched);

        tracing::debug!(count, "watch-list cache reloaded");
        Ok(count)
    }

    /// The current generation of `(name, embedding)` pairs for matching.
    pub fn snapshot(&self) -> Arc<Vec<WatchedFace>> {
        self.inner.read().expect("face cache lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("face cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FaceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::{Embedding, EMBEDDING_DIM};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, FaceStore) {
        let dir = TempDir::new().unwrap();
        let store = FaceStore::new(dir.path().join("faces.db"));
        store.initialize().unwrap();
        (dir, store)
    }

    fn embedding(seed: f32) -> Embedding {
        Embedding::new((0..EMBEDDING_DIM).map(|i| seed + i as f32 * 0.001).collect())
    }

    #[test]
    fn test_reload_mirrors_store() {
        let (_dir, store) = test_store();
        store.insert("alice", &embedding(0.1)).unwrap();
        store.insert("bob", &embedding(0.2)).unwrap();

        let cache = FaceCache::new();
        assert_eq!(cache.reload(&store).unwrap(), 2);
        assert_eq!(cache.len(), 2);

        let snapshot = cache.snapshot();
        assert_eq!(snapshot[0].name, "alice");
        assert_eq!(snapshot[1].name, "bob");
    }

    #[test]
    fn test_reload_after_each_mutation_tracks_row_count() {
        let (_dir, store) = test_store();
        let cache = FaceCache::new();

        let id = store.insert("alice", &embedding(0.1)).unwrap();
        cache.reload(&store).unwrap();
        assert_eq!(cache.len(), store.list().unwrap().len());

        store.insert("bob", &embedding(0.2)).unwrap();
        cache.reload(&store).unwrap();
        assert_eq!(cache.len(), store.list().unwrap().len());

        store.delete(id).unwrap();
        cache.reload(&store).unwrap();
        assert_eq!(cache.len(), store.list().unwrap().len());
        assert_eq!(cache.snapshot()[0].name, "bob");
    }

    #[test]
    fn test_snapshot_survives_reload() {
        // An old snapshot stays valid while a reload swaps the generation.
        let (_dir, store) = test_store();
        store.insert("alice", &embedding(0.1)).unwrap();

        let cache = FaceCache::new();
        cache.reload(&store).unwrap();
        let old = cache.snapshot();

        store.delete(1).unwrap();
        cache.reload(&store).unwrap();

        assert_eq!(old.len(), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_empty_cache_snapshot() {
        let cache = FaceCache::new();
        assert!(cache.is_empty());
        assert!(cache.snapshot().is_empty());
    }
}
