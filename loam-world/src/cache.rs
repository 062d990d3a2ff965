use std::num::NonZeroUsize;

use indexmap::IndexMap;
use lru::LruCache;
use parking_lot::Mutex;

use crate::chunk::{ChunkKey, ChunkRef};

/// Keeps live chunk handles around and remembers which of them carry unsaved edits.
///
/// Shared by every region of a region manager and by every chunk manager viewing it.
pub trait ChunkCache: Send + Sync {
    fn insert(&self, chunk: ChunkRef);

    fn fetch(&self, key: &ChunkKey) -> Option<ChunkRef>;

    /// Forgets the handle for `key`, dirty or not. Returns whether anything was removed.
    fn remove(&self, key: &ChunkKey) -> bool;

    /// Records a handle that just turned dirty, whether or not it is still live.
    ///
    /// Ignored when the cache already tracks another handle for the same chunk, that handle
    /// replaced this one.
    fn mark_dirty(&self, chunk: &ChunkRef);

    /// Collects every dirty live handle into the dirty set.
    fn sync_dirty(&self);

    /// Snapshot of the dirty set in the order chunks entered it.
    fn dirty_chunks(&self) -> Vec<ChunkRef>;

    /// Empties the dirty set and marks its members clean.
    fn clear_dirty(&self);

    /// Number of live handles.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bounded [`ChunkCache`]. Handles evicted while dirty are parked in the dirty set until the
/// next flush, handles evicted while clean come back through [`ChunkCache::mark_dirty`] once
/// they are edited.
pub struct LruChunkCache {
    state: Mutex<CacheState>,
}

struct CacheState {
    live: LruCache<ChunkKey, ChunkRef>,
    dirty: IndexMap<ChunkKey, ChunkRef>,
}

impl CacheState {
    fn push(&mut self, chunk: ChunkRef) {
        let key = chunk.key();
        if let Some((evicted_key, evicted)) = self.live.push(key, chunk) {
            if evicted_key != key && evicted.is_dirty() {
                log::trace!("Parking evicted dirty chunk {:?}", evicted_key);
                self.dirty.insert(evicted_key, evicted);
            }
        }
    }
}

impl LruChunkCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                live: LruCache::new(capacity),
                dirty: IndexMap::new(),
            }),
        }
    }
}

impl ChunkCache for LruChunkCache {
    fn insert(&self, chunk: ChunkRef) {
        self.state.lock().push(chunk);
    }

    fn fetch(&self, key: &ChunkKey) -> Option<ChunkRef> {
        let mut state = self.state.lock();
        if let Some(chunk) = state.live.get(key) {
            return Some(chunk.clone());
        }

        // Parked handles are still the newest version of the chunk
        let chunk = state.dirty.get(key).cloned()?;
        state.push(chunk.clone());
        Some(chunk)
    }

    fn remove(&self, key: &ChunkKey) -> bool {
        let mut state = self.state.lock();
        let live = state.live.pop(key).is_some();
        let dirty = state.dirty.shift_remove(key).is_some();
        live || dirty
    }

    fn mark_dirty(&self, chunk: &ChunkRef) {
        let key = chunk.key();
        let mut state = self.state.lock();
        let replaced = state
            .live
            .peek(&key)
            .or_else(|| state.dirty.get(&key))
            .is_some_and(|tracked| !tracked.same_handle(chunk));
        if replaced {
            log::trace!("Ignoring edit through replaced handle of chunk {:?}", key);
            return;
        }
        state.dirty.insert(key, chunk.clone());
    }

    fn sync_dirty(&self) {
        let mut state = self.state.lock();
        let CacheState { live, dirty } = &mut *state;
        for (key, chunk) in live.iter() {
            if chunk.is_dirty() && !dirty.contains_key(key) {
                dirty.insert(*key, chunk.clone());
            }
        }
    }

    fn dirty_chunks(&self) -> Vec<ChunkRef> {
        self.state.lock().dirty.values().cloned().collect()
    }

    fn clear_dirty(&self) {
        let drained: Vec<_> = self.state.lock().dirty.drain(..).collect();
        for (_, chunk) in drained {
            chunk.mark_dirty(false);
        }
    }

    fn len(&self) -> usize {
        self.state.lock().live.len()
    }
}

#[cfg(test)]
mod test {
    use std::{
        num::NonZeroUsize,
        sync::{Arc, Weak},
    };

    use loam_util::math::vector2::Vector2;

    use super::{ChunkCache, LruChunkCache};
    use crate::{
        chunk::{Chunk, ChunkKey, ChunkRef, block::Block},
        region::{RegionManager, memory::MemoryRegionManager},
    };

    fn chunk(x: i32, z: i32) -> ChunkRef {
        let regions: Weak<dyn RegionManager> = Weak::<MemoryRegionManager>::new();
        let cache: Weak<dyn ChunkCache> = Weak::<LruChunkCache>::new();
        ChunkRef::new(Chunk::new(Vector2::new(x, z)), regions, cache)
    }

    /// A handle that reports its edits to `cache`.
    fn owned_by(cache: &Arc<LruChunkCache>, x: i32, z: i32) -> ChunkRef {
        let regions: Weak<dyn RegionManager> = Weak::<MemoryRegionManager>::new();
        let owner: Weak<dyn ChunkCache> = Arc::<LruChunkCache>::downgrade(cache);
        ChunkRef::new(Chunk::new(Vector2::new(x, z)), regions, owner)
    }

    fn cache(capacity: usize) -> LruChunkCache {
        LruChunkCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn fetch_returns_the_same_handle() {
        let cache = cache(4);
        let a = chunk(1, 2);
        cache.insert(a.clone());

        assert!(cache.fetch(&ChunkKey::new(1, 2)).unwrap().same_handle(&a));
        assert!(cache.fetch(&ChunkKey::new(2, 1)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sync_collects_dirty_handles_once() {
        let cache = cache(4);
        let a = chunk(0, 0);
        let b = chunk(0, 1);
        cache.insert(a.clone());
        cache.insert(b.clone());
        a.mark_dirty(true);

        cache.sync_dirty();
        cache.sync_dirty();
        let dirty = cache.dirty_chunks();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].same_handle(&a));

        cache.clear_dirty();
        assert!(cache.dirty_chunks().is_empty());
        assert!(!a.is_dirty());
    }

    #[test]
    fn evicted_dirty_handles_are_parked() {
        let cache = cache(1);
        let a = chunk(0, 0);
        cache.insert(a.clone());
        a.mark_dirty(true);
        cache.insert(chunk(0, 1));

        assert_eq!(cache.len(), 1);
        let dirty = cache.dirty_chunks();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].same_handle(&a));

        // A parked handle is still served to readers
        assert!(cache.fetch(&ChunkKey::new(0, 0)).unwrap().same_handle(&a));
    }

    #[test]
    fn evicted_clean_handles_are_dropped() {
        let cache = cache(1);
        cache.insert(chunk(0, 0));
        cache.insert(chunk(0, 1));

        assert!(cache.fetch(&ChunkKey::new(0, 0)).is_none());
        assert!(cache.dirty_chunks().is_empty());
    }

    #[test]
    fn remove_forgets_dirty_state() {
        let cache = cache(2);
        let a = chunk(3, 3);
        cache.insert(a.clone());
        a.mark_dirty(true);
        cache.sync_dirty();

        assert!(cache.remove(&a.key()));
        assert!(!cache.remove(&a.key()));
        assert!(cache.dirty_chunks().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn edits_after_clean_eviction_are_tracked() {
        let cache = Arc::new(cache(1));
        let a = owned_by(&cache, 0, 0);
        cache.insert(a.clone());
        cache.insert(owned_by(&cache, 0, 1));
        assert!(cache.fetch(&a.key()).is_none());

        a.blocks_mut().set_block(1, 1, 1, Block::STONE.id);
        let dirty = cache.dirty_chunks();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].same_handle(&a));
        assert!(cache.fetch(&a.key()).unwrap().same_handle(&a));

        // Already dirty, nothing new to record
        cache.clear_dirty();
        assert!(!a.is_dirty());
        a.mark_dirty(true);
        a.mark_dirty(true);
        assert_eq!(cache.dirty_chunks().len(), 1);
    }

    #[test]
    fn edits_through_replaced_handles_are_ignored() {
        let cache = Arc::new(cache(4));
        let old = owned_by(&cache, 2, 2);
        cache.insert(old.clone());
        cache.remove(&old.key());
        let new = owned_by(&cache, 2, 2);
        cache.insert(new.clone());

        old.mark_dirty(true);
        assert!(cache.dirty_chunks().is_empty());
        assert!(cache.fetch(&new.key()).unwrap().same_handle(&new));
    }
}
