use std::{
    fmt,
    io::Write,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use loam_util::math::vector2::Vector2;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use super::{BlockCollection, BlockCollectionEdge, Chunk, ChunkKey, ChunkWritingError};
use crate::{
    cache::ChunkCache,
    coordinates::{ChunkPos, LocalPos, local_of, split},
    region::RegionManager,
};

/// A shared handle to the live state of one chunk.
///
/// Clones point at the same chunk. Whether the handle carries unsaved edits is tracked by its
/// dirty flag. A handle that turns dirty registers itself with its chunk cache, even after the
/// cache evicted it.
#[derive(Clone)]
pub struct ChunkRef {
    inner: Arc<ChunkRefInner>,
}

struct ChunkRefInner {
    position: ChunkPos,
    chunk: RwLock<Chunk>,
    dirty: AtomicBool,
    regions: Weak<dyn RegionManager>,
    cache: Weak<dyn ChunkCache>,
}

impl ChunkRef {
    pub fn new(
        chunk: Chunk,
        regions: Weak<dyn RegionManager>,
        cache: Weak<dyn ChunkCache>,
    ) -> Self {
        Self {
            inner: Arc::new(ChunkRefInner {
                position: chunk.position(),
                chunk: RwLock::new(chunk),
                dirty: AtomicBool::new(false),
                regions,
                cache,
            }),
        }
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.inner.position.x
    }

    #[inline]
    pub fn z(&self) -> i32 {
        self.inner.position.z
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.inner.position
    }

    #[inline]
    pub fn key(&self) -> ChunkKey {
        ChunkKey::from(self.inner.position)
    }

    pub fn local(&self) -> LocalPos {
        local_of(&self.inner.position)
    }

    pub fn local_x(&self) -> usize {
        self.local().x()
    }

    pub fn local_z(&self) -> usize {
        self.local().z()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.inner.chunk.read()
    }

    pub fn blocks(&self) -> MappedRwLockReadGuard<'_, BlockCollection> {
        RwLockReadGuard::map(self.inner.chunk.read(), |chunk| &chunk.blocks)
    }

    /// Write access to the block grid. Marks the handle dirty.
    pub fn blocks_mut(&self) -> MappedRwLockWriteGuard<'_, BlockCollection> {
        self.mark_dirty(true);
        RwLockWriteGuard::map(self.inner.chunk.write(), |chunk| &mut chunk.blocks)
    }

    /// A deep copy of the current live state.
    pub fn snapshot(&self) -> Chunk {
        self.inner.chunk.read().clone()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self, flag: bool) {
        let was_dirty = self.inner.dirty.swap(flag, Ordering::AcqRel);
        if flag && !was_dirty {
            if let Some(cache) = self.inner.cache.upgrade() {
                cache.mark_dirty(self);
            }
        }
    }

    /// Whether both handles point at the same live chunk.
    pub fn same_handle(&self, other: &ChunkRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Looks up the chunk across `edge`. Missing regions or chunks give `None`, so do read
    /// errors, which are logged.
    pub fn neighbor(&self, edge: BlockCollectionEdge) -> Option<ChunkRef> {
        let regions = self.inner.regions.upgrade()?;
        let (dx, dz) = edge.offset();
        // Nothing lies beyond the edge of the coordinate space
        let position = Vector2::new(self.x().checked_add(dx)?, self.z().checked_add(dz)?);
        let (region_pos, local) = split(&position);

        let region = regions.get_region(region_pos)?;
        match region.get_chunk_ref(local) {
            Ok(chunk) => chunk,
            Err(err) => {
                log::warn!(
                    "Failed to read neighbor {} of chunk {}: {}",
                    position,
                    self.position(),
                    err
                );
                None
            }
        }
    }

    pub fn east_neighbor(&self) -> Option<ChunkRef> {
        self.neighbor(BlockCollectionEdge::East)
    }

    pub fn west_neighbor(&self) -> Option<ChunkRef> {
        self.neighbor(BlockCollectionEdge::West)
    }

    pub fn north_neighbor(&self) -> Option<ChunkRef> {
        self.neighbor(BlockCollectionEdge::North)
    }

    pub fn south_neighbor(&self) -> Option<ChunkRef> {
        self.neighbor(BlockCollectionEdge::South)
    }

    /// Serializes the live state into `out`, flushes it and marks the handle clean.
    pub fn save(&self, out: &mut dyn Write) -> Result<(), ChunkWritingError> {
        let bytes = self.read().to_bytes()?;
        out.write_all(&bytes)
            .and_then(|()| out.flush())
            .map_err(|err| ChunkWritingError::IoError(err.kind()))?;
        self.mark_dirty(false);
        Ok(())
    }
}

impl fmt::Debug for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkRef")
            .field("position", &self.inner.position)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
