use std::{num::NonZeroUsize, path::Path, sync::Arc};

use loam_config::{StorageConfiguration, chunk::RegionFormat};

use crate::{
    cache::{ChunkCache, LruChunkCache},
    chunk::{Chunk, ChunkReadingError, ChunkRef, ChunkWritingError},
    coordinates::{ChunkPos, LocalPos, join, split},
    iter::ChunkIter,
    region::{Region, RegionManager, folder::FolderRegionManager, memory::MemoryRegionManager},
    relight::{RelightSummary, relight},
};

/// Global chunk operations over a region manager and its chunk cache.
///
/// Cloning gives another view over the same regions and cache; changes made through any view
/// are seen by all of them. Callers serialize structural changes (creating or deleting regions)
/// against iteration, relighting and saving.
#[derive(Clone)]
pub struct ChunkManager {
    regions: Arc<dyn RegionManager>,
    cache: Arc<dyn ChunkCache>,
}

impl ChunkManager {
    pub fn new(regions: Arc<dyn RegionManager>) -> Self {
        let cache = regions.cache();
        Self { regions, cache }
    }

    pub fn in_memory(capacity: NonZeroUsize) -> Self {
        let cache: Arc<dyn ChunkCache> = Arc::new(LruChunkCache::new(capacity));
        Self::new(MemoryRegionManager::new(cache))
    }

    pub fn open_folder(folder: &Path, capacity: NonZeroUsize) -> Result<Self, ChunkReadingError> {
        let cache: Arc<dyn ChunkCache> = Arc::new(LruChunkCache::new(capacity));
        Ok(Self::new(FolderRegionManager::open(folder, cache)?))
    }

    pub fn from_config(config: &StorageConfiguration) -> Result<Self, ChunkReadingError> {
        let capacity = config.cache.capacity;
        match config.chunk.format {
            RegionFormat::Folder => Self::open_folder(&config.world.region_folder(), capacity),
            RegionFormat::Memory => Ok(Self::in_memory(capacity)),
        }
    }

    pub fn region_manager(&self) -> &Arc<dyn RegionManager> {
        &self.regions
    }

    pub fn cache(&self) -> &Arc<dyn ChunkCache> {
        &self.cache
    }

    /// The stored payload at `pos`.
    pub fn get_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>, ChunkReadingError> {
        let (region, local) = split(&pos);
        match self.regions.get_region(region) {
            Some(region) => region.get_chunk(local),
            None => Ok(None),
        }
    }

    pub fn get_chunk_ref(&self, pos: ChunkPos) -> Result<Option<ChunkRef>, ChunkReadingError> {
        let (region, local) = split(&pos);
        match self.regions.get_region(region) {
            Some(region) => region.get_chunk_ref(local),
            None => Ok(None),
        }
    }

    pub fn chunk_ref_in_region(
        &self,
        region: &dyn Region,
        local: LocalPos,
    ) -> Result<Option<ChunkRef>, ChunkReadingError> {
        self.get_chunk_ref(join(region.pos(), local))
    }

    pub fn chunk_exists(&self, pos: ChunkPos) -> bool {
        let (region, local) = split(&pos);
        self.regions
            .get_region(region)
            .is_some_and(|region| region.chunk_exists(local))
    }

    /// Creates an empty chunk, and its region when needed.
    pub fn create_chunk(&self, pos: ChunkPos) -> Result<ChunkRef, ChunkWritingError> {
        let (region, local) = split(&pos);
        self.regions.create_region(region).create_chunk(local)
    }

    /// Stores a copy of the chunk stored at `from` at `to`. The source stays untouched.
    ///
    /// Returns `None` when there is nothing stored at `from`.
    pub fn copy_chunk(
        &self,
        from: ChunkPos,
        to: ChunkPos,
    ) -> Result<Option<ChunkRef>, ChunkWritingError> {
        let Some(chunk) = self.get_chunk(from)? else {
            log::debug!("Not copying {} to {}, the source does not exist", from, to);
            return Ok(None);
        };
        self.set_chunk(to, chunk).map(Some)
    }

    /// Stores `chunk` at `pos`, overwriting whatever was there.
    pub fn set_chunk(&self, pos: ChunkPos, mut chunk: Chunk) -> Result<ChunkRef, ChunkWritingError> {
        chunk.set_location(pos);
        let (region, local) = split(&pos);
        let region = self.regions.create_region(region);
        if !region.save_chunk(&chunk)? {
            return Err(ChunkWritingError::NotPersisted(pos));
        }
        region
            .get_chunk_ref(local)?
            .ok_or(ChunkWritingError::NotPersisted(pos))
    }

    /// Stores `chunk` at its own position. Returns `false` when its region does not exist.
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<bool, ChunkWritingError> {
        let (region, _) = split(&chunk.position());
        match self.regions.get_region(region) {
            Some(region) => region.save_chunk(chunk),
            None => Ok(false),
        }
    }

    /// Deletes the chunk at `pos`, and its region once that holds no chunk anymore.
    ///
    /// Fails when the emptied region can't be removed from its backing storage. The chunk is
    /// gone from memory then, and the region is kept so the next [`ChunkManager::save`] retries.
    pub fn delete_chunk(&self, pos: ChunkPos) -> Result<bool, ChunkWritingError> {
        let (region_pos, local) = split(&pos);
        let Some(region) = self.regions.get_region(region_pos) else {
            return Ok(false);
        };
        if !region.delete_chunk(local) {
            return Ok(false);
        }

        if region.chunk_count() == 0 {
            log::debug!("Region {} is empty, deleting it", region_pos);
            self.regions.delete_region(region_pos)?;
        }
        Ok(true)
    }

    /// Writes every dirty chunk into its region and flushes the regions.
    ///
    /// Dirty chunks whose region or slot was deleted in the meantime are dropped without being
    /// counted. Returns the number of chunks written. On error the dirty set is left as it is.
    pub fn save(&self) -> Result<usize, ChunkWritingError> {
        self.cache.sync_dirty();

        let mut saved = 0;
        for chunk in self.cache.dirty_chunks() {
            let (region_pos, local) = split(&chunk.position());
            let Some(region) = self.regions.get_region(region_pos) else {
                log::trace!("Dropping dirty chunk {}, region {} is gone", chunk.position(), region_pos);
                continue;
            };
            if !region.chunk_exists(local) {
                log::trace!("Dropping dirty chunk {}, it was deleted", chunk.position());
                continue;
            }

            let mut out = region.chunk_out_stream(local);
            chunk.save(&mut out)?;
            saved += 1;
        }

        for region in self.regions.regions() {
            region.flush()?;
        }

        self.cache.clear_dirty();
        log::debug!("Saved {} dirty chunks", saved);
        Ok(saved)
    }

    /// Recomputes the light of every dirty chunk, see [`relight`].
    pub fn relight_dirty_chunks(&self) -> RelightSummary {
        self.cache.sync_dirty();
        relight(self.cache.dirty_chunks())
    }

    /// Every stored chunk, region by region.
    pub fn iter(&self) -> ChunkIter {
        ChunkIter::new(self.clone())
    }
}

impl IntoIterator for &ChunkManager {
    type Item = ChunkRef;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
