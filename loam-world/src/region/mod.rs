use std::{io::Write, sync::Arc};

use crate::{
    cache::ChunkCache,
    chunk::{Chunk, ChunkReadingError, ChunkRef, ChunkWritingError},
    coordinates::{LocalPos, RegionPos},
};

pub mod compression;
pub mod file;
pub mod folder;
pub mod memory;
pub mod stored;

/// Up to 32x32 chunks stored together, addressed by local position.
pub trait Region: Send + Sync {
    fn pos(&self) -> RegionPos;

    fn chunk_exists(&self, local: LocalPos) -> bool;

    /// The stored payload of a slot. Edits held by a live handle that were not flushed yet are
    /// not part of it.
    fn get_chunk(&self, local: LocalPos) -> Result<Option<Chunk>, ChunkReadingError>;

    /// The live handle of a slot, loading it into the chunk cache when needed.
    fn get_chunk_ref(&self, local: LocalPos) -> Result<Option<ChunkRef>, ChunkReadingError>;

    /// Creates an empty chunk at `local`, replacing whatever was stored there.
    fn create_chunk(&self, local: LocalPos) -> Result<ChunkRef, ChunkWritingError>;

    /// Stores `chunk` at its own position. Returns `false` when that position is not part of
    /// this region.
    fn save_chunk(&self, chunk: &Chunk) -> Result<bool, ChunkWritingError>;

    fn delete_chunk(&self, local: LocalPos) -> bool;

    fn chunk_count(&self) -> usize;

    /// A sink whose bytes replace the slot's payload once flushed or dropped.
    fn chunk_out_stream(&self, local: LocalPos) -> Box<dyn Write + '_>;

    /// Persists pending changes to the backing storage, if there is any.
    fn flush(&self) -> Result<(), ChunkWritingError>;
}

/// Owns the regions of a world.
pub trait RegionManager: Send + Sync {
    fn get_region(&self, pos: RegionPos) -> Option<Arc<dyn Region>>;

    /// Returns the region at `pos`, creating it when it does not exist yet.
    fn create_region(&self, pos: RegionPos) -> Arc<dyn Region>;

    /// Returns whether a region was registered at `pos`. A region whose backing storage could
    /// not be removed stays registered.
    fn delete_region(&self, pos: RegionPos) -> Result<bool, ChunkWritingError>;

    /// Snapshot of all regions in ascending `(x, z)` order.
    fn regions(&self) -> Vec<Arc<dyn Region>>;

    fn cache(&self) -> Arc<dyn ChunkCache>;
}
