use std::{
    io::{self, Write},
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use parking_lot::RwLock;

use super::{
    Region, RegionManager,
    file::{RegionFile, Slots, StoredChunk, empty_slots},
};
use crate::{
    cache::ChunkCache,
    chunk::{Chunk, ChunkKey, ChunkReadingError, ChunkRef, ChunkWritingError},
    coordinates::{LocalPos, RegionPos, join, split},
};

/// A region whose slots hold serialized chunks in memory, optionally backed by a region file.
///
/// Mutations only touch memory. [`Region::flush`] writes the whole file when something changed
/// since the last flush, or removes it once the region holds no chunk.
pub struct StoredRegion {
    pos: RegionPos,
    slots: RwLock<Slots>,
    pending: AtomicBool,
    cache: Arc<dyn ChunkCache>,
    regions: Weak<dyn RegionManager>,
    file: Option<RegionFile>,
}

impl StoredRegion {
    pub fn new(
        pos: RegionPos,
        cache: Arc<dyn ChunkCache>,
        regions: Weak<dyn RegionManager>,
        file: Option<RegionFile>,
    ) -> Self {
        Self::with_slots(pos, empty_slots(), cache, regions, file)
    }

    pub fn with_slots(
        pos: RegionPos,
        slots: Slots,
        cache: Arc<dyn ChunkCache>,
        regions: Weak<dyn RegionManager>,
        file: Option<RegionFile>,
    ) -> Self {
        Self {
            pos,
            slots: RwLock::new(slots),
            pending: AtomicBool::new(false),
            cache,
            regions,
            file,
        }
    }

    pub fn file(&self) -> Option<&RegionFile> {
        self.file.as_ref()
    }

    fn handle(&self, chunk: Chunk) -> ChunkRef {
        ChunkRef::new(chunk, self.regions.clone(), Arc::downgrade(&self.cache))
    }

    fn key(&self, local: LocalPos) -> ChunkKey {
        ChunkKey::from(join(self.pos, local))
    }

    fn store(&self, local: LocalPos, data: Bytes) {
        self.slots.write()[local.index()] = Some(StoredChunk::new(data));
        self.pending.store(true, Ordering::Release);
    }

    fn load(&self, local: LocalPos) -> Result<Option<Chunk>, ChunkReadingError> {
        let data = match &self.slots.read()[local.index()] {
            Some(stored) => stored.data.clone(),
            None => return Ok(None),
        };
        Chunk::from_bytes(&data, join(self.pos, local))
            .map(Some)
            .map_err(ChunkReadingError::ParsingError)
    }
}

impl Region for StoredRegion {
    fn pos(&self) -> RegionPos {
        self.pos
    }

    fn chunk_exists(&self, local: LocalPos) -> bool {
        self.slots.read()[local.index()].is_some()
    }

    fn get_chunk(&self, local: LocalPos) -> Result<Option<Chunk>, ChunkReadingError> {
        self.load(local)
    }

    fn get_chunk_ref(&self, local: LocalPos) -> Result<Option<ChunkRef>, ChunkReadingError> {
        if !self.chunk_exists(local) {
            return Ok(None);
        }
        if let Some(chunk) = self.cache.fetch(&self.key(local)) {
            return Ok(Some(chunk));
        }

        let Some(chunk) = self.load(local)? else {
            return Ok(None);
        };
        log::trace!("Loaded chunk {} from region {}", chunk.position(), self.pos);
        let chunk = self.handle(chunk);
        self.cache.insert(chunk.clone());
        Ok(Some(chunk))
    }

    fn create_chunk(&self, local: LocalPos) -> Result<ChunkRef, ChunkWritingError> {
        let position = join(self.pos, local);
        if self.delete_chunk(local) {
            log::debug!("Replacing existing chunk {}", position);
        }

        let chunk = Chunk::new(position);
        self.store(local, Bytes::from(chunk.to_bytes()?));

        let chunk = self.handle(chunk);
        self.cache.insert(chunk.clone());
        Ok(chunk)
    }

    fn save_chunk(&self, chunk: &Chunk) -> Result<bool, ChunkWritingError> {
        let (region, local) = split(&chunk.position());
        if region != self.pos {
            return Ok(false);
        }

        let data = chunk.to_bytes()?;
        // The live handle would shadow the new payload
        self.cache.remove(&self.key(local));
        self.store(local, Bytes::from(data));
        Ok(true)
    }

    fn delete_chunk(&self, local: LocalPos) -> bool {
        let removed = self.slots.write()[local.index()].take().is_some();
        if removed {
            self.cache.remove(&self.key(local));
            self.pending.store(true, Ordering::Release);
        }
        removed
    }

    fn chunk_count(&self) -> usize {
        self.slots.read().iter().flatten().count()
    }

    fn chunk_out_stream(&self, local: LocalPos) -> Box<dyn Write + '_> {
        Box::new(ChunkOutStream {
            region: self,
            local,
            buffer: Vec::new(),
            uncommitted: false,
        })
    }

    fn flush(&self) -> Result<(), ChunkWritingError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if !self.pending.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let slots = self.slots.read();
        let written = if slots.iter().all(Option::is_none) {
            log::debug!("Not writing empty region {}", self.pos);
            file.remove()
        } else {
            file.write(&slots)
        };
        written.inspect_err(|_| {
            // Try again on the next flush
            self.pending.store(true, Ordering::Release);
        })
    }
}

/// Collects a chunk's serialized bytes and commits them into its slot.
struct ChunkOutStream<'a> {
    region: &'a StoredRegion,
    local: LocalPos,
    buffer: Vec<u8>,
    uncommitted: bool,
}

impl ChunkOutStream<'_> {
    fn commit(&mut self) {
        if self.uncommitted {
            self.region
                .store(self.local, Bytes::copy_from_slice(&self.buffer));
            self.uncommitted = false;
        }
    }
}

impl Write for ChunkOutStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.uncommitted = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for ChunkOutStream<'_> {
    fn drop(&mut self) {
        self.commit();
    }
}
