use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;

use super::{Region, RegionManager, stored::StoredRegion};
use crate::{cache::ChunkCache, chunk::ChunkWritingError, coordinates::RegionPos};

/// Regions that only live as long as the manager does.
pub struct MemoryRegionManager {
    this: Weak<Self>,
    regions: RwLock<BTreeMap<RegionPos, Arc<StoredRegion>>>,
    cache: Arc<dyn ChunkCache>,
}

impl MemoryRegionManager {
    pub fn new(cache: Arc<dyn ChunkCache>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            regions: RwLock::new(BTreeMap::new()),
            cache,
        })
    }
}

impl RegionManager for MemoryRegionManager {
    fn get_region(&self, pos: RegionPos) -> Option<Arc<dyn Region>> {
        self.regions
            .read()
            .get(&pos)
            .map(|region| region.clone() as Arc<dyn Region>)
    }

    fn create_region(&self, pos: RegionPos) -> Arc<dyn Region> {
        let mut regions = self.regions.write();
        let region = regions.entry(pos).or_insert_with(|| {
            log::trace!("Creating region {}", pos);
            let this: Weak<dyn RegionManager> = self.this.clone();
            Arc::new(StoredRegion::new(pos, self.cache.clone(), this, None))
        });
        region.clone()
    }

    fn delete_region(&self, pos: RegionPos) -> Result<bool, ChunkWritingError> {
        Ok(self.regions.write().remove(&pos).is_some())
    }

    fn regions(&self) -> Vec<Arc<dyn Region>> {
        self.regions
            .read()
            .values()
            .map(|region| region.clone() as Arc<dyn Region>)
            .collect()
    }

    fn cache(&self) -> Arc<dyn ChunkCache> {
        self.cache.clone()
    }
}
