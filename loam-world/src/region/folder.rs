use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Weak},
};

use parking_lot::RwLock;

use super::{
    Region, RegionManager,
    file::{RegionFile, Slots},
    stored::StoredRegion,
};
use crate::{
    cache::ChunkCache,
    chunk::{ChunkReadingError, ChunkWritingError},
    coordinates::RegionPos,
};

/// Regions persisted as one `r.<x>.<z>.lmr` file each inside a folder.
///
/// Every region file in the folder is read when the manager is opened.
pub struct FolderRegionManager {
    this: Weak<Self>,
    folder: PathBuf,
    regions: RwLock<BTreeMap<RegionPos, Arc<StoredRegion>>>,
    cache: Arc<dyn ChunkCache>,
}

impl FolderRegionManager {
    pub fn open(folder: &Path, cache: Arc<dyn ChunkCache>) -> Result<Arc<Self>, ChunkReadingError> {
        fs::create_dir_all(folder).map_err(|err| ChunkReadingError::IoError(err.kind()))?;

        let mut loaded: Vec<(RegionPos, Slots)> = Vec::new();
        let entries = fs::read_dir(folder).map_err(|err| ChunkReadingError::IoError(err.kind()))?;
        for entry in entries {
            let entry = entry.map_err(|err| ChunkReadingError::IoError(err.kind()))?;
            let file_name = entry.file_name();
            let Some(pos) = file_name.to_str().and_then(RegionFile::parse_file_name) else {
                continue;
            };

            let slots = RegionFile::new(entry.path()).read()?;
            log::debug!("Loaded region file {:?}", entry.path());
            loaded.push((pos, slots));
        }

        Ok(Arc::new_cyclic(|this: &Weak<Self>| {
            let manager: Weak<dyn RegionManager> = this.clone();
            let regions = loaded
                .into_iter()
                .map(|(pos, slots)| {
                    let file = RegionFile::in_folder(folder, pos);
                    let region =
                        StoredRegion::with_slots(pos, slots, cache.clone(), manager.clone(), Some(file));
                    (pos, Arc::new(region))
                })
                .collect();

            Self {
                this: this.clone(),
                folder: folder.to_path_buf(),
                regions: RwLock::new(regions),
                cache,
            }
        }))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl RegionManager for FolderRegionManager {
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
            let file = RegionFile::in_folder(&self.folder, pos);
            Arc::new(StoredRegion::new(pos, self.cache.clone(), this, Some(file)))
        });
        region.clone()
    }

    fn delete_region(&self, pos: RegionPos) -> Result<bool, ChunkWritingError> {
        let mut regions = self.regions.write();
        let Some(region) = regions.get(&pos) else {
            return Ok(false);
        };

        if let Some(file) = region.file() {
            file.remove()?;
        }
        regions.remove(&pos);
        Ok(true)
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
