use std::{
    iter::{self, FusedIterator},
    sync::Arc,
    vec,
};

use thiserror::Error;

use crate::{
    chunk::ChunkRef,
    coordinates::LocalPos,
    manager::ChunkManager,
    region::Region,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IteratorStateError {
    #[error("The iterator has not been advanced yet")]
    NotStarted,
    #[error("The iterator is exhausted")]
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NotStarted,
    Active,
    Exhausted,
}

/// Lazily walks every stored chunk.
///
/// Regions come in the region manager's order, slots within a region in row major order (local
/// x outer, local z inner). The region list is a snapshot taken on creation and on
/// [`ChunkIter::reset`]; regions or chunks created or deleted while iterating may or may not be
/// seen.
pub struct ChunkIter {
    manager: ChunkManager,
    regions: vec::IntoIter<Arc<dyn Region>>,
    region: Option<Arc<dyn Region>>,
    slots: Box<dyn Iterator<Item = LocalPos>>,
    current: Option<ChunkRef>,
    state: State,
}

impl ChunkIter {
    pub fn new(manager: ChunkManager) -> Self {
        let regions = manager.region_manager().regions().into_iter();
        Self {
            manager,
            regions,
            region: None,
            slots: Box::new(iter::empty()),
            current: None,
            state: State::NotStarted,
        }
    }

    /// Moves to the next stored chunk. Returns `false` once there is none left.
    pub fn advance(&mut self) -> bool {
        if self.state == State::Exhausted {
            return false;
        }

        loop {
            let region = match self.region.clone() {
                Some(region) => region,
                None => {
                    let Some(region) = self.regions.next() else {
                        self.current = None;
                        self.state = State::Exhausted;
                        return false;
                    };
                    self.slots = Box::new(LocalPos::all());
                    self.region = Some(region.clone());
                    region
                }
            };

            for local in self.slots.by_ref() {
                if !region.chunk_exists(local) {
                    continue;
                }

                match self.manager.chunk_ref_in_region(region.as_ref(), local) {
                    Ok(Some(chunk)) => {
                        self.current = Some(chunk);
                        self.state = State::Active;
                        return true;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log::warn!("Skipping chunk {} of region {}: {}", local, region.pos(), err);
                    }
                }
            }

            self.region = None;
        }
    }

    /// The chunk the last successful [`ChunkIter::advance`] moved to.
    pub fn current(&self) -> Result<&ChunkRef, IteratorStateError> {
        match (self.state, &self.current) {
            (State::Active, Some(chunk)) => Ok(chunk),
            (State::Exhausted, _) => Err(IteratorStateError::Exhausted),
            _ => Err(IteratorStateError::NotStarted),
        }
    }

    /// Starts over with a fresh snapshot of the region list.
    pub fn reset(&mut self) {
        self.regions = self.manager.region_manager().regions().into_iter();
        self.region = None;
        self.slots = Box::new(iter::empty());
        self.current = None;
        self.state = State::NotStarted;
    }
}

impl Iterator for ChunkIter {
    type Item = ChunkRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            self.current.clone()
        } else {
            None
        }
    }
}

impl FusedIterator for ChunkIter {}
