//! Relighting of edited chunks.
//!
//! Every chunk of the batch first has its light reset, then rebuilt from its own blocks. Both
//! passes are independent per chunk and run in parallel. Only once every chunk is rebuilt does
//! stitching run, so it always reads the final light of a neighbor. A chunk is stitched only
//! against neighbors outside of the batch; two neighbors that are both part of the batch are
//! left alone.

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::chunk::{BlockCollectionEdge, ChunkKey, ChunkRef};

/// What relighting needs from a chunk.
pub trait Relightable: Clone + Send + Sync {
    fn key(&self) -> ChunkKey;

    fn reset_light(&self);

    fn rebuild_light(&self);

    fn neighbor(&self, edge: BlockCollectionEdge) -> Option<Self>;

    /// Pulls light from `neighbor`, which lies across `edge`, into this chunk.
    fn stitch_light(&self, neighbor: &Self, edge: BlockCollectionEdge);
}

impl Relightable for ChunkRef {
    fn key(&self) -> ChunkKey {
        ChunkRef::key(self)
    }

    fn reset_light(&self) {
        let mut blocks = self.blocks_mut();
        blocks.reset_block_light();
        blocks.reset_sky_light();
    }

    fn rebuild_light(&self) {
        let mut blocks = self.blocks_mut();
        blocks.rebuild_block_light();
        blocks.rebuild_sky_light();
    }

    fn neighbor(&self, edge: BlockCollectionEdge) -> Option<Self> {
        ChunkRef::neighbor(self, edge)
    }

    fn stitch_light(&self, neighbor: &Self, edge: BlockCollectionEdge) {
        let source = neighbor.blocks();
        let mut blocks = self.blocks_mut();
        blocks.stitch_block_light(&source, edge);
        blocks.stitch_sky_light(&source, edge);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelightSummary {
    /// Chunks that were reset and rebuilt
    pub relit: usize,
    /// Edges stitched against a neighbor outside of the batch
    pub stitched: usize,
}

/// Relights `chunks`. Entries sharing a key collapse into the last one.
pub fn relight<C: Relightable>(chunks: impl IntoIterator<Item = C>) -> RelightSummary {
    let mut batch: IndexMap<ChunkKey, C> = IndexMap::new();
    for chunk in chunks {
        batch.insert(chunk.key(), chunk);
    }
    let relit: Vec<&C> = batch.values().collect();

    relit.par_iter().for_each(|chunk| chunk.reset_light());
    relit.par_iter().for_each(|chunk| chunk.rebuild_light());

    let mut stitched = 0;
    for chunk in &relit {
        let key = chunk.key();
        for edge in BlockCollectionEdge::ALL {
            let (dx, dz) = edge.offset();
            if batch.contains_key(&key.offset(dx, dz)) {
                continue;
            }
            match chunk.neighbor(edge) {
                Some(neighbor) => {
                    chunk.stitch_light(&neighbor, edge);
                    stitched += 1;
                }
                None => log::trace!("No {:?} neighbor for chunk {:?}", edge, key),
            }
        }
    }

    log::debug!("Relit {} chunks, stitched {} edges", relit.len(), stitched);
    RelightSummary {
        relit: relit.len(),
        stitched,
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashSet,
        num::NonZeroUsize,
        sync::{Arc, Mutex},
    };

    use loam_util::math::vector2::Vector2;

    use super::{RelightSummary, Relightable, relight};
    use crate::{
        chunk::{BlockCollectionEdge, ChunkKey, block::Block},
        manager::ChunkManager,
    };

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        Reset(ChunkKey),
        Rebuild(ChunkKey),
        Stitch(ChunkKey, ChunkKey, BlockCollectionEdge),
    }

    /// Records what relighting does to it. Neighbors exist wherever `world` has a key.
    #[derive(Clone)]
    struct Spy {
        key: ChunkKey,
        world: Arc<HashSet<ChunkKey>>,
        log: Arc<Mutex<Vec<Event>>>,
    }

    impl Relightable for Spy {
        fn key(&self) -> ChunkKey {
            self.key
        }

        fn reset_light(&self) {
            self.log.lock().unwrap().push(Event::Reset(self.key));
        }

        fn rebuild_light(&self) {
            self.log.lock().unwrap().push(Event::Rebuild(self.key));
        }

        fn neighbor(&self, edge: BlockCollectionEdge) -> Option<Self> {
            let (dx, dz) = edge.offset();
            let key = self.key.offset(dx, dz);
            self.world.contains(&key).then(|| Spy {
                key,
                world: self.world.clone(),
                log: self.log.clone(),
            })
        }

        fn stitch_light(&self, neighbor: &Self, edge: BlockCollectionEdge) {
            self.log
                .lock()
                .unwrap()
                .push(Event::Stitch(self.key, neighbor.key, edge));
        }
    }

    fn spies(world: &[(i32, i32)], dirty: &[(i32, i32)]) -> (Vec<Spy>, Arc<Mutex<Vec<Event>>>) {
        let world: Arc<HashSet<ChunkKey>> =
            Arc::new(world.iter().map(|&(x, z)| ChunkKey::new(x, z)).collect());
        let log = Arc::new(Mutex::new(Vec::new()));
        let spies = dirty
            .iter()
            .map(|&(x, z)| Spy {
                key: ChunkKey::new(x, z),
                world: Arc::clone(&world),
                log: log.clone(),
            })
            .collect();
        (spies, log)
    }

    #[test]
    fn dirty_neighbors_are_not_stitched_together() {
        // A at (0, 0), B west of it at (0, 1), C east of it at (0, -1)
        let (a, b, c) = (ChunkKey::new(0, 0), ChunkKey::new(0, 1), ChunkKey::new(0, -1));
        let (chunks, log) = spies(&[(0, 0), (0, 1), (0, -1)], &[(0, 0), (0, 1)]);

        let summary = relight(chunks);
        assert_eq!(summary, RelightSummary { relit: 2, stitched: 1 });

        let events = log.lock().unwrap().clone();
        let stitches: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, Event::Stitch(..)))
            .collect();
        assert_eq!(stitches, [&Event::Stitch(a, c, BlockCollectionEdge::East)]);
        assert!(!events.contains(&Event::Stitch(a, b, BlockCollectionEdge::West)));
        assert!(!events.contains(&Event::Stitch(b, a, BlockCollectionEdge::East)));
    }

    #[test]
    fn passes_run_in_order() {
        let (chunks, log) = spies(&[(0, 0), (5, 5), (1, 0)], &[(0, 0), (5, 5)]);
        relight(chunks);

        let events = log.lock().unwrap().clone();
        let last_reset = events
            .iter()
            .rposition(|event| matches!(event, Event::Reset(_)))
            .unwrap();
        let first_rebuild = events
            .iter()
            .position(|event| matches!(event, Event::Rebuild(_)))
            .unwrap();
        let first_stitch = events
            .iter()
            .position(|event| matches!(event, Event::Stitch(..)))
            .unwrap();
        let last_rebuild = events
            .iter()
            .rposition(|event| matches!(event, Event::Rebuild(_)))
            .unwrap();

        assert!(last_reset < first_rebuild);
        assert!(last_rebuild < first_stitch);
        assert_eq!(events.len(), 2 + 2 + 1);
    }

    #[test]
    fn duplicates_are_relit_once() {
        let (mut chunks, log) = spies(&[], &[(2, 2), (3, 3)]);
        chunks.push(chunks[0].clone());

        let summary = relight(chunks);
        assert_eq!(summary.relit, 2);
        let resets = log
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, Event::Reset(_)))
            .count();
        assert_eq!(resets, 2);
    }

    #[test]
    fn lonely_chunks_are_not_stitched() {
        let (chunks, log) = spies(&[(0, 0)], &[(0, 0)]);
        assert_eq!(relight(chunks), RelightSummary { relit: 1, stitched: 0 });
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn light_crosses_into_a_clean_neighbor_region() {
        let manager = ChunkManager::in_memory(NonZeroUsize::new(16).unwrap());

        // C sits east of A, in the region to the east of A's
        let c = manager.create_chunk(Vector2::new(0, -1)).unwrap();
        c.blocks_mut().set_block(4, 20, 15, Block::GLOWSTONE.id);
        manager.relight_dirty_chunks();
        manager.save().unwrap();
        assert!(!c.is_dirty());
        let c_before = c.snapshot();
        assert_eq!(c_before.blocks.block_light(4, 20, 15), 15);

        let a = manager.create_chunk(Vector2::new(0, 0)).unwrap();
        let b = manager.create_chunk(Vector2::new(0, 1)).unwrap();
        a.mark_dirty(true);
        b.mark_dirty(true);

        let summary = manager.relight_dirty_chunks();
        assert_eq!(summary.relit, 2);
        assert_eq!(summary.stitched, 1);

        // C is untouched and A's face continues C's light
        assert_eq!(c.snapshot(), c_before);
        assert!(!c.is_dirty());
        let blocks = a.blocks();
        assert_eq!(blocks.block_light(4, 20, 0), c_before.blocks.block_light(4, 20, 15) - 1);
        assert_eq!(blocks.block_light(4, 20, 1), 13);
        assert_eq!(blocks.sky_light(4, 20, 0), 15);

        // B only rebuilt its own light, nothing reached it from C
        assert_eq!(b.blocks().block_light(4, 20, 0), 0);
    }
}
