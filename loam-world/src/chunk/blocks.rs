use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::block::Block;

pub const CHUNK_WIDTH: usize = 16;
pub const CHUNK_HEIGHT: usize = 128;
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

pub const MAX_LIGHT: u8 = 15;

/// Which face of a chunk borders the neighbor being stitched against.
///
/// East and west vary the Z axis, north and south vary the X axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCollectionEdge {
    /// Neighbor at `z - 1`
    East,
    /// Neighbor at `z + 1`
    West,
    /// Neighbor at `x - 1`
    North,
    /// Neighbor at `x + 1`
    South,
}

impl BlockCollectionEdge {
    pub const ALL: [Self; 4] = [Self::East, Self::West, Self::North, Self::South];

    /// Chunk offset `(dx, dz)` of the neighbor across this edge.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::East => (0, -1),
            Self::West => (0, 1),
            Self::North => (-1, 0),
            Self::South => (1, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::North => Self::South,
            Self::South => Self::North,
        }
    }

    /// The `(x, z)` column on this edge at position `along` (0..16).
    const fn column(self, along: usize) -> (usize, usize) {
        match self {
            Self::East => (along, 0),
            Self::West => (along, CHUNK_WIDTH - 1),
            Self::North => (0, along),
            Self::South => (CHUNK_WIDTH - 1, along),
        }
    }
}

#[derive(Clone, Copy)]
enum LightKind {
    Block,
    Sky,
}

/// The block grid of one chunk with its block light and sky light.
///
/// Ordering of every array: yzx (y being the most significant).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCollection {
    blocks: Vec<u16>,
    block_light: Vec<u8>,
    sky_light: Vec<u8>,
}

impl Default for BlockCollection {
    fn default() -> Self {
        Self {
            blocks: vec![Block::AIR.id; CHUNK_VOLUME],
            block_light: vec![0; CHUNK_VOLUME],
            sky_light: vec![0; CHUNK_VOLUME],
        }
    }
}

#[inline]
const fn index(x: usize, y: usize, z: usize) -> usize {
    (y * CHUNK_WIDTH + z) * CHUNK_WIDTH + x
}

#[inline]
const fn unpack(index: usize) -> (usize, usize, usize) {
    (
        index % CHUNK_WIDTH,
        index / (CHUNK_WIDTH * CHUNK_WIDTH),
        (index / CHUNK_WIDTH) % CHUNK_WIDTH,
    )
}

/// Indices of the (up to six) cells sharing a face with `index`.
fn adjacent(index: usize) -> impl Iterator<Item = usize> {
    let (x, y, z) = unpack(index);
    [
        (x > 0).then(|| index - 1),
        (x + 1 < CHUNK_WIDTH).then(|| index + 1),
        (z > 0).then(|| index - CHUNK_WIDTH),
        (z + 1 < CHUNK_WIDTH).then(|| index + CHUNK_WIDTH),
        (y > 0).then(|| index - CHUNK_WIDTH * CHUNK_WIDTH),
        (y + 1 < CHUNK_HEIGHT).then(|| index + CHUNK_WIDTH * CHUNK_WIDTH),
    ]
    .into_iter()
    .flatten()
}

/// Breadth first spread of the queued cells' light into the rest of the grid.
fn flood(blocks: &[u16], light: &mut [u8], mut queue: VecDeque<usize>) {
    while let Some(current) = queue.pop_front() {
        let level = light[current];
        if level <= 1 {
            continue;
        }
        for next in adjacent(current) {
            let cost = Block::properties(blocks[next]).light_cost();
            let candidate = level.saturating_sub(cost);
            if candidate > light[next] {
                light[next] = candidate;
                queue.push_back(next);
            }
        }
    }
}

impl BlockCollection {
    pub(crate) fn is_well_formed(&self) -> bool {
        self.blocks.len() == CHUNK_VOLUME
            && self.block_light.len() == CHUNK_VOLUME
            && self.sky_light.len() == CHUNK_VOLUME
    }

    #[inline]
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> u16 {
        self.blocks[index(x, y, z)]
    }

    /// Sets the block without touching light; lighting is recomputed by relighting.
    #[inline]
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, id: u16) {
        self.blocks[index(x, y, z)] = id;
    }

    #[inline]
    pub fn block_light(&self, x: usize, y: usize, z: usize) -> u8 {
        self.block_light[index(x, y, z)]
    }

    #[inline]
    pub fn sky_light(&self, x: usize, y: usize, z: usize) -> u8 {
        self.sky_light[index(x, y, z)]
    }

    pub fn set_block_light(&mut self, x: usize, y: usize, z: usize, level: u8) {
        self.block_light[index(x, y, z)] = level.min(MAX_LIGHT);
    }

    pub fn set_sky_light(&mut self, x: usize, y: usize, z: usize, level: u8) {
        self.sky_light[index(x, y, z)] = level.min(MAX_LIGHT);
    }

    pub fn reset_block_light(&mut self) {
        self.block_light.fill(0);
    }

    pub fn reset_sky_light(&mut self) {
        self.sky_light.fill(0);
    }

    /// Recomputes block light from the luminous blocks inside this chunk only.
    pub fn rebuild_block_light(&mut self) {
        let mut queue = VecDeque::new();
        for (cell, id) in self.blocks.iter().enumerate() {
            let luminance = Block::properties(*id).luminance;
            if luminance > self.block_light[cell] {
                self.block_light[cell] = luminance;
                queue.push_back(cell);
            }
        }
        flood(&self.blocks, &mut self.block_light, queue);
    }

    /// Recomputes sky light as if no neighbor chunk contributed any.
    pub fn rebuild_sky_light(&mut self) {
        let mut queue = VecDeque::new();
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                let mut level = MAX_LIGHT;
                for y in (0..CHUNK_HEIGHT).rev() {
                    let cell = index(x, y, z);
                    level = level.saturating_sub(Block::properties(self.blocks[cell]).opacity);
                    if level == 0 {
                        break;
                    }
                    if level > self.sky_light[cell] {
                        self.sky_light[cell] = level;
                        queue.push_back(cell);
                    }
                }
            }
        }
        flood(&self.blocks, &mut self.sky_light, queue);
    }

    /// Pulls block light in from `neighbor` across `edge`. `neighbor` is only read.
    pub fn stitch_block_light(&mut self, neighbor: &BlockCollection, edge: BlockCollectionEdge) {
        self.stitch(neighbor, edge, LightKind::Block);
    }

    /// Pulls sky light in from `neighbor` across `edge`. `neighbor` is only read.
    pub fn stitch_sky_light(&mut self, neighbor: &BlockCollection, edge: BlockCollectionEdge) {
        self.stitch(neighbor, edge, LightKind::Sky);
    }

    fn stitch(&mut self, neighbor: &BlockCollection, edge: BlockCollectionEdge, kind: LightKind) {
        let (light, neighbor_light) = match kind {
            LightKind::Block => (&mut self.block_light, &neighbor.block_light),
            LightKind::Sky => (&mut self.sky_light, &neighbor.sky_light),
        };

        let mut queue = VecDeque::new();
        let facing = edge.opposite();
        for along in 0..CHUNK_WIDTH {
            let (x, z) = edge.column(along);
            let (nx, nz) = facing.column(along);
            for y in 0..CHUNK_HEIGHT {
                let cell = index(x, y, z);
                let cost = Block::properties(self.blocks[cell]).light_cost();
                let candidate = neighbor_light[index(nx, y, nz)].saturating_sub(cost);
                if candidate > light[cell] {
                    light[cell] = candidate;
                    queue.push_back(cell);
                }
            }
        }
        flood(&self.blocks, light, queue);
    }
}

#[cfg(test)]
mod test {
    use super::{BlockCollection, BlockCollectionEdge, CHUNK_HEIGHT, CHUNK_WIDTH, MAX_LIGHT};
    use crate::chunk::block::Block;

    fn lit(blocks: &mut BlockCollection) {
        blocks.reset_block_light();
        blocks.reset_sky_light();
        blocks.rebuild_block_light();
        blocks.rebuild_sky_light();
    }

    #[test]
    fn torch_light_falls_off_by_one() {
        let mut blocks = BlockCollection::default();
        blocks.set_block(8, 10, 8, Block::TORCH.id);
        lit(&mut blocks);

        assert_eq!(blocks.block_light(8, 10, 8), 14);
        assert_eq!(blocks.block_light(9, 10, 8), 13);
        assert_eq!(blocks.block_light(8, 12, 8), 12);
        assert_eq!(blocks.block_light(0, 10, 0), 0);
    }

    #[test]
    fn stone_blocks_torch_light() {
        let mut blocks = BlockCollection::default();
        blocks.set_block(8, 10, 8, Block::TORCH.id);
        blocks.set_block(9, 10, 8, Block::STONE.id);
        lit(&mut blocks);

        assert_eq!(blocks.block_light(9, 10, 8), 0);
        // Reached the long way round
        assert_eq!(blocks.block_light(10, 10, 8), 10);
    }

    #[test]
    fn open_sky_is_fully_lit() {
        let mut blocks = BlockCollection::default();
        lit(&mut blocks);
        assert_eq!(blocks.sky_light(0, 0, 0), MAX_LIGHT);
        assert_eq!(blocks.sky_light(15, CHUNK_HEIGHT - 1, 15), MAX_LIGHT);
    }

    #[test]
    fn roof_casts_shadow() {
        let mut blocks = BlockCollection::default();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                blocks.set_block(x, 100, z, Block::STONE.id);
            }
        }
        lit(&mut blocks);

        assert_eq!(blocks.sky_light(3, 101, 3), MAX_LIGHT);
        assert_eq!(blocks.sky_light(3, 100, 3), 0);
        assert_eq!(blocks.sky_light(3, 50, 3), 0);
    }

    #[test]
    fn water_attenuates_sky_light() {
        let mut blocks = BlockCollection::default();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                for y in 0..CHUNK_HEIGHT {
                    blocks.set_block(x, y, z, Block::WATER.id);
                }
            }
        }
        lit(&mut blocks);
        assert_eq!(blocks.sky_light(0, CHUNK_HEIGHT - 1, 0), 12);
        assert_eq!(blocks.sky_light(0, CHUNK_HEIGHT - 2, 0), 9);
        assert_eq!(blocks.sky_light(0, CHUNK_HEIGHT - 5, 0), 0);
    }

    #[test]
    fn stitch_pulls_light_across_east_edge() {
        // The east neighbor sits at z - 1, its z = 15 face touches our z = 0 face
        let mut neighbor = BlockCollection::default();
        neighbor.set_block(4, 20, 15, Block::GLOWSTONE.id);
        neighbor.set_block(4, 20, 14, Block::STONE.id);
        lit(&mut neighbor);
        let before = neighbor.clone();

        let mut dark = BlockCollection::default();
        dark.stitch_block_light(&neighbor, BlockCollectionEdge::East);

        assert_eq!(neighbor, before);
        assert_eq!(dark.block_light(4, 20, 0), 14);
        assert_eq!(dark.block_light(4, 20, 1), 13);
        assert_eq!(dark.block_light(4, 20, 15), 0);
    }

    #[test]
    fn stitch_uses_edge_convention() {
        let mut neighbor = BlockCollection::default();
        neighbor.set_block_light(0, 5, 7, 10);

        // Neighbor at x + 1: its x = 0 face touches our x = 15 face
        let mut south = BlockCollection::default();
        south.stitch_block_light(&neighbor, BlockCollectionEdge::South);
        assert_eq!(south.block_light(15, 5, 7), 9);
        assert_eq!(south.block_light(0, 5, 7), 0);

        // Same neighbor seen across the north edge contributes nothing at x = 15
        let mut north = BlockCollection::default();
        north.stitch_block_light(&neighbor, BlockCollectionEdge::North);
        assert_eq!(north.block_light(0, 5, 7), 0);
    }

    #[test]
    fn stitch_never_lowers_light() {
        let mut neighbor = BlockCollection::default();
        neighbor.set_sky_light(3, 3, 0, 4);

        let mut blocks = BlockCollection::default();
        blocks.set_sky_light(3, 3, 15, 12);
        blocks.stitch_sky_light(&neighbor, BlockCollectionEdge::West);
        assert_eq!(blocks.sky_light(3, 3, 15), 12);
    }

    #[test]
    fn edges_are_opposite_pairs() {
        for edge in BlockCollectionEdge::ALL {
            let (dx, dz) = edge.offset();
            let (ox, oz) = edge.opposite().offset();
            assert_eq!((dx + ox, dz + oz), (0, 0));
            assert_eq!(edge.opposite().opposite(), edge);
        }
    }
}
