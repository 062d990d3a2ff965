static BLOCKS: [Block; 7] = [
    Block::AIR,
    Block::STONE,
    Block::DIRT,
    Block::GLASS,
    Block::WATER,
    Block::TORCH,
    Block::GLOWSTONE,
];

// Ids we don't know about are treated as dark solid blocks
static UNKNOWN: Block = Block::new(u16::MAX, "unknown", 15, 0);

/// Lighting relevant properties of a block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: u16,
    pub name: &'static str,
    /// How much light is lost when passing through this block, 15 stops light entirely.
    pub opacity: u8,
    /// The block light level this block emits.
    pub luminance: u8,
}

impl Block {
    pub const AIR: Block = Block::new(0, "air", 0, 0);
    pub const STONE: Block = Block::new(1, "stone", 15, 0);
    pub const DIRT: Block = Block::new(2, "dirt", 15, 0);
    pub const GLASS: Block = Block::new(3, "glass", 0, 0);
    pub const WATER: Block = Block::new(4, "water", 3, 0);
    pub const TORCH: Block = Block::new(5, "torch", 0, 14);
    pub const GLOWSTONE: Block = Block::new(6, "glowstone", 15, 15);

    const fn new(id: u16, name: &'static str, opacity: u8, luminance: u8) -> Self {
        Self {
            id,
            name,
            opacity,
            luminance,
        }
    }

    pub fn from_id(id: u16) -> Option<&'static Block> {
        BLOCKS.get(id as usize)
    }

    /// Like [`Block::from_id`] but never fails.
    #[inline]
    pub fn properties(id: u16) -> &'static Block {
        Self::from_id(id).unwrap_or(&UNKNOWN)
    }

    /// Light lost when entering this block; always at least one.
    #[inline]
    pub fn light_cost(&self) -> u8 {
        self.opacity.max(1)
    }
}
