pub mod cache;
pub mod chunk;
pub mod coordinates;
pub mod iter;
pub mod manager;
pub mod region;
pub mod relight;

pub use cache::{ChunkCache, LruChunkCache};
pub use chunk::{Chunk, ChunkKey, ChunkRef};
pub use iter::ChunkIter;
pub use manager::ChunkManager;
pub use region::{Region, RegionManager};
