use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How many live chunk handles are kept before the least recently used one is evicted.
    /// Evicted handles that still carry edits stay in the dirty set until the next save.
    pub capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(256).unwrap(),
        }
    }
}
