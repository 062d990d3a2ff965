use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// The world folder; region files are kept in its `region` sub folder.
    pub folder: PathBuf,
}

impl WorldConfig {
    pub fn region_folder(&self) -> PathBuf {
        self.folder.join("region")
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("world"),
        }
    }
}
