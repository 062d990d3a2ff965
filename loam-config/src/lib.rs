use cache::CacheConfig;
use chunk::ChunkConfig;
use log::warn;
use logging::LoggingConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use world::WorldConfig;

use std::{fs, path::Path};
#[cfg(not(feature = "test_helper"))]
use std::{env, sync::LazyLock};

pub mod cache;
pub mod chunk;
pub mod logging;
pub mod world;

const CONFIG_ROOT_FOLDER: &str = "config/";

#[cfg(not(feature = "test_helper"))]
static STORAGE_CONFIG: LazyLock<StorageConfiguration> = LazyLock::new(|| {
    let exec_dir = env::current_dir().unwrap();
    StorageConfiguration::load(&exec_dir)
});

#[cfg(not(feature = "test_helper"))]
pub fn storage_config() -> &'static StorageConfiguration {
    &STORAGE_CONFIG
}

#[cfg(feature = "test_helper")]
use std::cell::RefCell;

// Leaked on purpose: the accessor hands out `&'static` in both builds.
#[cfg(feature = "test_helper")]
thread_local! {
    // Thread local so one test's override never leaks into another running test
    static STORAGE_CONFIG: RefCell<&'static StorageConfiguration> = RefCell::new(Box::leak(Box::new(StorageConfiguration::default())));
}

#[cfg(feature = "test_helper")]
pub fn override_config_for_testing(config: StorageConfiguration) {
    STORAGE_CONFIG.with_borrow_mut(|ref_config| {
        *ref_config = Box::leak(Box::new(config));
    });
}

#[cfg(feature = "test_helper")]
pub fn storage_config() -> &'static StorageConfiguration {
    STORAGE_CONFIG.with_borrow(|config| *config)
}

/// Everything the storage layer can be tuned with.
///
/// Missing keys fall back to their defaults, so an empty `storage.toml` is a valid
/// configuration.
#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfiguration {
    pub logging: LoggingConfig,
    pub chunk: ChunkConfig,
    pub cache: CacheConfig,
    pub world: WorldConfig,
}

trait LoadConfiguration {
    fn load(exec_dir: &Path) -> Self
    where
        Self: Sized + Default + Serialize + DeserializeOwned,
    {
        let config_dir = exec_dir.join(CONFIG_ROOT_FOLDER);
        if !config_dir.exists() {
            log::debug!("creating new config root folder");
            fs::create_dir(&config_dir).expect("Failed to create config root folder");
        }
        let path = config_dir.join(Self::get_path());

        let config = if path.exists() {
            let file_content = fs::read_to_string(&path)
                .unwrap_or_else(|_| panic!("Couldn't read configuration file at {:?}", &path));

            toml::from_str(&file_content).unwrap_or_else(|err| {
                panic!(
                    "Couldn't parse config at {:?}. Reason: {}. This is probably caused by a config update; just delete the old config and run loam again",
                    &path,
                    err.message()
                )
            })
        } else {
            let content = Self::default();

            match toml::to_string(&content) {
                Ok(serialized) => {
                    if let Err(err) = fs::write(&path, serialized) {
                        warn!(
                            "Couldn't write default config to {:?}. Reason: {}. This is probably caused by a config update; just delete the old config and run loam again",
                            &path, err
                        );
                    }
                }
                Err(err) => warn!("Couldn't serialize the default config: {}", err),
            }

            content
        };

        config.validate();
        config
    }

    fn get_path() -> &'static Path;

    fn validate(&self);
}

impl LoadConfiguration for StorageConfiguration {
    fn get_path() -> &'static Path {
        Path::new("storage.toml")
    }

    fn validate(&self) {
        self.chunk.validate();
    }
}
