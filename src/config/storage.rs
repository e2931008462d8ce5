//! Persistence of configuration layers as pretty-printed JSON files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::document::{ConfigLayer, ConfigLevel};
use crate::constants::config::{APP_DIR, SYSTEM_DIR, SYSTEM_FILENAME, USER_FILENAME};
use crate::error::ConfigError;

/// Result of reading one level's backing file
#[derive(Debug, Clone, PartialEq)]
pub enum StoredLayer {
    /// No file exists yet
    Missing,
    Parsed(ConfigLayer),
    /// The file exists but is not a valid document
    Corrupt { reason: String },
}

/// Blocking read/write access to per-level configuration documents
///
/// Implementations are called from a blocking worker, never from the UI context.
pub trait ConfigStorage: Send + Sync {
    /// Backing file of `level`, `None` for levels that are never persisted
    fn config_path(&self, level: ConfigLevel) -> Option<PathBuf>;

    fn load(&self, level: ConfigLevel) -> Result<StoredLayer, ConfigError>;

    fn save(&self, layer: &ConfigLayer, level: ConfigLevel) -> Result<(), ConfigError>;

    fn exists(&self, level: ConfigLevel) -> bool {
        self.config_path(level).is_some_and(|path| path.exists())
    }
}

/// Locations of the persisted levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub system: PathBuf,
    pub user: PathBuf,
}

impl ConfigPaths {
    /// Platform locations: user file under the config dir, system file next to the executable
    pub fn default_locations() -> Self {
        let user_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            system: system_dir().join(SYSTEM_FILENAME),
            user: user_dir.join(USER_FILENAME),
        }
    }

    /// Both files inside a single directory, used by tests and portable installs
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            system: dir.join(SYSTEM_FILENAME),
            user: dir.join(USER_FILENAME),
        }
    }

    /// Replace the user-scope directory, keeping the file name
    pub fn with_user_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.user = dir.as_ref().join(USER_FILENAME);
        self
    }

    /// Replace the system-scope directory, keeping the file name
    pub fn with_system_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.system = dir.as_ref().join(SYSTEM_FILENAME);
        self
    }

    pub fn for_level(&self, level: ConfigLevel) -> Option<&Path> {
        match level {
            ConfigLevel::System => Some(&self.system),
            ConfigLevel::User => Some(&self.user),
            ConfigLevel::Session => None,
        }
    }
}

fn system_dir() -> PathBuf {
    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(SYSTEM_DIR)
}

/// File-backed storage writing indented camelCase JSON
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    paths: ConfigPaths,
}

impl JsonFileStorage {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    fn path_for(&self, level: ConfigLevel) -> Result<&Path, ConfigError> {
        self.paths
            .for_level(level)
            .ok_or(ConfigError::UnsupportedLevel(level))
    }
}

impl ConfigStorage for JsonFileStorage {
    fn config_path(&self, level: ConfigLevel) -> Option<PathBuf> {
        self.paths.for_level(level).map(Path::to_path_buf)
    }

    fn load(&self, level: ConfigLevel) -> Result<StoredLayer, ConfigError> {
        let path = self.path_for(level)?;

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(level = %level, path = %path.display(), "Config file not found");
                return Ok(StoredLayer::Missing);
            }
            Err(e) => return Err(ConfigError::storage(path, e)),
        };

        match serde_json::from_str::<ConfigLayer>(&contents) {
            Ok(layer) => {
                debug!(level = %level, path = %path.display(), "Loaded config file");
                Ok(StoredLayer::Parsed(layer))
            }
            Err(e) => Ok(StoredLayer::Corrupt {
                reason: e.to_string(),
            }),
        }
    }

    fn save(&self, layer: &ConfigLayer, level: ConfigLevel) -> Result<(), ConfigError> {
        let path = self.path_for(level)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::storage(parent, e))?;
        }

        let json = serde_json::to_string_pretty(layer)?;
        fs::write(path, json).map_err(|e| ConfigError::storage(path, e))?;

        info!(level = %level, path = %path.display(), "Saved config");
        Ok(())
    }
}
