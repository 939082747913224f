//! Persistent key/value storage.
//!
//! Values are plain strings, like browser local storage; structured values
//! (history, weather, coordinates) are stored as JSON text.

use anyhow::anyhow;
use directories::ProjectDirs;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs, io,
    path::PathBuf,
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    City,
    Theme,
    History,
    Weather,
    LastCoords,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::City => "city",
            StorageKey::Theme => "theme",
            StorageKey::History => "history",
            StorageKey::Weather => "weather",
            StorageKey::LastCoords => "lastCoords",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write storage file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read storage file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: StorageKey) -> Option<String>;

    fn set(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError>;
}

/// Reads `key` and decodes it as JSON. Missing or undecodable values yield
/// `None`.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: StorageKey) -> Option<T> {
    let text = store.get(key)?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(%key, error = %err, "discarding undecodable stored value");
            None
        }
    }
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &mut dyn KeyValueStore,
    key: StorageKey,
    value: &T,
) -> Result<(), StorageError> {
    let text =
        serde_json::to_string(value).map_err(|source| StorageError::Encode { key, source })?;
    store.set(key, &text)
}

/// Volatile store, used when nothing should touch the disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<&'static str, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.entries.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.as_str(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        self.entries.remove(key.as_str());
        Ok(())
    }
}

/// Store backed by a single JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file starts empty; a corrupt one
    /// is ignored and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring corrupt storage file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };

        Ok(Self { path, entries })
    }

    /// Default location in the platform data directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(dirs.data_dir().join("state.json"))
    }

    fn flush(&self) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;

        fs::write(&self.path, contents).map_err(write_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.entries.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.as_str().to_owned(), value.to_owned());
        self.flush()
    }

    fn remove(&mut self, key: StorageKey) -> Result<(), StorageError> {
        if self.entries.remove(key.as_str()).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
