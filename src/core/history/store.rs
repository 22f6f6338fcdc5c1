use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use directories::ProjectDirs;
use tempfile::NamedTempFile;

/// Errors raised by a durable key/value store.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io {
        /// Path of the entry that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The value does not fit into the store's remaining capacity.
    QuotaExceeded {
        /// Size of the rejected value in bytes.
        needed: usize,
        /// Capacity of the store in bytes.
        quota: usize,
    },

    /// The value could not be encoded or decoded.
    Serialize(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "Failed to access {}: {}", path.display(), source)
            }
            StoreError::QuotaExceeded { needed, quota } => {
                write!(f, "Storage quota exceeded ({needed} bytes needed, {quota} available)")
            }
            StoreError::Serialize(source) => write!(f, "Failed to encode history: {source}"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Serialize(source) => Some(source),
            StoreError::QuotaExceeded { .. } => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(source: serde_json::Error) -> Self {
        StoreError::Serialize(source)
    }
}

/// Minimal save-and-load contract for durable state.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<key>.json` inside a directory. Writes go through a
/// temporary file so a failed save never truncates the previous value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "cbioportal", "askportal").map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(value.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

/// Volatile store used for `--no-history` runs and tests. Clones share the
/// same entries. An optional quota emulates a full browser-style store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    needed: value.len(),
                    quota,
                });
            }
        }
        self.insert_raw(key, value);
        Ok(())
    }
}
