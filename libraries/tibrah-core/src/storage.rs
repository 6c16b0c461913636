//! Local key/value storage
//!
//! Mirrors browser local storage: every key holds one JSON document that is
//! read in full and rewritten in full on each mutation. There are no partial
//! updates and no indexes.

use crate::error::{Result, TibrahError};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const FILE_EXTENSION: &str = "json";

enum Backend {
    /// `<dir>/<key>.json`
    Directory(PathBuf),

    /// Process-local, used by tests and headless runs
    Memory(Mutex<BTreeMap<String, String>>),
}

/// JSON document store keyed by fixed string keys
pub struct LocalStore {
    backend: Backend,
}

impl LocalStore {
    /// Open (or create) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            TibrahError::storage(format!("cannot create {}: {}", dir.display(), e))
        })?;

        tracing::debug!(dir = %dir.display(), "Opened local store");

        Ok(Self {
            backend: Backend::Directory(dir),
        })
    }

    /// Store that lives only as long as this value
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(BTreeMap::new())),
        }
    }

    /// Read and decode the document under `key`
    ///
    /// Returns `Ok(None)` when the key has never been written.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;

        let raw = match &self.backend {
            Backend::Directory(dir) => match fs::read_to_string(key_path(dir, key)) {
                Ok(raw) => Some(raw),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            },
            Backend::Memory(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned(),
        };

        raw.map(|raw| serde_json::from_str(&raw).map_err(TibrahError::from))
            .transpose()
    }

    /// Encode `value` and replace the document under `key`
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        validate_key(key)?;
        let raw = serde_json::to_string(value)?;

        match &self.backend {
            Backend::Directory(dir) => {
                // Write-then-rename so readers never see a torn document
                let path = key_path(dir, key);
                let tmp = path.with_extension("json.tmp");
                fs::write(&tmp, raw)?;
                fs::rename(&tmp, &path)?;
            }
            Backend::Memory(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_string(), raw);
            }
        }

        Ok(())
    }

    /// Delete the document under `key`, returning whether it existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        match &self.backend {
            Backend::Directory(dir) => match fs::remove_file(key_path(dir, key)) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            },
            Backend::Memory(map) => Ok(map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key)
                .is_some()),
        }
    }

    /// All keys currently holding a document, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Directory(dir) => {
                let mut keys = Vec::new();
                for entry in fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                        keys.push(stem.to_string());
                    }
                }
                keys.sort();
                Ok(keys)
            }
            Backend::Memory(map) => Ok(map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned()
                .collect()),
        }
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::Directory(dir) => f.debug_tuple("LocalStore").field(dir).finish(),
            Backend::Memory(_) => f.write_str("LocalStore(memory)"),
        }
    }
}

fn key_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.{FILE_EXTENSION}"))
}

/// Keys become file names, so keep them to a portable character set
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(TibrahError::invalid_input(format!(
            "storage key {key:?} must be non-empty [A-Za-z0-9_-]"
        )))
    }
}
