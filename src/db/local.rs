// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device key-value storage used by the guest realm.
//!
//! Each key is persisted as one file under the storage directory, named by
//! the URL-encoded key. An in-memory map mirrors the files so reads never
//! touch disk after open.
//!
//! A storage handle is shared process-wide. Read-modify-write through
//! [`LocalStorage::update_json`] is serialized per key inside one process;
//! separate processes writing the same directory are not coordinated and
//! the last write wins.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::AppError;

const VALUE_SUFFIX: &str = ".value";

/// Key names used in local storage.
pub mod keys {
    /// Guest run list (JSON array).
    pub const RUNS: &str = "runs";

    /// Profile picture data URI for an owner.
    pub fn profile_picture(owner_id: &str) -> String {
        format!("profilePicture-{}", owner_id)
    }
}

/// Process-wide local key-value store.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<Inner>,
}

struct Inner {
    /// None for a purely in-memory store (tests)
    dir: Option<PathBuf>,
    cache: DashMap<String, String>,
}

impl LocalStorage {
    /// Open (creating if needed) a storage directory and load every key.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::StoreUnavailable(format!(
                "Failed to create local storage dir {}: {}",
                dir.display(),
                e
            ))
        })?;

        let cache = DashMap::new();
        let entries = fs::read_dir(&dir).map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to read local storage dir: {}", e))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
            let file_name = entry.file_name();
            let Some(encoded) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(VALUE_SUFFIX))
            else {
                continue;
            };
            let Ok(key) = urlencoding::decode(encoded) else {
                tracing::warn!(file = encoded, "Skipping undecodable local storage file");
                continue;
            };
            let value = fs::read_to_string(entry.path())
                .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
            cache.insert(key.into_owned(), value);
        }

        tracing::info!(
            dir = %dir.display(),
            keys = cache.len(),
            "Opened local storage"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                dir: Some(dir),
                cache,
            }),
        })
    }

    /// Storage that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: None,
                cache: DashMap::new(),
            }),
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.inner.cache.get(key).map(|v| v.value().clone())
    }

    /// Store `value` under `key`. The in-memory copy changes only after the
    /// file write succeeded.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        match self.inner.cache.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                self.persist(key, value)?;
                slot.insert(value.to_string());
            }
            Entry::Vacant(slot) => {
                self.persist(key, value)?;
                slot.insert(value.to_string());
            }
        }
        Ok(())
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub fn remove_item(&self, key: &str) -> Result<(), AppError> {
        match self.inner.cache.entry(key.to_string()) {
            Entry::Occupied(slot) => {
                self.unlink(key)?;
                slot.remove();
            }
            Entry::Vacant(_) => self.unlink(key)?,
        }
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        self.get_item(key)
            .map(|raw| decode_value(key, &raw))
            .transpose()
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = encode_value(key, value)?;
        self.set_item(key, &raw)
    }

    /// Read, modify and write back a JSON value under `key`.
    ///
    /// A missing key starts from `T::default()`. If `f` fails nothing is
    /// written.
    pub fn update_json<T, R, F>(&self, key: &str, f: F) -> Result<R, AppError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R, AppError>,
    {
        match self.inner.cache.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let mut value: T = decode_value(key, slot.get())?;
                let out = f(&mut value)?;
                let raw = encode_value(key, &value)?;
                self.persist(key, &raw)?;
                slot.insert(raw);
                Ok(out)
            }
            Entry::Vacant(slot) => {
                let mut value = T::default();
                let out = f(&mut value)?;
                let raw = encode_value(key, &value)?;
                self.persist(key, &raw)?;
                slot.insert(raw);
                Ok(out)
            }
        }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.inner
            .dir
            .as_ref()
            .map(|dir| dir.join(format!("{}{}", urlencoding::encode(key), VALUE_SUFFIX)))
    }

    /// Write through to disk via a uniquely named temp file and rename.
    ///
    /// Callers hold the key's cache entry, so writes to one key are ordered.
    fn persist(&self, key: &str, value: &str) -> Result<(), AppError> {
        let (Some(dir), Some(path)) = (self.inner.dir.as_ref(), self.path_for(key)) else {
            return Ok(());
        };
        let write_err = |e: std::io::Error| {
            AppError::StoreUnavailable(format!("Failed to write local key {}: {}", key, e))
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(value.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn unlink(&self, key: &str) -> Result<(), AppError> {
        let Some(path) = self.path_for(key) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StoreUnavailable(format!(
                "Failed to remove local key {}: {}",
                key, e
            ))),
        }
    }
}

fn decode_value<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::StoreUnavailable(format!("Corrupt local value for {}: {}", key, e))
    })
}

fn encode_value<T: Serialize>(key: &str, value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| {
        AppError::StoreUnavailable(format!("Failed to serialize local value for {}: {}", key, e))
    })
}
