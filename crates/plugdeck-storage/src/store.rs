//! State store trait and the in-memory implementation.
//!
//! A [`StateStore`] holds whole records under flat string keys. There is no
//! field-level patching: every `save` replaces the previous value for the
//! key entirely, so a reader sees either the old record or the new one.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};

/// Maximum key length in bytes.
const MAX_KEY_LEN: usize = 128;

/// Validate that a key is safe for storage.
///
/// Keys double as file names in [`FileStateStore`](crate::FileStateStore),
/// so they are restricted to ASCII alphanumerics, `-` and `_`.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key exceeds {MAX_KEY_LEN} bytes"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidKey(format!(
            "key must contain only ASCII alphanumerics, '-' and '_', got: {key}"
        )));
    }
    Ok(())
}

/// Keyed whole-record store.
///
/// `load` returns `Ok(None)` when nothing has been stored under the key.
/// An `Err` means the backend itself could not be reached or read.
pub trait StateStore: Send + Sync {
    /// Load the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend cannot be read.
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend cannot be written.
    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Remove the value stored under `key`.
    ///
    /// Returns `true` if a value existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend cannot be written.
    fn remove(&self, key: &str) -> StorageResult<bool>;
}

/// Typed JSON helpers available on every [`StateStore`].
pub trait StateStoreExt: StateStore {
    /// Deserialize a JSON value stored under `key`.
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored bytes are not
    /// valid JSON for `T`, or any error from [`StateStore::load`].
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.load(key)?
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Serialize `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails, or any
    /// error from [`StateStore::save`].
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.save(key, &bytes)
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

/// In-memory state store for tests and ephemeral data.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStateStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.remove(key).is_some())
    }
}
