//! File-backed state store.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a temp file in the
//! same directory (same filesystem) and are atomically renamed into place,
//! so a crash mid-write never leaves a truncated record behind. An advisory
//! lock on a `<key>.lk` sibling coordinates concurrent readers and writers
//! across processes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{StateStore, validate_key};

/// State store that keeps one JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Create a store rooted at `dir`.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the data file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn ensure_dir(&self, path: &Path) -> StorageResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            message: format!("failed to create state directory: {e}"),
        })
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);
        let _lock_guard = acquire_lock_file(&path, LockMode::Shared)?;

        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Loaded state record");
                Ok(Some(bytes))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io {
                path,
                message: format!("failed to read state file: {e}"),
            }),
        }
    }

    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        self.ensure_dir(&path)?;

        let _lock_guard = acquire_lock_file(&path, LockMode::Exclusive)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| StorageError::Io {
            path: path.clone(),
            message: format!("failed to create temp file for atomic write: {e}"),
        })?;

        tmp.write_all(value).map_err(|e| StorageError::Io {
            path: path.clone(),
            message: format!("failed to write temp state file: {e}"),
        })?;

        tmp.as_file().sync_all().map_err(|e| StorageError::Io {
            path: path.clone(),
            message: format!("failed to sync temp state file to disk: {e}"),
        })?;

        tmp.persist(&path).map_err(|e| StorageError::Io {
            path: path.clone(),
            message: format!("failed to atomically replace state file: {e}"),
        })?;

        debug!(path = %path.display(), bytes = value.len(), "Saved state record");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let path = self.path_for(key);
        let _lock_guard = acquire_lock_file(&path, LockMode::Exclusive)?;

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io {
                path,
                message: format!("failed to remove state file: {e}"),
            }),
        }
    }
}

/// Whether to acquire a shared (read) or exclusive (write) lock.
#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Acquire an advisory file lock on a `.lk` sibling of the given path.
///
/// Returns `None` in shared mode when the lock file does not exist yet:
/// nobody has ever written, so there is no writer to coordinate with.
/// Exclusive mode creates the lock file (and its directory) as needed.
fn acquire_lock_file(data_path: &Path, mode: LockMode) -> StorageResult<Option<File>> {
    let lock_path = data_path.with_extension("lk");

    match mode {
        LockMode::Shared => match OpenOptions::new().read(true).open(&lock_path) {
            Ok(lock_file) => {
                lock_file.lock_shared().map_err(|e| StorageError::Io {
                    path: data_path.to_path_buf(),
                    message: format!("failed to acquire shared file lock: {e}"),
                })?;
                Ok(Some(lock_file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io {
                path: data_path.to_path_buf(),
                message: format!("failed to open lock file: {e}"),
            }),
        },
        LockMode::Exclusive => {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                    path: data_path.to_path_buf(),
                    message: format!("failed to create lock file directory: {e}"),
                })?;
            }

            let lock_file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| StorageError::Io {
                    path: data_path.to_path_buf(),
                    message: format!("failed to open lock file: {e}"),
                })?;

            lock_file.lock_exclusive().map_err(|e| StorageError::Io {
                path: data_path.to_path_buf(),
                message: format!("failed to acquire exclusive file lock: {e}"),
            })?;

            Ok(Some(lock_file))
        },
    }
}
