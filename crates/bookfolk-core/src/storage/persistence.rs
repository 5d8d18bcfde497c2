//! Session file persistence
//!
//! Identity providers keep their session (user record, tokens) in a small
//! JSON file inside the data directory so a later process can pick it up.
//! Writes are atomic (write to temp file, then rename).

use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use super::error::{StorageError, StorageResult};

/// A JSON file holding one session value
pub struct SessionFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SessionFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session
    ///
    /// Returns `None` if the file doesn't exist.
    pub fn load(&self) -> StorageResult<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| StorageError::from_io(e, &self.path))?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::CorruptSession {
                path: self.path.clone(),
                details: e.to_string(),
            })
    }

    pub fn save(&self, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::CorruptSession {
            path: self.path.clone(),
            details: e.to_string(),
        })?;
        atomic_write(&self.path, &bytes)
    }

    /// Remove the session file; a missing file is not an error
    pub fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(e, &self.path)),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::DataDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, &temp_path))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, &temp_path))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, &temp_path))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::from_io(e, path))?;

    Ok(())
}
