//! Local storage errors
//!
//! Failures of the on-disk backend: the SQLite database, the session file
//! and the data directory holding them.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the local database and session files
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not create data directory '{path}': {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied for '{path}'")]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Device full or quota exhausted
    #[error("No space left while writing '{path}'")]
    NoSpace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not access '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Expected file is missing: '{path}'")]
    Missing { path: PathBuf },

    /// Session file exists but cannot be parsed
    #[error("Session file '{path}' is unreadable: {details}")]
    CorruptSession { path: PathBuf, details: String },

    /// A stored document body is not a JSON object
    #[error("Stored document '{key}' is invalid: {details}")]
    InvalidDocument { key: String, details: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// A thread panicked while holding the database lock
    #[error("Local database is unavailable after an earlier failure")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// ENOSPC and EDQUOT on Linux
const NO_SPACE_CODES: &[i32] = &[28, 122];

impl StorageError {
    /// Attach a path to an I/O failure, classified by kind
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            return StorageError::Missing { path };
        }
        if source.kind() == io::ErrorKind::PermissionDenied {
            return StorageError::Permission { path, source };
        }
        let no_space = source
            .raw_os_error()
            .is_some_and(|code| NO_SPACE_CODES.contains(&code))
            || source.to_string().to_lowercase().contains("no space left");
        if no_space {
            StorageError::NoSpace { path, source }
        } else {
            StorageError::File { path, source }
        }
    }

    /// What the user can do about this error, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::NoSpace { .. } => Some("Free up disk space and try again."),
            StorageError::Permission { .. } | StorageError::DataDir { .. } => Some(
                "Check the permissions of the data directory, or point data_dir elsewhere with `bookfolk config set data_dir <path>`.",
            ),
            StorageError::CorruptSession { .. } => {
                Some("Run `bookfolk logout` to discard the session, then sign in again.")
            }
            _ => None,
        }
    }
}

/// Result type for local storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let path = Path::new("/data/bookfolk.db");

        let err = StorageError::from_io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"), path);
        assert!(matches!(err, StorageError::Permission { .. }));
        assert!(err.recovery_suggestion().is_some());

        let err = StorageError::from_io(io::Error::new(io::ErrorKind::NotFound, "gone"), path);
        assert!(matches!(err, StorageError::Missing { .. }));

        let err = StorageError::from_io(io::Error::from_raw_os_error(28), path);
        assert!(matches!(err, StorageError::NoSpace { .. }));

        let err = StorageError::from_io(io::Error::new(io::ErrorKind::Other, "boom"), path);
        assert!(matches!(err, StorageError::File { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_corrupt_session_suggests_logout() {
        let err = StorageError::CorruptSession {
            path: PathBuf::from("/data/session.json"),
            details: "expected value".to_string(),
        };

        assert!(err.to_string().contains("session.json"));
        assert!(err.recovery_suggestion().unwrap().contains("logout"));
    }
}
