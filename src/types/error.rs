//! Error types for hashmirror

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for hashmirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be hashed (vanished, unreadable or changed mid-read)
    #[error("Hash error: {path}: {reason}")]
    Hash { path: PathBuf, reason: String },

    /// The retrying operator gave up
    #[error("Retry exhausted after {attempts} attempt(s): {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    /// Deletion or restore declined by the safety gate
    #[error("Gate denied: {0}")]
    GateDenied(String),

    /// Invalid configuration or sync pair
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Permission denied for specific path
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Disk full error
    #[error("Disk full: {available} bytes available, {needed} bytes needed")]
    DiskFull { available: u64, needed: u64 },
}

impl MirrorError {
    /// Map an IO error raised while touching `path` to the most specific variant.
    pub fn from_io(path: &Path, error: IoError) -> Self {
        if matches!(error.kind(), ErrorKind::PermissionDenied) {
            MirrorError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else if matches!(error.kind(), ErrorKind::StorageFull)
            || matches!(error.raw_os_error(), Some(28 | 122))
        {
            MirrorError::DiskFull {
                available: 0,
                needed: 1,
            }
        } else {
            MirrorError::Io(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let error: MirrorError = io_error.into();

        assert!(matches!(error, MirrorError::Io(_)));
        assert!(error.to_string().contains("IO error"));
    }

    #[test]
    fn test_io_error_from_function() {
        fn returns_io_error() -> Result<(), MirrorError> {
            let _file = std::fs::File::open("/nonexistent/path/file.txt")?;
            Ok(())
        }

        let result = returns_io_error();
        assert!(matches!(result, Err(MirrorError::Io(_))));
    }

    #[test]
    fn test_from_io_maps_permission_denied() {
        let err = MirrorError::from_io(
            Path::new("/protected/file.txt"),
            IoError::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, MirrorError::PermissionDenied { .. }));
        assert!(err.to_string().contains("/protected/file.txt"));
    }

    #[test]
    fn test_from_io_maps_storage_full() {
        let err = MirrorError::from_io(Path::new("big.bin"), IoError::from_raw_os_error(28));
        assert!(matches!(err, MirrorError::DiskFull { .. }));
    }

    #[test]
    fn test_from_io_keeps_other_kinds() {
        let err = MirrorError::from_io(
            Path::new("a.txt"),
            IoError::new(ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, MirrorError::Io(_)));
    }

    #[test]
    fn test_hash_error_display() {
        let error = MirrorError::Hash {
            path: PathBuf::from("data/file.bin"),
            reason: "file changed while hashing".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("Hash error"));
        assert!(text.contains("data/file.bin"));
        assert!(text.contains("changed while hashing"));
    }

    #[test]
    fn test_retry_exhausted_display() {
        let error = MirrorError::RetryExhausted {
            attempts: 3,
            last_error: "resource busy".to_string(),
        };
        assert!(error.to_string().contains("3 attempt(s)"));
        assert!(error.to_string().contains("resource busy"));
    }

    #[test]
    fn test_config_error_display() {
        let error = MirrorError::Config("source and destination are the same".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: source and destination are the same"
        );
    }

    #[test]
    fn test_disk_full() {
        let error = MirrorError::DiskFull {
            available: 1024,
            needed: 2048,
        };
        assert!(error.to_string().contains("1024"));
        assert!(error.to_string().contains("2048"));
    }
}
