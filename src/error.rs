//! Error types for the tail reader library.

use thiserror::Error;

/// The main error type for tail reader operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller input (empty path, zero line count, unknown encoding name).
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// File missing at call time, or vanished between the existence check and the read.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// I/O errors when reading or seeking files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte sequence invalid for the configured encoding.
    #[error("Decode error ({encoding}): {message}")]
    Decode {
        encoding: &'static str,
        message: String,
    },

    /// No read strategy matched the file. Only reachable with a
    /// caller-supplied strategy set that does not cover the full size domain.
    #[error("No read strategy matches file: {path}")]
    Configuration { path: String },

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(path: &std::path::Path) -> Self {
        Error::NotFound {
            path: path.display().to_string(),
        }
    }
}

/// A convenient Result type for tail reader operations.
pub type Result<T> = std::result::Result<T, Error>;
