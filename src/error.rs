//! Centralized error types for msgshell.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the msgshell library.
///
/// Decoding anomalies inside a readable container never show up here: they
/// degrade to missing fields on the parsed message instead.
#[derive(Error, Debug)]
pub enum MsgError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MSG file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input is not a readable compound document (truncated, corrupt, or another format).
    #[error("Not a readable compound document: {0}")]
    InvalidContainer(#[source] std::io::Error),

    /// An export operation failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, MsgError>`.
pub type Result<T> = std::result::Result<T, MsgError>;

impl MsgError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MsgError`
/// when no path context is available (prefer `MsgError::io`).
impl From<std::io::Error> for MsgError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
