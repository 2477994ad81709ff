//! Result and error types for image snapshot comparison.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while resolving, comparing or archiving snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Baseline is absent and the update mode forbids creating it
    #[error("{} is missing in snapshots", path.display())]
    MissingSnapshot {
        /// Resolved baseline path
        path: PathBuf,
    },

    /// A snapshot file was read but does not exist
    #[error("Snapshot not found: {}", path.display())]
    NotFound {
        /// Resolved snapshot path
        path: PathBuf,
    },

    /// Bytes could not be decoded into an image
    #[error("Failed to decode image: {message}")]
    Decode {
        /// Error message
        message: String,
    },

    /// A pixel buffer could not be encoded
    #[error("Failed to encode image: {message}")]
    Encode {
        /// Error message
        message: String,
    },

    /// Compared images differ in size
    #[error(
        "Image dimensions differ: expected {expected_width}x{expected_height}, actual {actual_width}x{actual_height}"
    )]
    DimensionMismatch {
        /// Baseline width
        expected_width: u32,
        /// Baseline height
        expected_height: u32,
        /// Captured width
        actual_width: u32,
        /// Captured height
        actual_height: u32,
    },

    /// Pixel data does not match the declared dimensions
    #[error("Invalid pixel buffer: {message}")]
    InvalidBuffer {
        /// Error message
        message: String,
    },

    /// Comparison configuration is out of range
    #[error("Invalid comparison config: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Filesystem error on a snapshot or artifact path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Prefix a decode error with the side of the comparison it came from
    #[must_use]
    pub fn with_decode_context(self, context: &str) -> Self {
        match self {
            Self::Decode { message } => Self::Decode {
                message: format!("{context}: {message}"),
            },
            other => other,
        }
    }
}
