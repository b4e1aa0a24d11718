//! Error types for the gallery.

use thiserror::Error;

/// Errors surfaced by the gallery coordinator and its collaborators.
#[derive(Error, Debug)]
pub enum GalleryError {
    /// The capture device returned no photo (e.g. the user backed out).
    #[error("Photo capture was cancelled")]
    CaptureCancelled,

    /// The capture device failed for a reason other than cancellation.
    #[error("Photo capture failed: {0}")]
    Capture(String),

    /// Writing photo bytes to the storage medium failed.
    #[error("Failed to write {path}: {source}")]
    StorageWrite {
        path: String,
        source: std::io::Error,
    },

    /// Reading photo bytes from the storage medium failed.
    #[error("Failed to read {path}: {source}")]
    StorageRead {
        path: String,
        source: std::io::Error,
    },

    /// Deleting a photo file failed, usually because it is already gone.
    #[error("Failed to delete {path}: {source}")]
    StorageDelete {
        path: String,
        source: std::io::Error,
    },

    /// The persisted index could not be parsed.
    #[error("Photo index is corrupt: {0}")]
    IndexCorrupt(#[from] serde_json::Error),

    /// The durable index backend failed to load or store a value.
    #[error("Photo index I/O failed for key {key}: {source}")]
    IndexIo {
        key: String,
        source: std::io::Error,
    },

    /// Converting a fetched blob to text failed.
    #[error("Failed to read blob {locator}: {reason}")]
    BlobRead { locator: String, reason: String },

    /// Positional delete was given a record that no longer sits at that position.
    #[error("Photo {filepath} is not at position {position}")]
    StalePosition { filepath: String, position: usize },

    /// No record in the gallery has this filepath.
    #[error("No photo with filepath {0}")]
    NotFound(String),
}

impl GalleryError {
    /// Build a `StorageWrite` error for `path`.
    pub fn write(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    /// Build a `StorageRead` error for `path`.
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }

    /// Build a `StorageDelete` error for `path`.
    pub fn delete(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageDelete {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
