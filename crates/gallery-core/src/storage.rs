//! Byte-level storage medium: the contract and a directory-backed implementation.
//!
//! Data crosses this boundary as base64 text in both directions, so the
//! coordinator never handles raw bytes.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::capture::file_uri;
use crate::error::{GalleryError, Result};

/// Well-known directories of the storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    /// Private application data.
    Data,
}

/// Result of a file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFileResult {
    /// The medium's own locator for the written file.
    pub uri: String,
}

/// Filesystem abstraction used to persist photo bytes.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Write base64 `data` to `path` inside `directory`.
    async fn write_file(&self, path: &str, data: &str, directory: Directory)
        -> Result<WriteFileResult>;

    /// Read a file as base64 text.
    ///
    /// With no directory, `path` is an absolute path or `file://` URI.
    async fn read_file(&self, path: &str, directory: Option<Directory>) -> Result<String>;

    /// Delete `path` inside `directory`. A missing file is an error.
    async fn delete_file(&self, path: &str, directory: Directory) -> Result<()>;
}

/// Storage medium rooted at a local data directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    data_dir: PathBuf,
}

impl LocalFilesystem {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, path: &str, directory: Option<Directory>) -> io::Result<PathBuf> {
        match directory {
            Some(Directory::Data) => {
                let relative = Path::new(path);
                let escapes = relative.components().any(|c| {
                    !matches!(c, Component::Normal(_) | Component::CurDir)
                });
                if path.is_empty() || escapes {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "path must stay inside the data directory",
                    ));
                }
                Ok(self.data_dir.join(relative))
            }
            None => Ok(PathBuf::from(path.strip_prefix("file://").unwrap_or(path))),
        }
    }
}

#[async_trait]
impl StorageMedium for LocalFilesystem {
    async fn write_file(
        &self,
        path: &str,
        data: &str,
        directory: Directory,
    ) -> Result<WriteFileResult> {
        let dest = self
            .resolve(path, Some(directory))
            .map_err(|e| GalleryError::write(path, e))?;
        let bytes = BASE64
            .decode(data)
            .map_err(|e| GalleryError::write(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| GalleryError::write(path, e))?;

        // Write to temp file first, then rename so a crash never leaves a partial photo
        let temp = self.data_dir.join(format!(".{}.tmp", path));
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| GalleryError::write(path, e))?;
        tokio::fs::rename(&temp, &dest)
            .await
            .map_err(|e| GalleryError::write(path, e))?;

        let absolute = tokio::fs::canonicalize(&dest)
            .await
            .map_err(|e| GalleryError::write(path, e))?;
        let uri = file_uri(&absolute.to_string_lossy().replace('\\', "/"));

        tracing::debug!(path = %path, size = bytes.len(), uri = %uri, "Wrote photo file");
        Ok(WriteFileResult { uri })
    }

    async fn read_file(&self, path: &str, directory: Option<Directory>) -> Result<String> {
        let src = self
            .resolve(path, directory)
            .map_err(|e| GalleryError::read(path, e))?;
        let bytes = tokio::fs::read(&src)
            .await
            .map_err(|e| GalleryError::read(path, e))?;
        tracing::debug!(path = %path, size = bytes.len(), "Read photo file");
        Ok(BASE64.encode(bytes))
    }

    async fn delete_file(&self, path: &str, directory: Directory) -> Result<()> {
        let target = self
            .resolve(path, Some(directory))
            .map_err(|e| GalleryError::delete(path, e))?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| GalleryError::delete(path, e))?;
        tracing::debug!(path = %path, "Deleted photo file");
        Ok(())
    }
}
