//! Capture device contract and a file-import implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{GalleryError, Result};

/// Maximum capture quality.
pub const MAX_QUALITY: u8 = 100;

/// Form in which the device hands back the captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// An addressable resource (path + renderable locator), not raw bytes.
    Uri,
    /// Raw bytes encoded as base64.
    Base64,
}

/// Where the photo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSource {
    Camera,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub result_type: ResultType,
    pub source: CameraSource,
    /// 0-100
    pub quality: u8,
}

impl CaptureOptions {
    /// Options used by the gallery: resource locator, camera, given quality.
    pub fn camera(quality: u8) -> Self {
        Self {
            result_type: ResultType::Uri,
            source: CameraSource::Camera,
            quality: quality.min(MAX_QUALITY),
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::camera(MAX_QUALITY)
    }
}

/// A photo as handed back by the capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    /// Filesystem path, only meaningful in the hybrid environment.
    pub path: Option<String>,
    /// Locator the rendering layer can display in either environment.
    pub web_path: String,
}

/// A device that can take a photo.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Take a photo. Fails with `CaptureCancelled` when no photo is returned.
    async fn capture(&self, options: &CaptureOptions) -> Result<CapturedPhoto>;
}

/// Capture device that "takes" a photo by importing an existing image file.
#[derive(Debug, Clone)]
pub struct FileImportCamera {
    source: PathBuf,
}

impl FileImportCamera {
    pub fn new(source: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CaptureDevice for FileImportCamera {
    async fn capture(&self, options: &CaptureOptions) -> Result<CapturedPhoto> {
        if options.result_type != ResultType::Uri {
            return Err(GalleryError::Capture(
                "file import only supports resource locators".to_string(),
            ));
        }

        let exists = tokio::fs::try_exists(&self.source)
            .await
            .map_err(|e| GalleryError::Capture(e.to_string()))?;
        if !exists {
            tracing::debug!(source = %self.source.display(), "Import source missing, treating as cancel");
            return Err(GalleryError::CaptureCancelled);
        }

        let absolute = tokio::fs::canonicalize(&self.source)
            .await
            .map_err(|e| GalleryError::Capture(e.to_string()))?;
        let path = absolute.to_string_lossy().replace('\\', "/");

        tracing::debug!(path = %path, quality = options.quality, "Imported photo");
        Ok(CapturedPhoto {
            web_path: file_uri(&path),
            path: Some(path),
        })
    }
}

/// `file://` URI for an absolute, forward-slash path.
pub(crate) fn file_uri(path: &str) -> String {
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
