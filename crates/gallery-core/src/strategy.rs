//! Per-environment storage policy, chosen once when the gallery is built.
//!
//! The hybrid strategy lets the storage medium address files directly; the
//! web strategy works only through renderable locators and keeps photos
//! displayable by inlining their bytes at load time.

use std::sync::Arc;

use async_trait::async_trait;

use crate::blob::{self, ResourceFetcher};
use crate::capture::CapturedPhoto;
use crate::error::{GalleryError, Result};
use crate::photo::{Photo, JPEG_DATA_URI_PREFIX};
use crate::platform::{LocatorRewriter, Platform};
use crate::storage::{Directory, StorageMedium, WriteFileResult};

#[async_trait]
pub trait StorageStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    /// Base64 text of the captured photo's bytes.
    async fn encode(&self, captured: &CapturedPhoto) -> Result<String>;

    /// Record for a photo just written under `file_name`.
    fn locate_for_display(
        &self,
        captured: &CapturedPhoto,
        file_name: &str,
        written: &WriteFileResult,
    ) -> Photo;

    /// Attach whatever the display layer needs to records read from the index.
    async fn hydrate(&self, photos: &mut [Photo]) -> Result<()>;
}

/// Hybrid environment: the storage medium owns the bytes and their locators.
pub struct DirectFilesystemStrategy {
    storage: Arc<dyn StorageMedium>,
    rewriter: Arc<dyn LocatorRewriter>,
}

impl DirectFilesystemStrategy {
    pub fn new(storage: Arc<dyn StorageMedium>, rewriter: Arc<dyn LocatorRewriter>) -> Self {
        Self { storage, rewriter }
    }
}

#[async_trait]
impl StorageStrategy for DirectFilesystemStrategy {
    fn platform(&self) -> Platform {
        Platform::Hybrid
    }

    async fn encode(&self, captured: &CapturedPhoto) -> Result<String> {
        let path = captured.path.as_deref().ok_or_else(|| {
            GalleryError::read(
                captured.web_path.as_str(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "captured photo has no filesystem path",
                ),
            )
        })?;
        self.storage.read_file(path, None).await
    }

    fn locate_for_display(
        &self,
        _captured: &CapturedPhoto,
        _file_name: &str,
        written: &WriteFileResult,
    ) -> Photo {
        Photo::new(
            written.uri.clone(),
            self.rewriter.convert_file_src(&written.uri),
        )
    }

    async fn hydrate(&self, _photos: &mut [Photo]) -> Result<()> {
        Ok(())
    }
}

/// Web environment: bytes are reached through locators and inlined on load.
pub struct IndirectStrategy {
    storage: Arc<dyn StorageMedium>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl IndirectStrategy {
    pub fn new(storage: Arc<dyn StorageMedium>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { storage, fetcher }
    }
}

#[async_trait]
impl StorageStrategy for IndirectStrategy {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    async fn encode(&self, captured: &CapturedPhoto) -> Result<String> {
        let fetched = self.fetcher.fetch(&captured.web_path).await?;
        let url = blob::read_as_data_url(&captured.web_path, fetched).await?;
        match blob::data_url_payload(&url) {
            Some(payload) => Ok(payload.to_string()),
            None => Err(GalleryError::BlobRead {
                locator: captured.web_path.clone(),
                reason: "conversion did not produce a base64 data URL".to_string(),
            }),
        }
    }

    fn locate_for_display(
        &self,
        captured: &CapturedPhoto,
        file_name: &str,
        _written: &WriteFileResult,
    ) -> Photo {
        // Bytes are already resident behind webPath, no need to reread the file
        Photo::new(file_name, captured.web_path.clone())
    }

    async fn hydrate(&self, photos: &mut [Photo]) -> Result<()> {
        for photo in photos.iter_mut() {
            let data = self
                .storage
                .read_file(&photo.filepath, Some(Directory::Data))
                .await?;
            photo.inline_data = Some(format!("{}{}", JPEG_DATA_URI_PREFIX, data));
        }
        Ok(())
    }
}

/// Strategy matching `platform`.
pub fn for_platform(
    platform: Platform,
    storage: Arc<dyn StorageMedium>,
    fetcher: Arc<dyn ResourceFetcher>,
    rewriter: Arc<dyn LocatorRewriter>,
) -> Box<dyn StorageStrategy> {
    if platform.is_direct_filesystem() {
        Box::new(DirectFilesystemStrategy::new(storage, rewriter))
    } else {
        Box::new(IndirectStrategy::new(storage, fetcher))
    }
}
