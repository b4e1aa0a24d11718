//! The photo persistence coordinator.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::blob::ResourceFetcher;
use crate::capture::{CaptureDevice, CaptureOptions, CapturedPhoto, MAX_QUALITY};
use crate::error::{GalleryError, Result};
use crate::index::{self, KeyValueStore, PHOTO_STORAGE_KEY};
use crate::photo::{capture_file_name, Photo};
use crate::platform::{LocatorRewriter, Platform};
use crate::storage::{Directory, StorageMedium};
use crate::strategy::{self, StorageStrategy};

/// Owns the newest-first photo list and keeps storage and index in step with it.
///
/// Every operation holds the list lock from start to finish, so callers
/// sharing a gallery are served one at a time.
pub struct PhotoGallery {
    photos: Mutex<Vec<Photo>>,
    camera: Option<Arc<dyn CaptureDevice>>,
    storage: Arc<dyn StorageMedium>,
    index: Arc<dyn KeyValueStore>,
    strategy: Box<dyn StorageStrategy>,
    storage_key: String,
    quality: u8,
}

impl std::fmt::Debug for PhotoGallery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoGallery")
            .field("platform", &self.strategy.platform())
            .field("storage_key", &self.storage_key)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl PhotoGallery {
    /// Create an empty gallery for `platform`. Call [`load_saved`](Self::load_saved)
    /// to pick up previously stored photos.
    pub fn new(
        platform: Platform,
        storage: Arc<dyn StorageMedium>,
        index: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        rewriter: Arc<dyn LocatorRewriter>,
    ) -> Self {
        let strategy = strategy::for_platform(platform, storage.clone(), fetcher, rewriter);
        Self {
            photos: Mutex::new(Vec::new()),
            camera: None,
            storage,
            index,
            strategy,
            storage_key: PHOTO_STORAGE_KEY.to_string(),
            quality: MAX_QUALITY,
        }
    }

    pub fn with_camera(mut self, camera: Arc<dyn CaptureDevice>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(MAX_QUALITY);
        self
    }

    pub fn platform(&self) -> Platform {
        self.strategy.platform()
    }

    /// Snapshot of the current list, newest first.
    pub async fn photos(&self) -> Vec<Photo> {
        self.photos.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.photos.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.photos.lock().await.is_empty()
    }

    pub async fn find(&self, filepath: &str) -> Option<Photo> {
        self.photos
            .lock()
            .await
            .iter()
            .find(|p| p.filepath == filepath)
            .cloned()
    }

    /// Take a photo, store it, and put it at the front of the gallery.
    pub async fn capture_and_store(&self) -> Result<Photo> {
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| GalleryError::Capture("no capture device configured".to_string()))?;

        let mut photos = self.photos.lock().await;
        let captured = camera.capture(&CaptureOptions::camera(self.quality)).await?;
        let photo = self.persist(&captured, &photos).await?;

        // The list only changes once the index has accepted it
        let mut next = photos.clone();
        next.insert(0, photo.clone());
        self.flush(&next).await?;
        *photos = next;

        tracing::info!(
            filepath = %photo.filepath,
            platform = %self.platform(),
            total = photos.len(),
            "Stored new photo"
        );
        Ok(photo)
    }

    /// Write the captured bytes to the data directory and build its record.
    async fn persist(&self, captured: &CapturedPhoto, existing: &[Photo]) -> Result<Photo> {
        let data = self.strategy.encode(captured).await?;
        let file_name = capture_file_name(next_capture_millis(existing));
        let written = self
            .storage
            .write_file(&file_name, &data, Directory::Data)
            .await?;
        Ok(self.strategy.locate_for_display(captured, &file_name, &written))
    }

    /// Replace the in-memory list with the one in the durable index.
    ///
    /// An index that was never written loads as an empty gallery.
    pub async fn load_saved(&self) -> Result<Vec<Photo>> {
        let mut photos = self.photos.lock().await;

        let mut loaded = match self.index.get(&self.storage_key).await? {
            Some(text) => index::decode_photos(&text)?,
            None => {
                tracing::debug!(key = %self.storage_key, "No saved photo index");
                Vec::new()
            }
        };
        self.strategy.hydrate(&mut loaded).await?;

        *photos = loaded;
        tracing::info!(count = photos.len(), platform = %self.platform(), "Loaded saved photos");
        Ok(photos.clone())
    }

    /// Delete the photo whose `filepath` matches.
    pub async fn delete_picture(&self, filepath: &str) -> Result<Photo> {
        let mut photos = self.photos.lock().await;
        let position = photos
            .iter()
            .position(|p| p.filepath == filepath)
            .ok_or_else(|| GalleryError::NotFound(filepath.to_string()))?;
        self.remove_at(&mut photos, position).await
    }

    /// Delete `photo`, which the caller saw at `position`.
    ///
    /// Fails with `StalePosition` if the list has moved on since.
    pub async fn delete_picture_at(&self, photo: &Photo, position: usize) -> Result<Photo> {
        let mut photos = self.photos.lock().await;
        match photos.get(position) {
            Some(current) if current.filepath == photo.filepath => {
                self.remove_at(&mut photos, position).await
            }
            _ => Err(GalleryError::StalePosition {
                filepath: photo.filepath.clone(),
                position,
            }),
        }
    }

    async fn remove_at(&self, photos: &mut Vec<Photo>, position: usize) -> Result<Photo> {
        let mut next = photos.clone();
        let removed = next.remove(position);
        self.flush(&next).await?;
        *photos = next;

        // The index no longer lists the photo even if the file delete below fails
        self.storage
            .delete_file(removed.file_name(), Directory::Data)
            .await?;

        tracing::info!(filepath = %removed.filepath, remaining = photos.len(), "Deleted photo");
        Ok(removed)
    }

    async fn flush(&self, photos: &[Photo]) -> Result<()> {
        let text = index::encode_photos(photos)?;
        self.index.set(&self.storage_key, &text).await
    }
}

/// Current time in milliseconds, bumped past any capture name already in use.
fn next_capture_millis(existing: &[Photo]) -> i64 {
    let mut millis = Utc::now().timestamp_millis();
    while existing
        .iter()
        .any(|p| p.file_name() == capture_file_name(millis))
    {
        millis += 1;
    }
    millis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::LocalFetcher;
    use crate::capture::FileImportCamera;
    use crate::index::{JsonFileStore, MemoryStore};
    use crate::photo::is_capture_file_name;
    use crate::platform::FileSrcRewriter;
    use crate::storage::LocalFilesystem;
    use tempfile::tempdir;

    fn gallery(platform: Platform, data: &std::path::Path, index: Arc<dyn KeyValueStore>) -> PhotoGallery {
        PhotoGallery::new(
            platform,
            Arc::new(LocalFilesystem::new(data)),
            index,
            Arc::new(LocalFetcher),
            Arc::new(FileSrcRewriter::default()),
        )
    }

    #[test]
    fn test_next_capture_millis_skips_used() {
        let now = Utc::now().timestamp_millis();
        let taken: Vec<Photo> = (0..5)
            .map(|i| Photo::new(capture_file_name(now + i), "x"))
            .collect();
        let next = next_capture_millis(&taken);
        assert!(next >= now + 5);
    }

    #[tokio::test]
    async fn test_hybrid_capture_load_delete() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("camera.jpeg");
        std::fs::write(&src, b"\xff\xd8\xff").unwrap();
        let data = dir.path().join("data");
        let index: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(data.join("index.json")));

        let g = gallery(Platform::Hybrid, &data, index.clone())
            .with_camera(Arc::new(FileImportCamera::new(&src)));
        let first = g.capture_and_store().await.unwrap();
        let second = g.capture_and_store().await.unwrap();

        assert_ne!(first.filepath, second.filepath);
        assert!(first.filepath.starts_with("file://"));
        assert!(is_capture_file_name(first.file_name()));
        assert!(first.display_path.starts_with("http://localhost/_app_file_/"));
        assert!(first.inline_data.is_none());
        assert_eq!(g.photos().await, vec![second.clone(), first.clone()]);

        // A fresh gallery sees the same list from the index
        let reloaded = gallery(Platform::Hybrid, &data, index.clone());
        let photos = reloaded.load_saved().await.unwrap();
        assert_eq!(photos, vec![second.clone(), first.clone()]);

        reloaded.delete_picture(&second.filepath).await.unwrap();
        assert_eq!(reloaded.photos().await, vec![first.clone()]);
        assert!(!data.join(second.file_name()).exists());
        assert!(data.join(first.file_name()).exists());
    }

    #[tokio::test]
    async fn test_web_load_inlines_data() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("camera.jpeg");
        std::fs::write(&src, b"abc").unwrap();
        let index: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let g = gallery(Platform::Web, dir.path(), index.clone())
            .with_camera(Arc::new(FileImportCamera::new(&src)));
        let photo = g.capture_and_store().await.unwrap();
        assert!(is_capture_file_name(&photo.filepath));
        assert!(photo.display_path.starts_with("file://"));

        let stored = index.get(PHOTO_STORAGE_KEY).await.unwrap().unwrap();
        assert!(!stored.contains("base64"));

        let loaded = gallery(Platform::Web, dir.path(), index).load_saved().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].inline_data.as_deref(),
            Some("data:image/jpeg;base64,YWJj")
        );
    }

    #[tokio::test]
    async fn test_capture_cancelled_adds_nothing() {
        let dir = tempdir().unwrap();
        let index: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let g = gallery(Platform::Hybrid, dir.path(), index.clone())
            .with_camera(Arc::new(FileImportCamera::new(dir.path().join("none.jpeg"))));

        let err = g.capture_and_store().await.unwrap_err();
        assert!(matches!(err, GalleryError::CaptureCancelled));
        assert!(g.is_empty().await);
        assert_eq!(index.get(PHOTO_STORAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_capture_without_camera() {
        let dir = tempdir().unwrap();
        let g = gallery(Platform::Hybrid, dir.path(), Arc::new(MemoryStore::new()));
        assert!(matches!(
            g.capture_and_store().await,
            Err(GalleryError::Capture(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_and_stale() {
        let dir = tempdir().unwrap();
        let index: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        index
            .set(
                PHOTO_STORAGE_KEY,
                r#"[{"filepath":"2.jpeg","displayPath":"b"},{"filepath":"1.jpeg","displayPath":"a"}]"#,
            )
            .await
            .unwrap();
        let g = gallery(Platform::Hybrid, dir.path(), index);
        g.load_saved().await.unwrap();

        assert!(matches!(
            g.delete_picture("9.jpeg").await,
            Err(GalleryError::NotFound(_))
        ));
        assert!(matches!(
            g.delete_picture_at(&Photo::new("1.jpeg", "a"), 0).await,
            Err(GalleryError::StalePosition { position: 0, .. })
        ));
        assert_eq!(g.len().await, 2);
        assert_eq!(g.find("1.jpeg").await, Some(Photo::new("1.jpeg", "a")));
    }
}
