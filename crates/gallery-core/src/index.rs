//! Durable index: the key-value contract, two stores, and the photo list codec.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{GalleryError, Result};
use crate::photo::Photo;

/// Default key the photo list is stored under.
pub const PHOTO_STORAGE_KEY: &str = "photos";

/// Default index filename inside the data directory.
pub const INDEX_FILENAME: &str = ".gallery-index.json";

/// Key-value persistence for the photo index.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, or `None` if it was never set.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store persisted as a single JSON object file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut all = self.load_all(key).await?;
        Ok(all.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut all = self.load_all(key).await?;
        all.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(&all)?;
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| io_error(key, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error(key, e))?;
        Ok(())
    }
}

fn io_error(key: &str, source: io::Error) -> GalleryError {
    GalleryError::IndexIo {
        key: key.to_string(),
        source,
    }
}

/// In-process store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serialize the photo list for the index. Inline data is never included.
pub fn encode_photos(photos: &[Photo]) -> Result<String> {
    Ok(serde_json::to_string(photos)?)
}

/// Parse index text back into a list, preserving order.
///
/// A literal `null` reads as an empty list.
pub fn decode_photos(text: &str) -> Result<Vec<Photo>> {
    let photos: Option<Vec<Photo>> = serde_json::from_str(text)?;
    Ok(photos.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_json_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join(INDEX_FILENAME));

        assert_eq!(store.get(PHOTO_STORAGE_KEY).await.unwrap(), None);

        store.set(PHOTO_STORAGE_KEY, "[]").await.unwrap();
        store.set("other", "value").await.unwrap();

        let reopened = JsonFileStore::new(store.path());
        assert_eq!(
            reopened.get(PHOTO_STORAGE_KEY).await.unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(reopened.get("other").await.unwrap().as_deref(), Some("value"));
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_store_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(INDEX_FILENAME);
        std::fs::write(&path, "{ broken").unwrap();

        let err = JsonFileStore::new(&path).get(PHOTO_STORAGE_KEY).await.unwrap_err();
        assert!(matches!(err, GalleryError::IndexCorrupt(_)));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_photo_codec_preserves_order() {
        let mut newer = Photo::new("2.jpeg", "b");
        newer.inline_data = Some("data:image/jpeg;base64,AA".to_string());
        let photos = vec![newer, Photo::new("1.jpeg", "a")];

        let text = encode_photos(&photos).unwrap();
        assert!(!text.contains("base64"));

        let decoded = decode_photos(&text).unwrap();
        assert_eq!(decoded, vec![Photo::new("2.jpeg", "b"), Photo::new("1.jpeg", "a")]);
    }

    #[test]
    fn test_decode_null_and_corrupt() {
        assert!(decode_photos("null").unwrap().is_empty());
        assert!(matches!(
            decode_photos("{\"filepath\":1}"),
            Err(GalleryError::IndexCorrupt(_))
        ));
    }
}
