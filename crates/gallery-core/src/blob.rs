//! Blob fetching and blob-to-text conversion for the web environment.

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::oneshot;

use crate::error::{GalleryError, Result};

/// Bytes fetched from a renderable locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }
}

/// Resolves a renderable locator (`webPath`) to its bytes.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Blob>;
}

/// Fetcher for `file://` URIs and plain local paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

#[async_trait]
impl ResourceFetcher for LocalFetcher {
    async fn fetch(&self, locator: &str) -> Result<Blob> {
        let path = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GalleryError::read(locator, e))?;
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Blob::new(bytes, mime))
    }
}

/// Convert a blob to a `data:` URL.
///
/// The encoding runs off the async runtime and hands back exactly one
/// outcome; a conversion that ends without answering is a read fault.
pub async fn read_as_data_url(locator: &str, blob: Blob) -> Result<String> {
    let (tx, rx) = oneshot::channel::<std::result::Result<String, String>>();

    tokio::task::spawn_blocking(move || {
        let outcome = if blob.mime.is_empty() {
            Err("blob has no content type".to_string())
        } else {
            Ok(format!("data:{};base64,{}", blob.mime, BASE64.encode(&blob.bytes)))
        };
        let _ = tx.send(outcome);
    });

    match rx.await {
        Ok(Ok(url)) => Ok(url),
        Ok(Err(reason)) => Err(blob_error(locator, reason)),
        Err(_) => Err(blob_error(locator, "conversion ended without a result")),
    }
}

/// Base64 payload of a `data:<mime>;base64,<payload>` URL.
pub fn data_url_payload(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("data:")?;
    rest.split_once(";base64,").map(|(_, payload)| payload)
}

fn blob_error(locator: &str, reason: impl Into<String>) -> GalleryError {
    GalleryError::BlobRead {
        locator: locator.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_as_data_url() {
        let url = read_as_data_url("blob:1", Blob::new(b"abc".to_vec(), "image/jpeg"))
            .await
            .unwrap();
        assert_eq!(url, "data:image/jpeg;base64,YWJj");
        assert_eq!(data_url_payload(&url), Some("YWJj"));
    }

    #[tokio::test]
    async fn test_read_as_data_url_rejects() {
        let err = read_as_data_url("blob:2", Blob::new(vec![1], ""))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::BlobRead { ref locator, .. } if locator == "blob:2"));
    }

    #[test]
    fn test_data_url_payload() {
        assert_eq!(data_url_payload("data:image/png;base64,AAAA"), Some("AAAA"));
        assert_eq!(data_url_payload("data:text/plain,hello"), None);
        assert_eq!(data_url_payload("blob:123"), None);
    }

    #[tokio::test]
    async fn test_local_fetcher() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.jpeg");
        std::fs::write(&path, b"jpg").unwrap();

        let uri = format!("file://{}", path.to_string_lossy());
        let blob = LocalFetcher.fetch(&uri).await.unwrap();
        assert_eq!(blob.bytes, b"jpg");
        assert_eq!(blob.mime, "image/jpeg");

        let err = LocalFetcher
            .fetch(&dir.path().join("gone.jpeg").to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::StorageRead { .. }));
    }
}
