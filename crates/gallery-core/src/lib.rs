pub mod blob;
pub mod capture;
pub mod error;
pub mod gallery;
pub mod index;
pub mod photo;
pub mod platform;
pub mod storage;
pub mod strategy;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::{GalleryError, Result};
pub use gallery::PhotoGallery;
pub use photo::Photo;
pub use platform::Platform;

fn default_storage_key() -> String {
    index::PHOTO_STORAGE_KEY.to_string()
}

fn default_quality() -> u8 {
    capture::MAX_QUALITY
}

fn default_file_src_prefix() -> String {
    platform::DEFAULT_FILE_SRC_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryOptions {
    /// Application data directory holding photo files
    pub data_dir: PathBuf,
    /// Index file (default: <data_dir>/.gallery-index.json)
    #[serde(default)]
    pub index_file: Option<PathBuf>,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Detected from the environment when unset
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_file_src_prefix")]
    pub file_src_prefix: String,
}

impl GalleryOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            index_file: None,
            storage_key: default_storage_key(),
            platform: None,
            quality: default_quality(),
            file_src_prefix: default_file_src_prefix(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(index::INDEX_FILENAME))
    }

    pub fn effective_platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }
}

/// Build a gallery backed by the local data directory and JSON index file.
///
/// The returned gallery is empty until `load_saved` is called.
pub fn open_gallery(options: &GalleryOptions) -> PhotoGallery {
    let storage = Arc::new(storage::LocalFilesystem::new(&options.data_dir));
    let index = Arc::new(index::JsonFileStore::new(options.index_path()));
    let rewriter = Arc::new(platform::FileSrcRewriter::new(options.file_src_prefix.clone()));

    PhotoGallery::new(
        options.effective_platform(),
        storage,
        index,
        Arc::new(blob::LocalFetcher),
        rewriter,
    )
    .with_storage_key(options.storage_key.clone())
    .with_quality(options.quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_from_json() {
        let opts: GalleryOptions = serde_json::from_str(r#"{"data_dir":"/tmp/gallery"}"#).unwrap();
        assert_eq!(opts.storage_key, "photos");
        assert_eq!(opts.quality, 100);
        assert_eq!(opts.platform, None);
        assert_eq!(opts.file_src_prefix, "http://localhost/_app_file_");
        assert_eq!(
            opts.index_path(),
            PathBuf::from("/tmp/gallery").join(".gallery-index.json")
        );
    }

    #[test]
    fn test_open_gallery_uses_configured_platform() {
        let mut opts = GalleryOptions::new("/tmp/gallery");
        opts.platform = Some(Platform::Web);
        opts.quality = 150;
        let gallery = open_gallery(&opts);
        assert_eq!(gallery.platform(), Platform::Web);
        assert!(format!("{:?}", gallery).contains("quality: 100"));
    }
}
