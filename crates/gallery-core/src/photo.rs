use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed extension for every captured photo file.
pub const PHOTO_EXTENSION: &str = "jpeg";

/// Prefix of the inline data URI attached to photos in the web environment.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

static CAPTURE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.jpeg$").unwrap());

/// One saved photo.
///
/// Only `filepath` and `displayPath` are ever serialized; `inline_data` is
/// rebuilt from storage on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Locator used to find and delete the stored bytes
    pub filepath: String,
    /// Locator the rendering layer displays
    #[serde(rename = "displayPath")]
    pub display_path: String,
    /// Self-contained data URI, web environment only
    #[serde(skip)]
    pub inline_data: Option<String>,
}

impl Photo {
    pub fn new(filepath: impl Into<String>, display_path: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            display_path: display_path.into(),
            inline_data: None,
        }
    }

    /// Name of the stored file: everything after the last `/` of `filepath`.
    pub fn file_name(&self) -> &str {
        file_name_of(&self.filepath)
    }

    /// Capture time encoded in a `<millis>.jpeg` file name.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        let caps = CAPTURE_NAME_RE.captures(self.file_name())?;
        let millis = caps.get(1)?.as_str().parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Substring after the last `/`, or the whole string when there is none.
pub fn file_name_of(locator: &str) -> &str {
    match locator.rfind('/') {
        Some(idx) => &locator[idx + 1..],
        None => locator,
    }
}

/// File name for a photo captured at `millis` since the epoch.
pub fn capture_file_name(millis: i64) -> String {
    format!("{}.{}", millis, PHOTO_EXTENSION)
}

/// Whether `name` has the `<integer-millis>.jpeg` shape of a captured photo.
pub fn is_capture_file_name(name: &str) -> bool {
    CAPTURE_NAME_RE.is_match(name)
}
