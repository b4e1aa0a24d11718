use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`Platform::detect`].
pub const PLATFORM_ENV: &str = "GALLERY_PLATFORM";

/// Default prefix that device file URIs are rewritten under.
pub const DEFAULT_FILE_SRC_PREFIX: &str = "http://localhost/_app_file_";

/// Execution environment, fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Native shell with direct filesystem access.
    Hybrid,
    /// Plain browser; binary resources only reachable through locators.
    Web,
}

impl Platform {
    pub fn is_direct_filesystem(self) -> bool {
        matches!(self, Platform::Hybrid)
    }

    /// Platform named by `GALLERY_PLATFORM`, falling back to hybrid.
    pub fn detect() -> Self {
        match std::env::var(PLATFORM_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "Unknown platform, assuming hybrid");
                Platform::Hybrid
            }),
            Err(_) => Platform::Hybrid,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Hybrid => write!(f, "hybrid"),
            Platform::Web => write!(f, "web"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" | "native" => Ok(Platform::Hybrid),
            "web" | "browser" => Ok(Platform::Web),
            other => Err(format!("unknown platform '{}' (expected hybrid or web)", other)),
        }
    }
}

/// Maps a device-native locator to one the display layer can load.
pub trait LocatorRewriter: Send + Sync {
    fn convert_file_src(&self, locator: &str) -> String;
}

/// Rewrites `file://` URIs under an HTTP prefix; anything else passes through.
#[derive(Debug, Clone)]
pub struct FileSrcRewriter {
    prefix: String,
}

impl FileSrcRewriter {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for FileSrcRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_SRC_PREFIX)
    }
}

impl LocatorRewriter for FileSrcRewriter {
    fn convert_file_src(&self, locator: &str) -> String {
        match locator.strip_prefix("file://") {
            Some(path) if path.starts_with('/') => format!("{}{}", self.prefix, path),
            Some(path) => format!("{}/{}", self.prefix, path),
            None => locator.to_string(),
        }
    }
}
