//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants, the default paths below
//! `~/.layerthumb`, and the `ConfigFile::default()` implementation.

use std::path::PathBuf;

use super::settings::*;
use crate::render::DEFAULT_SRS;
use crate::thumbnail::DEFAULT_TARGET_SIZE;

/// Environment variable overriding the thumbnail cache directory.
pub const CACHE_DIR_ENV: &str = "LAYERTHUMB_CACHE_DIR";

/// Default standard thumbnail size in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = DEFAULT_TARGET_SIZE;

/// Largest accepted standard thumbnail size in pixels.
pub const MAX_THUMBNAIL_SIZE: u32 = 2048;

/// Default grace window in milliseconds.
pub const DEFAULT_GRACE_WINDOW_MS: u64 = 1000;

/// Default render timeout in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Default SRS for bounding boxes without a CRS.
pub const DEFAULT_RENDER_SRS: &str = DEFAULT_SRS;

/// Get the path to the config directory (~/.layerthumb).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".layerthumb")
}

/// Get the path to the config file (~/.layerthumb/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default thumbnail cache directory (~/.layerthumb/cache).
pub fn default_cache_dir() -> PathBuf {
    config_directory().join("cache")
}

/// Default JSON catalog file (~/.layerthumb/catalog.json).
pub fn default_catalog_path() -> PathBuf {
    config_directory().join("catalog.json")
}

/// Default log file (~/.layerthumb/layerthumb.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("layerthumb.log")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            thumbnails: ThumbnailSettings {
                cache_dir: None,
                size: DEFAULT_THUMBNAIL_SIZE,
                grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
            },
            renderer: RendererSettings {
                wms_url: None,
                srs: DEFAULT_RENDER_SRS.to_string(),
                timeout: DEFAULT_RENDER_TIMEOUT_SECS,
            },
            catalog: CatalogSettings {
                path: default_catalog_path(),
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
