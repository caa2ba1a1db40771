//! Configuration for layerthumb.
//!
//! User settings live in `~/.layerthumb/config.ini`:
//!
//! ```ini
//! [thumbnails]
//! cache_dir = ~/.layerthumb/cache
//! size = 175
//! grace_window_ms = 1000
//!
//! [renderer]
//! wms_url = http://localhost:8080/geoserver/wms
//! srs = EPSG:4326
//! timeout = 30
//!
//! [catalog]
//! path = ~/.layerthumb/catalog.json
//!
//! [logging]
//! file = ~/.layerthumb/layerthumb.log
//! ```
//!
//! A missing file means defaults; present keys override them.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{
    config_directory, config_file_path, default_cache_dir, default_catalog_path,
    default_log_file, resolve_cache_dir, CatalogSettings, ConfigFile, ConfigFileError,
    LoggingSettings, RendererSettings, ThumbnailSettings, CACHE_DIR_ENV,
    DEFAULT_GRACE_WINDOW_MS, DEFAULT_RENDER_SRS, DEFAULT_RENDER_TIMEOUT_SECS,
    DEFAULT_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE,
};
