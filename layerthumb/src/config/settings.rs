//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Thumbnail cache settings
    pub thumbnails: ThumbnailSettings,
    /// WMS renderer settings
    pub renderer: RendererSettings,
    /// Catalog settings
    pub catalog: CatalogSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Thumbnail cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSettings {
    /// Cache directory. `None` means the default location.
    pub cache_dir: Option<PathBuf>,
    /// Side length of the standard thumbnail in pixels.
    pub size: u32,
    /// Grace window between an entity edit and the thumbnail write.
    pub grace_window_ms: u64,
}

/// WMS renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// GetMap endpoint, e.g. `http://localhost:8080/geoserver/wms`.
    pub wms_url: Option<String>,
    /// SRS used for bounding boxes without a CRS.
    pub srs: String,
    /// Timeout in seconds for a single render.
    pub timeout: u64,
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    /// JSON catalog file.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path.
    pub file: PathBuf,
}
