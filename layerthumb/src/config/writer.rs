//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let cache_dir = config
        .thumbnails
        .cache_dir
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();
    let wms_url = config.renderer.wms_url.as_deref().unwrap_or("");

    format!(
        r#"[thumbnails]
; Directory for cached thumbnails. The LAYERTHUMB_CACHE_DIR environment
; variable takes precedence. If empty, defaults to ~/.layerthumb/cache
cache_dir = {}
; Side length of the standard thumbnail in pixels (default: 175).
; The high resolution (@2x) thumbnail is twice this size.
size = {}
; A thumbnail stays valid while the layer was modified no later than this
; many milliseconds after the thumbnail was written (default: 1000)
grace_window_ms = {}

[renderer]
; WMS GetMap endpoint used to render thumbnails
; Example: wms_url = http://localhost:8080/geoserver/wms
wms_url = {}
; SRS for bounding boxes that carry no CRS (default: EPSG:4326)
srs = {}
; Render timeout in seconds (default: 30)
timeout = {}

[catalog]
; JSON catalog of layers and layer groups
path = {}

[logging]
; Log file location
file = {}
"#,
        cache_dir,
        config.thumbnails.size,
        config.thumbnails.grace_window_ms,
        wms_url,
        config.renderer.srs,
        config.renderer.timeout,
        path_to_string(&config.catalog.path),
        path_to_string(&config.logging.file),
    )
}

/// Convert a path to string, using ~ for home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
