//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::defaults::MAX_THUMBNAIL_SIZE;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [thumbnails] section
    if let Some(section) = ini.section(Some("thumbnails")) {
        if let Some(v) = section.get("cache_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.thumbnails.cache_dir = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("size") {
            let size: u32 = v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "thumbnails".to_string(),
                key: "size".to_string(),
                value: v.to_string(),
                reason: "must be a positive integer (pixels)".to_string(),
            })?;
            if size == 0 || size > MAX_THUMBNAIL_SIZE {
                return Err(ConfigFileError::InvalidValue {
                    section: "thumbnails".to_string(),
                    key: "size".to_string(),
                    value: v.to_string(),
                    reason: format!("must be between 1 and {}", MAX_THUMBNAIL_SIZE),
                });
            }
            config.thumbnails.size = size;
        }
        if let Some(v) = section.get("grace_window_ms") {
            config.thumbnails.grace_window_ms =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "thumbnails".to_string(),
                    key: "grace_window_ms".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (milliseconds)".to_string(),
                })?;
        }
    }

    // [renderer] section
    if let Some(section) = ini.section(Some("renderer")) {
        if let Some(v) = section.get("wms_url") {
            let v = v.trim();
            if !v.is_empty() {
                if !(v.starts_with("http://") || v.starts_with("https://")) {
                    return Err(ConfigFileError::InvalidValue {
                        section: "renderer".to_string(),
                        key: "wms_url".to_string(),
                        value: v.to_string(),
                        reason: "must be an http:// or https:// URL".to_string(),
                    });
                }
                config.renderer.wms_url = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("srs") {
            let v = v.trim();
            if !v.is_empty() {
                config.renderer.srs = v.to_string();
            }
        }
        if let Some(v) = section.get("timeout") {
            let timeout: u64 = v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "renderer".to_string(),
                key: "timeout".to_string(),
                value: v.to_string(),
                reason: "must be a positive integer (seconds)".to_string(),
            })?;
            if timeout == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "renderer".to_string(),
                    key: "timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                });
            }
            config.renderer.timeout = timeout;
        }
    }

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.catalog.path = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[thumbnails]
cache_dir = /var/cache/layerthumb
size = 200
grace_window_ms = 2500

[renderer]
wms_url = http://localhost:8080/geoserver/wms
srs = EPSG:3857
timeout = 10

[catalog]
path = /srv/catalog.json

[logging]
file = /var/log/layerthumb.log
"#,
        )
        .unwrap();

        assert_eq!(
            config.thumbnails.cache_dir,
            Some(PathBuf::from("/var/cache/layerthumb"))
        );
        assert_eq!(config.thumbnails.size, 200);
        assert_eq!(config.thumbnails.grace_window_ms, 2500);
        assert_eq!(
            config.renderer.wms_url.as_deref(),
            Some("http://localhost:8080/geoserver/wms")
        );
        assert_eq!(config.renderer.srs, "EPSG:3857");
        assert_eq!(config.renderer.timeout, 10);
        assert_eq!(config.catalog.path, PathBuf::from("/srv/catalog.json"));
        assert_eq!(config.logging.file, PathBuf::from("/var/log/layerthumb.log"));
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[thumbnails]
size = 64
"#,
        )
        .unwrap();

        assert_eq!(config.thumbnails.size, 64);
        assert_eq!(config.thumbnails.grace_window_ms, DEFAULT_GRACE_WINDOW_MS);
        assert_eq!(config.renderer.timeout, DEFAULT_RENDER_TIMEOUT_SECS);
        assert!(config.thumbnails.cache_dir.is_none());
    }

    #[test]
    fn test_invalid_size() {
        let err = load("[thumbnails]\nsize = big\n").unwrap_err();
        assert!(err.to_string().contains("thumbnails.size"));

        let err = load("[thumbnails]\nsize = 0\n").unwrap_err();
        assert!(err.to_string().contains("must be between 1 and"));
    }

    #[test]
    fn test_invalid_grace_window() {
        let err = load("[thumbnails]\ngrace_window_ms = -5\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { ref key, .. } if key == "grace_window_ms"));
    }

    #[test]
    fn test_invalid_wms_url() {
        let err = load("[renderer]\nwms_url = ftp://example.com/wms\n").unwrap_err();
        assert!(err.to_string().contains("renderer.wms_url"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(load("[renderer]\ntimeout = 0\n").is_err());
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = load("[thumbnails]\ncache_dir =\n[renderer]\nsrs =\n").unwrap();
        assert!(config.thumbnails.cache_dir.is_none());
        assert_eq!(config.renderer.srs, DEFAULT_RENDER_SRS);
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
