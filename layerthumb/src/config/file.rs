//! Configuration file handling for ~/.layerthumb/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use chrono::Duration;
use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub use super::defaults::*;
pub use super::settings::*;
use crate::thumbnail::ServiceConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create a directory
    #[error("Failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigFile {
    /// Load configuration from the default path (~/.layerthumb/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.layerthumb/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Thumbnail service settings.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            target_size: self.thumbnails.size,
            grace: Duration::milliseconds(
                i64::try_from(self.thumbnails.grace_window_ms).unwrap_or(i64::MAX),
            ),
        }
    }

    /// Thumbnail cache directory, created if needed.
    ///
    /// Candidates are tried in order: the `LAYERTHUMB_CACHE_DIR` environment
    /// variable, `[thumbnails] cache_dir`, then `~/.layerthumb/cache`.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigFileError> {
        let env = std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from);
        resolve_cache_dir(
            env.as_deref(),
            self.thumbnails.cache_dir.as_deref(),
            &default_cache_dir(),
        )
    }
}

/// Pick the thumbnail cache directory.
///
/// An explicit candidate must already exist as a writable directory; one that
/// does not is logged and skipped. The fallback is created if missing.
pub fn resolve_cache_dir(
    env: Option<&Path>,
    configured: Option<&Path>,
    fallback: &Path,
) -> Result<PathBuf, ConfigFileError> {
    let candidates = [(CACHE_DIR_ENV, env), ("thumbnails.cache_dir", configured)];
    for (source, candidate) in candidates {
        let Some(path) = candidate else {
            continue;
        };
        match check_writable_dir(path) {
            Ok(()) => return Ok(path.to_path_buf()),
            Err(reason) => warn!(
                source,
                path = %path.display(),
                reason,
                "Ignoring thumbnail cache directory"
            ),
        }
    }

    create_dir(fallback)?;
    Ok(fallback.to_path_buf())
}

fn check_writable_dir(path: &Path) -> Result<(), &'static str> {
    let metadata = std::fs::metadata(path).map_err(|_| "does not exist")?;
    if !metadata.is_dir() {
        return Err("is not a directory");
    }
    if metadata.permissions().readonly() {
        return Err("is not writable");
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), ConfigFileError> {
    std::fs::create_dir_all(path).map_err(|source| ConfigFileError::DirectoryError {
        path: path.to_path_buf(),
        source,
    })
}
