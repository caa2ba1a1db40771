//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, service creation,
//! and file output so command handlers stay small.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use layerthumb::catalog::JsonCatalog;
use layerthumb::config::ConfigFile;
use layerthumb::logging::{init_logging, LoggingGuard};
use layerthumb::render::WmsRenderer;
use layerthumb::thumbnail::{DiskThumbnailStore, ThumbnailService};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    runtime: Runtime,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `verbose` - When true, log lines are mirrored to stderr
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_logging(&config.logging.file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Runtime::new()
            .map_err(|e| CliError::ServiceCreation(format!("tokio runtime: {}", e)))?;

        Ok(Self {
            logging_guard,
            config,
            runtime,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("layerthumb v{}", layerthumb::VERSION);
        info!("layerthumb CLI: {} command", command);
    }

    /// Build the thumbnail service from the loaded configuration.
    pub fn create_service(&self) -> Result<ThumbnailService, CliError> {
        let config = &self.config;

        let wms_url = config.renderer.wms_url.as_deref().ok_or_else(|| {
            CliError::ServiceCreation("renderer.wms_url is not set".to_string())
        })?;

        let catalog = JsonCatalog::open(&config.catalog.path)?;
        let renderer = WmsRenderer::new(wms_url, Duration::from_secs(config.renderer.timeout))?
            .with_default_srs(config.renderer.srs.clone());
        let cache_dir = config.cache_dir()?;
        let store = DiskThumbnailStore::new(&cache_dir)?;

        info!(
            catalog = %config.catalog.path.display(),
            cache_dir = %cache_dir.display(),
            wms_url,
            "Thumbnail service created"
        );

        Ok(ThumbnailService::new(
            Arc::new(catalog),
            Arc::new(renderer),
            Arc::new(store),
            config.service_config(),
        ))
    }

    /// Drive a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Write image bytes to a file.
    pub fn save_image(&self, path: &Path, data: &[u8]) -> Result<(), CliError> {
        std::fs::write(path, data).map_err(|e| CliError::FileWrite {
            path: path.display().to_string(),
            error: e,
        })?;

        info!(path = %path.display(), bytes = data.len(), "Thumbnail saved");
        println!("Saved {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}
