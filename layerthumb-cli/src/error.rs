//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use layerthumb::catalog::CatalogError;
use layerthumb::config::ConfigFileError;
use layerthumb::render::RenderError;
use layerthumb::thumbnail::ThumbnailError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to create the thumbnail service
    ServiceCreation(String),
    /// Thumbnail lookup or generation failed
    Thumbnail(ThumbnailError),
    /// Failed to read an input file
    FileRead { path: String, error: std::io::Error },
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Thumbnail(e) if e.is_not_found() => {
                eprintln!();
                eprintln!("Check the workspace and name, or pass the catalog id with --id.");
                process::exit(2)
            }
            CliError::ServiceCreation(_) => {
                eprintln!();
                eprintln!("Set the WMS endpoint with:");
                eprintln!("  [renderer]");
                eprintln!("  wms_url = http://localhost:8080/geoserver/wms");
                eprintln!("in the file shown by 'layerthumb config path'.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ServiceCreation(msg) => write!(f, "Failed to create service: {}", msg),
            CliError::Thumbnail(e) => write!(f, "{}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Thumbnail(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ThumbnailError> for CliError {
    fn from(e: ThumbnailError) -> Self {
        CliError::Thumbnail(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::ServiceCreation(format!("catalog: {}", e))
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        CliError::ServiceCreation(format!("renderer: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_thumbnail_error_keeps_source() {
        let err = CliError::from(ThumbnailError::NotFound("maps/foo/one".into()));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Entity not found: maps/foo/one");
    }

    #[test]
    fn test_config_error_message() {
        let err = CliError::Config("missing wms_url".into());
        assert_eq!(err.to_string(), "Configuration error: missing wms_url");
        assert!(err.source().is_none());
    }
}
