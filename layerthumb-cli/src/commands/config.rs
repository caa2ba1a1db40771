//! Configuration management CLI commands.
//!
//! Provides `config path` and `config init`.

use clap::Subcommand;
use layerthumb::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Write a default configuration file if none exists
    ///
    /// An existing file is left untouched.
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init => run_init(),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());

    if !path.exists() {
        println!();
        println!("(file does not exist yet, defaults are in use)");
        println!("Run 'layerthumb config init' to create it.");
    }

    Ok(())
}

/// Create the configuration file with default values.
fn run_init() -> Result<(), CliError> {
    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;

    if existed {
        println!("Configuration already exists: {}", path.display());
    } else {
        println!("Created {}", path.display());
        println!();
        println!("Set [renderer] wms_url before generating thumbnails.");
    }

    Ok(())
}
