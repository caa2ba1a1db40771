//! layerthumb CLI - Command-line interface
//!
//! This binary provides a command-line interface to the layerthumb library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use layerthumb::render::DEFAULT_SRS;

use commands::common::{parse_extent, EntityArgs};
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "layerthumb")]
#[command(version = layerthumb::VERSION)]
#[command(about = "Cached preview thumbnails for map layers and layer groups", long_about = None)]
struct Cli {
    /// Mirror log output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a thumbnail and write it to a file
    ///
    /// Served from the cache when fresh; otherwise rendered, stored and
    /// recorded in the catalog first.
    Get {
        #[command(flatten)]
        entity: EntityArgs,

        /// Fetch the double-resolution tier
        #[arg(long)]
        hi_res: bool,

        /// Output PNG file
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Report whether the cached thumbnail is FRESH, STALE or ABSENT
    Status {
        #[command(flatten)]
        entity: EntityArgs,
    },

    /// Store thumbnails derived from an externally rendered image
    ///
    /// The extent becomes the recorded bounding box, so later regenerations
    /// render the same view.
    Capture {
        #[command(flatten)]
        entity: EntityArgs,

        /// Rendered image (PNG or JPEG)
        #[arg(long)]
        image: PathBuf,

        /// Extent shown by the image: min_x,min_y,max_x,max_y
        #[arg(long, value_parser = parse_extent, allow_hyphen_values = true)]
        extent: [f64; 4],

        /// CRS of the extent
        #[arg(long, default_value = DEFAULT_SRS)]
        crs: String,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result: Result<(), CliError> = match cli.command {
        Commands::Get {
            entity,
            hi_res,
            output,
        } => commands::get::run(commands::get::GetArgs {
            entity,
            hi_res,
            output,
            verbose,
        }),
        Commands::Status { entity } => commands::status::run(entity, verbose),
        Commands::Capture {
            entity,
            image,
            extent,
            crs,
        } => commands::capture::run(commands::capture::CaptureArgs {
            entity,
            image,
            extent,
            crs,
            verbose,
        }),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_get_by_workspace_and_name() {
        let cli = Cli::parse_from([
            "layerthumb", "get", "foo", "one", "--kind", "map", "--hi-res", "-o", "out.png",
        ]);
        match cli.command {
            Commands::Get {
                entity,
                hi_res,
                output,
            } => {
                assert_eq!(entity.workspace.as_deref(), Some("foo"));
                assert_eq!(entity.name.as_deref(), Some("one"));
                assert_eq!(entity.kind, commands::common::KindArg::Map);
                assert!(hi_res);
                assert_eq!(output, PathBuf::from("out.png"));
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_status_by_id() {
        let cli = Cli::parse_from(["layerthumb", "status", "--id", "layer-1"]);
        match cli.command {
            Commands::Status { entity } => {
                assert_eq!(entity.id.as_deref(), Some("layer-1"));
                assert!(entity.workspace.is_none());
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn test_id_conflicts_with_name() {
        let result = Cli::try_parse_from(["layerthumb", "status", "foo", "one", "--id", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_entity_is_rejected() {
        assert!(Cli::try_parse_from(["layerthumb", "status"]).is_err());
    }

    #[test]
    fn test_capture_parses_negative_extent() {
        let cli = Cli::parse_from([
            "layerthumb",
            "capture",
            "--id",
            "layer-1",
            "--image",
            "shot.png",
            "--extent",
            "-180,-90,180,90",
        ]);
        match cli.command {
            Commands::Capture { extent, crs, .. } => {
                assert_eq!(extent, [-180.0, -90.0, 180.0, 90.0]);
                assert_eq!(crs, DEFAULT_SRS);
            }
            _ => panic!("expected capture"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["layerthumb", "config", "init"]);
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Init)));
    }
}
