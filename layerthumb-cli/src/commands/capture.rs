//! Capture command - store thumbnails derived from an image rendered elsewhere.

use std::path::PathBuf;

use super::common::{bounding_box, EntityArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the capture command.
pub struct CaptureArgs {
    pub entity: EntityArgs,
    pub image: PathBuf,
    pub extent: [f64; 4],
    pub crs: String,
    pub verbose: bool,
}

/// Run the capture command.
pub fn run(args: CaptureArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("capture");

    let image = std::fs::read(&args.image).map_err(|e| CliError::FileRead {
        path: args.image.display().to_string(),
        error: e,
    })?;

    let service = runner.create_service()?;
    let id = args.entity.resolve(&service)?;
    let bbox = bounding_box(args.extent, &args.crs);

    let pair = runner.block_on(service.capture(&id, bbox, image))?;

    println!("Captured thumbnails for {}", id);
    println!("  Key: {}", pair.record.key);
    println!("  Bounding box: {}", pair.record.bounding_box_used);
    println!(
        "  Sizes: {} bytes standard, {} bytes high",
        pair.standard.len(),
        pair.high.len()
    );

    Ok(())
}
