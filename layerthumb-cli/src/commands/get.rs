//! Get command - fetch a thumbnail, generating it if needed, and save it.

use std::path::PathBuf;

use layerthumb::thumbnail::Tier;

use super::common::EntityArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the get command.
pub struct GetArgs {
    pub entity: EntityArgs,
    pub hi_res: bool,
    pub output: PathBuf,
    pub verbose: bool,
}

/// Run the get command.
pub fn run(args: GetArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("get");

    let service = runner.create_service()?;
    let id = args.entity.resolve(&service)?;
    let tier = Tier::from_hi_res(args.hi_res);

    let start = std::time::Instant::now();
    let thumbnail = runner.block_on(service.get(&id, tier))?;

    println!("Thumbnail for {} ({} tier)", id, tier);
    println!("  Content-Type: {}", thumbnail.mime_type);
    println!(
        "  Last-Modified: {}",
        thumbnail.last_modified.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    println!("  Took: {:.2?}", start.elapsed());

    runner.save_image(&args.output, &thumbnail.data)?;
    service.log_stats();
    Ok(())
}
