//! Status command - report the cache state of a thumbnail without generating it.

use layerthumb::thumbnail::CacheState;

use super::common::EntityArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the status command.
pub fn run(entity: EntityArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("status");

    let service = runner.create_service()?;
    let id = entity.resolve(&service)?;
    let state = runner.block_on(service.status(&id))?;

    match state {
        CacheState::Fresh { written_at } => {
            println!("{}: {} (written {})", id, state, written_at.to_rfc3339())
        }
        CacheState::Stale | CacheState::Absent => println!("{}: {}", id, state),
    }

    Ok(())
}
