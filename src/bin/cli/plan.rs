//! Split planning command

use super::SplitArgs;
use dbfsplit::split::SplitPlanner;
use dbfsplit::Result;
use std::path::Path;
use tracing::info;

/// Print `path:start+length`, the first record number and the host hints
/// of every split, tab-separated.
///
/// Usage: dbfsplit plan PATH [--records-per-split N] [--slop F]
pub fn run(path: &Path, args: &SplitArgs) -> Result<()> {
    let config = args.config()?;
    let splits = SplitPlanner::new(config).plan_path(path)?;

    for split in &splits {
        println!("{}\t{}\t{}", split, split.first_record(), split.hosts().join(","));
    }
    info!(
        splits = splits.len(),
        records_per_split = config.records_per_split,
        "planning complete"
    );
    Ok(())
}
