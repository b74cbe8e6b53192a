//! Parallel record counting command

use super::{DecodeArgs, SplitArgs};
use dbfsplit::parallel::count_records;
use dbfsplit::split::SplitPlanner;
use dbfsplit::Result;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Usage: dbfsplit count PATH [--records-per-split N] [--encoding LABEL] [--strict]
pub fn run(path: &Path, split_args: &SplitArgs, decode: &DecodeArgs) -> Result<()> {
    let options = decode.options()?;
    let splits = SplitPlanner::new(split_args.config()?).plan_path(path)?;

    let started = Instant::now();
    let total = count_records(&splits, &options)?;
    info!(
        splits = splits.len(),
        records = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "count complete"
    );

    println!("{}", total);
    Ok(())
}
