//! In-process parallel scanning of planned splits.
//!
//! One [`RecordScanner`] per split, each on its own stream, run on the rayon
//! pool. The only thing scanners of one file share is the immutable
//! `Arc<DbfHeader>` carried by their splits.
//!
//! # Example
//!
//! ```no_run
//! use dbfsplit::io::dbf::ScanOptions;
//! use dbfsplit::parallel::count_records;
//! use dbfsplit::split::SplitPlanner;
//!
//! # fn main() -> dbfsplit::Result<()> {
//! let splits = SplitPlanner::default().plan_path("big.dbf")?;
//! let total = count_records(&splits, &ScanOptions::default())?;
//! println!("{} live records", total);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::io::dbf::{RecordScanner, ScanOptions};
use crate::io::source::{DataSource, ReadSeek};
use crate::split::Split;
use rayon::prelude::*;
use tracing::debug;

/// Scanner over one split, reading from a stream of its own.
pub type SplitScanner = RecordScanner<Box<dyn ReadSeek + Send>>;

/// Open the split's file and position a scanner at the split start.
pub fn open_split(split: &Split, options: &ScanOptions) -> Result<SplitScanner> {
    let reader = DataSource::from_path(split.path()).open()?;
    RecordScanner::for_split(reader, split, options)
}

/// Run `f` over a scanner for every split in parallel.
///
/// Results are returned in split order. The first error stops the fan-out
/// and is returned; each stream is closed when its scanner is dropped, on
/// error paths too.
pub fn scan_splits<T, F>(splits: &[Split], options: &ScanOptions, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Split, &mut SplitScanner) -> Result<T> + Sync,
{
    splits
        .par_iter()
        .map(|split| {
            let mut scanner = open_split(split, options)?;
            let result = f(split, &mut scanner)?;
            debug!(
                split = %split,
                records = scanner.records_emitted(),
                deleted = scanner.deleted_skipped(),
                anomalies = scanner.anomaly_count(),
                "split scanned"
            );
            Ok(result)
        })
        .collect()
}

/// Count live records across all splits.
pub fn count_records(splits: &[Split], options: &ScanOptions) -> Result<u64> {
    let counts = scan_splits(splits, options, |_, scanner| {
        let mut count = 0u64;
        while scanner.next_record()?.is_some() {
            count += 1;
        }
        Ok(count)
    })?;
    Ok(counts.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dbf::{DbfHeader, DbfWriter, FieldDescriptor, FieldValue};
    use crate::split::{SplitConfig, SplitPlanner};
    use std::fs::File;
    use tempfile::tempdir;

    fn write_file(path: &std::path::Path, live: u32) {
        let header = DbfHeader::new(vec![FieldDescriptor::numeric("ID", 6, 0).unwrap()])
            .unwrap()
            .with_record_count(live + (live + 2) / 3);
        let mut writer =
            DbfWriter::new(File::create(path).unwrap(), header, encoding_rs::GBK).unwrap();
        for id in 0..live as i32 {
            if id % 3 == 0 {
                writer.write_deleted(&[FieldValue::Integer(-1)]).unwrap();
            }
            writer.write_record(&[FieldValue::Integer(id)]).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_count_matches_sequential_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.dbf");
        write_file(&path, 1000);

        let planner = SplitPlanner::new(SplitConfig::default().with_records_per_split(97));
        let splits = planner.plan_path(&path).unwrap();
        assert!(splits.len() > 5);
        assert_eq!(count_records(&splits, &ScanOptions::default()).unwrap(), 1000);
    }

    #[test]
    fn test_results_in_split_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.dbf");
        write_file(&path, 300);

        let planner = SplitPlanner::new(SplitConfig::default().with_records_per_split(50));
        let splits = planner.plan_path(&path).unwrap();
        let firsts = scan_splits(&splits, &ScanOptions::default(), |_, scanner| {
            Ok(scanner
                .next_record()?
                .and_then(|r| r.get(0).and_then(|v| v.as_i64())))
        })
        .unwrap();

        let firsts: Vec<i64> = firsts.into_iter().flatten().collect();
        let mut sorted = firsts.clone();
        sorted.sort_unstable();
        assert_eq!(firsts, sorted);
        assert_eq!(firsts[0], 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.dbf");
        write_file(&path, 10);
        let splits = SplitPlanner::default().plan_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(count_records(&splits, &ScanOptions::default()).is_err());
    }
}
