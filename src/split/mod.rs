//! Split planning for parallel DBF scans.
//!
//! Records have no framing of their own, so a reader can only start at
//! `header_length + k * record_length`. The planner cuts a file's record
//! region into byte ranges that respect that, one [`Split`] per worker:
//!
//! ```text
//! | header | chunk 0 | chunk 1 | ... | remainder (+ 0x1A) |
//!          ^ header_length                                ^ file_length
//! ```
//!
//! Full chunks of `records_per_split * record_length` bytes are taken while
//! more than `slop` chunks remain (1.1 by default), then whatever is left
//! becomes one last split. A remainder just over one chunk is therefore
//! folded into the final split instead of producing a tiny trailing one.
//!
//! # Example
//!
//! ```no_run
//! use dbfsplit::split::{SplitConfig, SplitPlanner};
//!
//! # fn main() -> dbfsplit::Result<()> {
//! let planner = SplitPlanner::new(SplitConfig::default().with_records_per_split(50_000));
//! for split in planner.plan_path("data/")? {
//!     println!("{} on {:?}", split, split.hosts());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{DbfError, Result};
use crate::io::dbf::DbfHeader;
use crate::io::source::{discover, DataSource};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub mod locality;

pub use locality::{split_hosts, BlockLocation, BlockLocator, LocalBlockLocator};

/// Records per split when nothing else is configured
pub const DEFAULT_RECORDS_PER_SPLIT: u64 = 100_000;

/// Chunks that must remain before another full chunk is cut
pub const DEFAULT_SLOP: f64 = 1.1;

/// Environment variable overriding [`SplitConfig::records_per_split`]
pub const RECORDS_PER_SPLIT_ENV: &str = "DBFSPLIT_RECORDS_PER_SPLIT";

/// Planning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    /// Target number of records in every split but the last
    pub records_per_split: u64,
    /// Remaining-to-chunk ratio above which another full chunk is cut
    pub slop: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            records_per_split: DEFAULT_RECORDS_PER_SPLIT,
            slop: DEFAULT_SLOP,
        }
    }
}

impl SplitConfig {
    /// Job-configuration key the record target was historically read from.
    pub const RECORD_COUNT_KEY: &'static str = "mapreduce.input.DBFInputFormat.split.recordcnt";

    pub fn with_records_per_split(mut self, records: u64) -> Self {
        self.records_per_split = records;
        self
    }

    pub fn with_slop(mut self, slop: f64) -> Self {
        self.slop = slop;
        self
    }

    /// Defaults, with `records_per_split` taken from
    /// `DBFSPLIT_RECORDS_PER_SPLIT` when that variable is set.
    pub fn from_env() -> Result<Self> {
        let config = SplitConfig::default();
        match env::var(RECORDS_PER_SPLIT_ENV) {
            Ok(value) => Ok(config.with_records_per_split(parse_records_per_split(&value)?)),
            Err(env::VarError::NotPresent) => Ok(config),
            Err(env::VarError::NotUnicode(_)) => Err(DbfError::InvalidConfig(format!(
                "{} is not valid unicode",
                RECORDS_PER_SPLIT_ENV
            ))),
        }
    }

    /// Check option ranges.
    ///
    /// A zero `records_per_split` is not rejected here: it surfaces from
    /// planning as a structural error, the same as a zero record length.
    pub fn validate(&self) -> Result<()> {
        if !self.slop.is_finite() || self.slop < 1.0 {
            return Err(DbfError::InvalidConfig(format!(
                "slop factor must be a finite number >= 1.0, got {}",
                self.slop
            )));
        }
        Ok(())
    }
}

fn parse_records_per_split(value: &str) -> Result<u64> {
    value.trim().parse().map_err(|e| {
        DbfError::InvalidConfig(format!(
            "{}={:?} is not a record count: {}",
            RECORDS_PER_SPLIT_ENV, value, e
        ))
    })
}

/// A record-aligned byte range of one file.
///
/// `start` is always `header_length + k * record_length`. Every split but
/// the last of a file is a whole number of records long; the last one may
/// also hold the `0x1A` trailer or a torn tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    path: PathBuf,
    start: u64,
    length: u64,
    hosts: Vec<String>,
    header: Arc<DbfHeader>,
}

impl Split {
    pub fn new(
        path: PathBuf,
        start: u64,
        length: u64,
        hosts: Vec<String>,
        header: Arc<DbfHeader>,
    ) -> Self {
        Split {
            path,
            start,
            length,
            hosts,
            header,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First byte of the split.
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// One past the last byte of the split.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Locality hints, most preferred first.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The decoded header of the split's file, shared by all its splits.
    pub fn header(&self) -> &Arc<DbfHeader> {
        &self.header
    }

    /// Physical record number of the first record in the split.
    pub fn first_record(&self) -> u64 {
        match self.header.record_length() {
            0 => 0,
            rl => self.start.saturating_sub(self.header.header_length()) / rl,
        }
    }

    /// Whole record slots in the split, deleted ones included.
    pub fn record_slots(&self) -> u64 {
        match self.header.record_length() {
            0 => 0,
            rl => self.length / rl,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.path.display(), self.start, self.length)
    }
}

/// Cut `[header_length, file_length)` into record-aligned splits.
///
/// Returns [`DbfError::Structural`] if the record length or the split byte
/// size is zero, or if the file is shorter than its header.
pub fn plan_splits(
    path: &Path,
    file_length: u64,
    header: Arc<DbfHeader>,
    config: &SplitConfig,
    blocks: &[BlockLocation],
) -> Result<Vec<Split>> {
    config.validate()?;

    let header_length = header.header_length();
    let record_length = header.record_length();
    if record_length == 0 {
        return Err(DbfError::structural(
            10,
            "record length is 0, cannot compute split boundaries",
        ));
    }
    if file_length < header_length {
        return Err(DbfError::structural(
            file_length,
            format!(
                "file is {} bytes, shorter than its {}-byte header",
                file_length, header_length
            ),
        ));
    }

    let split_size = config
        .records_per_split
        .checked_mul(record_length)
        .ok_or_else(|| {
            DbfError::InvalidConfig(format!(
                "{} records of {} bytes overflow a split size",
                config.records_per_split, record_length
            ))
        })?;
    if split_size == 0 {
        return Err(DbfError::structural(
            header_length,
            "split byte size is 0 (records per split is 0)",
        ));
    }

    let mut splits = Vec::new();
    let mut start = header_length;
    let mut remaining = file_length - header_length;

    while remaining as f64 / split_size as f64 > config.slop {
        let hosts = split_hosts(blocks, start, split_size);
        splits.push(Split::new(
            path.to_path_buf(),
            start,
            split_size,
            hosts,
            Arc::clone(&header),
        ));
        start += split_size;
        remaining -= split_size;
    }

    // Also covers an empty record region: one zero-length split at header_length.
    let hosts = split_hosts(blocks, start, remaining);
    splits.push(Split::new(
        path.to_path_buf(),
        start,
        remaining,
        hosts,
        header,
    ));

    debug!(
        path = %path.display(),
        file_length,
        header_length,
        record_length,
        split_size,
        splits = splits.len(),
        "planned splits"
    );
    Ok(splits)
}

/// Plans splits for files, reading each file's header once.
#[derive(Debug, Clone)]
pub struct SplitPlanner<L = LocalBlockLocator> {
    config: SplitConfig,
    locator: L,
}

impl SplitPlanner<LocalBlockLocator> {
    /// Planner for files on the local file system.
    pub fn new(config: SplitConfig) -> Self {
        SplitPlanner {
            config,
            locator: LocalBlockLocator,
        }
    }
}

impl Default for SplitPlanner<LocalBlockLocator> {
    fn default() -> Self {
        SplitPlanner::new(SplitConfig::default())
    }
}

impl<L: BlockLocator> SplitPlanner<L> {
    pub fn with_locator(config: SplitConfig, locator: L) -> Self {
        SplitPlanner { config, locator }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Plan one file.
    ///
    /// The header is read through a short-lived stream that is closed
    /// before planning; the record region is never read.
    pub fn plan_file(&self, source: &DataSource) -> Result<Vec<Split>> {
        let file_length = source.len()?;
        let header = Arc::new(source.read_header()?);
        let blocks = self.locator.block_locations(source.path(), file_length)?;
        plan_splits(source.path(), file_length, header, &self.config, &blocks)
    }

    /// Plan a file, or every `.dbf` file of a directory, in path order.
    pub fn plan_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Split>> {
        let mut splits = Vec::new();
        for source in discover(path)? {
            splits.extend(self.plan_file(&source)?);
        }
        Ok(splits)
    }
}
