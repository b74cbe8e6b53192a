//! # dbfsplit
//!
//! Decoder and split planner for dBase (`.dbf`) tables.
//!
//! A DBF file is a fixed-layout header, a descriptor table naming each
//! column, and a run of fixed-width records. Records carry no framing, so the
//! only safe places to start reading are `header_length + k * record_length`.
//! This crate decodes the format and cuts large files into record-aligned
//! byte ranges that independent workers can scan in parallel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbfsplit::io::dbf::ScanOptions;
//! use dbfsplit::parallel::scan_splits;
//! use dbfsplit::split::{SplitConfig, SplitPlanner};
//!
//! # fn main() -> dbfsplit::Result<()> {
//! let planner = SplitPlanner::new(SplitConfig::default());
//! let splits = planner.plan_path("parcels.dbf")?;
//!
//! let per_split = scan_splits(&splits, &ScanOptions::default(), |_, scanner| {
//!     let mut area = 0.0;
//!     for record in scanner.records() {
//!         area += record?.get_by_name("AREA").and_then(|v| v.as_f64()).unwrap_or(0.0);
//!     }
//!     Ok(area)
//! })?;
//! println!("total area: {}", per_split.iter().sum::<f64>());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`error`]: Error types and Result alias
//! - [`io::dbf`]: Header, field descriptors, record scanner and writer
//! - [`io::source`]: Opening local files (mmap above 50 MB)
//! - [`split`]: Split planning and locality hints
//! - [`parallel`]: One scanner per split on the rayon pool
//!
//! ## Logging
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod error;
pub mod io;
pub mod parallel;
pub mod split;

pub use error::{DbfError, Result};
pub use io::dbf::{DbfHeader, DbfReader, DbfRecord, FieldDescriptor, FieldValue, RecordScanner, ScanOptions};
pub use split::{Split, SplitConfig, SplitPlanner};
