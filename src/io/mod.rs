//! I/O module: DBF codec and file access
//!
//! Scanning streams records with a single reusable record buffer, so memory
//! stays constant regardless of file size.

pub mod dbf;
pub mod source;

pub use dbf::{DbfReader, DbfWriter};
pub use source::{discover, DataSource};
