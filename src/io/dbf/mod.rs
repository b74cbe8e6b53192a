//! dBase (DBF) reader and writer.
//!
//! DBF is a fixed-layout table format:
//! - **Header**: 32 bytes of file metadata (record count, header length,
//!   record length, language driver, ...)
//! - **Field table**: one 32-byte descriptor per column, terminated by `0x0D`
//! - **Records**: a status byte followed by every field's fixed-width bytes
//! - **Trailer**: a single `0x1A` byte
//!
//! # Record Framing
//!
//! Records carry no length prefix or delimiter. A record starts every
//! `record_length` bytes after the header, so any reader that starts
//! mid-file must start on such a boundary. See [`crate::split`] for planning
//! aligned byte ranges.
//!
//! # Status Byte
//!
//! - `0x20` (space): live record
//! - `0x2A` (`*`): deleted record, skipped transparently
//! - `0x1A`: end of file
//!
//! # Examples
//!
//! ```no_run
//! use dbfsplit::io::dbf::DbfReader;
//!
//! # fn main() -> dbfsplit::Result<()> {
//! let mut reader = DbfReader::from_path("cities.dbf")?;
//!
//! for field in reader.header().fields() {
//!     println!("{}", field);
//! }
//!
//! for result in reader.records() {
//!     let record = result?;
//!     println!("{:?}", record.get_by_name("NAME"));
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::io::source::{DataSource, ReadSeek};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub mod charset;
mod field;
mod header;
mod record;
mod scanner;
mod value;
mod writer;

pub use field::{FieldDescriptor, FieldType, ValueAnomaly, MAX_NAME_LEN};
pub use header::{DbfHeader, DBASE3_SIGNATURE};
pub use record::DbfRecord;
pub use scanner::{RecordScanner, Records, ScanOptions, ScanState};
pub use value::FieldValue;
pub use writer::DbfWriter;

/// Size of the fixed header block
pub const HEADER_SIZE: usize = 32;

/// Size of one field descriptor
pub const DESCRIPTOR_SIZE: usize = 32;

/// Ends the field descriptor table
pub const FIELD_TERMINATOR: u8 = 0x0D;

/// Status byte marking the end of the record stream
pub const END_OF_FILE: u8 = 0x1A;

/// Status byte of a deleted record
pub const DELETED: u8 = 0x2A;

/// Status byte of a live record
pub const ACTIVE: u8 = 0x20;

/// DBF reader with streaming API.
///
/// Decodes the header on construction, then scans every record of the file.
/// For reading one split of a file use [`RecordScanner::for_split`].
pub struct DbfReader<R> {
    scanner: RecordScanner<R>,
}

impl<R: Read> DbfReader<R> {
    /// Decode the header from `reader` and prepare to scan records.
    pub fn new(mut reader: R, options: ScanOptions) -> Result<Self> {
        let header = Arc::new(DbfHeader::read(&mut reader)?);
        Ok(DbfReader {
            scanner: RecordScanner::new(reader, header, &options),
        })
    }

    /// Get reference to the header.
    pub fn header(&self) -> &Arc<DbfHeader> {
        self.scanner.header()
    }

    /// Read the next live record, `Ok(None)` at the end.
    pub fn read_record(&mut self) -> Result<Option<DbfRecord>> {
        self.scanner.next_record()
    }

    /// Create an iterator over the live records.
    pub fn records(&mut self) -> Records<'_, R> {
        self.scanner.records()
    }

    pub fn scanner(&self) -> &RecordScanner<R> {
        &self.scanner
    }

    pub fn into_scanner(self) -> RecordScanner<R> {
        self.scanner
    }
}

impl DbfReader<Box<dyn ReadSeek + Send>> {
    /// Open a DBF file with default options.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with(path, ScanOptions::default())
    }

    /// Open a DBF file.
    pub fn from_path_with<P: AsRef<Path>>(path: P, options: ScanOptions) -> Result<Self> {
        let source = DataSource::from_path(path);
        Self::new(source.open()?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_format_constants() {
        assert_eq!(FIELD_TERMINATOR, b'\r');
        assert_eq!(DELETED, b'*');
        assert_eq!(ACTIVE, b' ');
    }

    #[test]
    fn test_reader_over_cursor() {
        let header = DbfHeader::new(vec![FieldDescriptor::logical("OK").unwrap()])
            .unwrap()
            .with_record_count(2);
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&[ACTIVE, b'T', ACTIVE, b'n', END_OF_FILE]);

        let mut reader = DbfReader::new(Cursor::new(bytes), ScanOptions::default()).unwrap();
        assert_eq!(reader.header().field_count(), 1);
        let values: Vec<bool> = reader
            .records()
            .map(|r| r.unwrap().get(0).and_then(|v| v.as_bool()).unwrap())
            .collect();
        assert_eq!(values, vec![true, false]);
        assert!(reader.read_record().unwrap().is_none());
    }
}
