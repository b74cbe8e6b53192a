//! DBF file writer.
//!
//! Writes the header, fixed-width records and the `0x1A` trailer in the
//! exact layout [`DbfHeader::read`] and [`RecordScanner`] expect. Numbers are
//! right-aligned and space-padded, text is left-aligned.
//!
//! # Example
//!
//! ```no_run
//! use dbfsplit::io::dbf::{DbfHeader, DbfWriter, FieldDescriptor, FieldValue};
//! use std::fs::File;
//!
//! # fn main() -> dbfsplit::Result<()> {
//! let header = DbfHeader::new(vec![
//!     FieldDescriptor::character("NAME", 20)?,
//!     FieldDescriptor::numeric("POP", 9, 0)?,
//! ])?
//! .with_record_count(1);
//!
//! let mut writer = DbfWriter::new(File::create("cities.dbf")?, header, encoding_rs::GBK)?;
//! writer.write_record(&[FieldValue::Character("Beijing".into()), FieldValue::Integer(21_893_095)])?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`RecordScanner`]: super::RecordScanner

use super::field::{FieldDescriptor, FieldType};
use super::header::DbfHeader;
use super::value::FieldValue;
use super::{ACTIVE, DELETED, END_OF_FILE};
use crate::error::{DbfError, Result};
use encoding_rs::Encoding;
use std::io::Write;
use tracing::debug;

/// Streaming DBF writer.
pub struct DbfWriter<W: Write> {
    writer: W,
    header: DbfHeader,
    encoding: &'static Encoding,
    /// Reusable record buffer
    buffer: Vec<u8>,
    records_written: u64,
}

impl<W: Write> DbfWriter<W> {
    /// Write the header and return a writer ready for records.
    ///
    /// The header's record count is written as given; it should match the
    /// number of records that follow.
    pub fn new(mut writer: W, header: DbfHeader, encoding: &'static Encoding) -> Result<Self> {
        header.write(&mut writer)?;
        let buffer = Vec::with_capacity(header.record_length() as usize);
        Ok(DbfWriter {
            writer,
            header,
            encoding,
            buffer,
            records_written: 0,
        })
    }

    /// Write a live record.
    pub fn write_record(&mut self, values: &[FieldValue]) -> Result<()> {
        self.write_with_status(ACTIVE, values)
    }

    /// Write a record flagged as deleted.
    pub fn write_deleted(&mut self, values: &[FieldValue]) -> Result<()> {
        self.write_with_status(DELETED, values)
    }

    fn write_with_status(&mut self, status: u8, values: &[FieldValue]) -> Result<()> {
        let fields = self.header.fields();
        if values.len() != fields.len() {
            return Err(DbfError::InvalidConfig(format!(
                "record has {} values but header has {} fields",
                values.len(),
                fields.len()
            )));
        }

        self.buffer.clear();
        self.buffer.push(status);
        for (field, value) in fields.iter().zip(values) {
            encode_value(field, value, self.encoding, &mut self.buffer)?;
        }
        self.writer.write_all(&self.buffer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Records written so far, deleted ones included.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Write the end-of-file marker, flush, and return the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.write_all(&[END_OF_FILE])?;
        self.writer.flush()?;
        if self.records_written != self.header.record_count() as u64 {
            debug!(
                written = self.records_written,
                declared = self.header.record_count(),
                "record count in header differs from records written"
            );
        }
        Ok(self.writer)
    }
}

/// Append exactly `field.length()` bytes for `value`.
fn encode_value(
    field: &FieldDescriptor,
    value: &FieldValue,
    encoding: &'static Encoding,
    out: &mut Vec<u8>,
) -> Result<()> {
    let width = field.length();
    let error = |message: String| DbfError::ValueEncode {
        field: field.name().to_string(),
        message,
    };

    let bytes: Vec<u8> = match (field.field_type(), value) {
        (_, FieldValue::Null) => Vec::new(),
        (FieldType::Character, FieldValue::Character(s)) => {
            let (encoded, _, had_errors) = encoding.encode(s);
            if had_errors {
                return Err(error(format!(
                    "{:?} is not representable in {}",
                    s,
                    encoding.name()
                )));
            }
            encoded.into_owned()
        }
        (FieldType::Date, FieldValue::Date(d)) => d.format("%Y%m%d").to_string().into_bytes(),
        (FieldType::Logical, FieldValue::Logical(b)) => vec![if *b { b'T' } else { b'F' }],
        (
            FieldType::Numeric | FieldType::Float,
            FieldValue::Short(_) | FieldValue::Integer(_) | FieldValue::Long(_),
        ) => right_align(value.to_string(), width),
        (FieldType::Numeric | FieldType::Float, FieldValue::Double(_) | FieldValue::Float(_)) => {
            let v = value.as_f64().unwrap_or_default();
            let text = format!("{:.*}", field.decimal_count() as usize, v);
            right_align(text, width)
        }
        (field_type, value) => {
            return Err(error(format!(
                "{:?} value doesn't fit a {:?} field",
                value, field_type
            )))
        }
    };

    if bytes.len() > width {
        return Err(error(format!(
            "{} bytes don't fit in a {}-byte field",
            bytes.len(),
            width
        )));
    }
    out.extend_from_slice(&bytes);
    out.resize(out.len() + width - bytes.len(), b' ');
    Ok(())
}

fn right_align(text: String, width: usize) -> Vec<u8> {
    format!("{:>width$}", text, width = width).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dbf::{RecordScanner, ScanOptions};
    use chrono::NaiveDate;
    use encoding_rs::WINDOWS_1252;
    use std::io::Cursor;
    use std::sync::Arc;

    fn header() -> DbfHeader {
        DbfHeader::new(vec![
            FieldDescriptor::character("NAME", 6).unwrap(),
            FieldDescriptor::numeric("QTY", 5, 0).unwrap(),
            FieldDescriptor::numeric("PRICE", 8, 2).unwrap(),
            FieldDescriptor::date("DAY").unwrap(),
            FieldDescriptor::logical("OK").unwrap(),
        ])
        .unwrap()
        .with_record_count(2)
    }

    fn row(name: &str, qty: i32) -> Vec<FieldValue> {
        vec![
            FieldValue::Character(name.to_string()),
            FieldValue::Integer(qty),
            FieldValue::Double(9.5),
            FieldValue::Date(NaiveDate::from_ymd_opt(2014, 12, 9).unwrap()),
            FieldValue::Logical(true),
        ]
    }

    #[test]
    fn test_record_layout() {
        let mut writer = DbfWriter::new(Vec::new(), header(), WINDOWS_1252).unwrap();
        writer.write_record(&row("pen", 12)).unwrap();
        let bytes = writer.finish().unwrap();

        let body = &bytes[header().header_length() as usize..];
        assert_eq!(body, b" pen      12    9.5020141209T\x1A");
    }

    #[test]
    fn test_written_file_scans_back() {
        let mut writer = DbfWriter::new(Vec::new(), header(), WINDOWS_1252).unwrap();
        writer.write_deleted(&row("gone", 1)).unwrap();
        writer.write_record(&row("pen", 12)).unwrap();
        assert_eq!(writer.records_written(), 2);
        let bytes = writer.finish().unwrap();

        let mut cursor = Cursor::new(bytes);
        let header = Arc::new(DbfHeader::read(&mut cursor).unwrap());
        let options = ScanOptions::default().with_encoding(WINDOWS_1252);
        let mut scanner = RecordScanner::new(cursor, header, &options);
        let records: Vec<_> = scanner.records().collect::<Result<_>>().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number(), 1);
        assert_eq!(records[0].values(), row("pen", 12).as_slice());
    }

    #[test]
    fn test_null_is_blank() {
        let mut writer = DbfWriter::new(Vec::new(), header(), WINDOWS_1252).unwrap();
        writer.write_record(&vec![FieldValue::Null; 5]).unwrap();
        let bytes = writer.finish().unwrap();
        let body = &bytes[header().header_length() as usize..];
        assert_eq!(&body[1..29], &[b' '; 28][..]);
    }

    #[test]
    fn test_overflow_rejected() {
        let mut writer = DbfWriter::new(Vec::new(), header(), WINDOWS_1252).unwrap();
        let err = writer.write_record(&row("pen", 123_456)).unwrap_err();
        assert!(matches!(err, DbfError::ValueEncode { ref field, .. } if field == "QTY"));
    }

    #[test]
    fn test_long_text_rejected() {
        let header = DbfHeader::new(vec![FieldDescriptor::character("CITY", 3).unwrap()]).unwrap();
        let mut writer = DbfWriter::new(Vec::new(), header, encoding_rs::GBK).unwrap();
        // Four GBK bytes; cutting at three would split the second character
        let err = writer
            .write_record(&[FieldValue::Character("北京".to_string())])
            .unwrap_err();
        assert!(matches!(err, DbfError::ValueEncode { ref field, .. } if field == "CITY"));
        assert_eq!(writer.records_written(), 0);

        writer
            .write_record(&[FieldValue::Character("北".to_string())])
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(&bytes[bytes.len() - 5..], &[ACTIVE, 0xB1, 0xB1, b' ', END_OF_FILE]);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut writer = DbfWriter::new(Vec::new(), header(), WINDOWS_1252).unwrap();
        let mut values = row("pen", 1);
        values[3] = FieldValue::Logical(false);
        assert!(writer.write_record(&values).is_err());
        assert!(writer.write_record(&values[..2]).is_err());
    }
}
