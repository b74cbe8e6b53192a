//! DBF header decoding and encoding.
//!
//! The header is a fixed 32-byte block followed by one 32-byte descriptor per
//! field and a single `0x0D` terminator byte. All multi-byte integers are
//! little-endian.

use super::field::FieldDescriptor;
use super::{DESCRIPTOR_SIZE, FIELD_TERMINATOR, HEADER_SIZE};
use crate::error::{DbfError, Result};
use chrono::{Datelike, NaiveDate};
use std::io::{self, Read, Write};

/// Signature byte for a plain dBase III file without memo.
pub const DBASE3_SIGNATURE: u8 = 0x03;

/// Decoded file header plus its field table.
///
/// Immutable once decoded. Scanners share it through `Arc<DbfHeader>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfHeader {
    signature: u8,
    year: u8,
    month: u8,
    day: u8,
    record_count: u32,
    header_length: u16,
    record_length: u16,
    reserved1: [u8; 2],
    incomplete_transaction: u8,
    encryption_flag: u8,
    free_record_thread: u32,
    reserved2: [u8; 4],
    reserved3: [u8; 4],
    mdx_flag: u8,
    language_driver: u8,
    reserved4: [u8; 2],
    fields: Vec<FieldDescriptor>,
    /// Bytes between the terminator and the declared header length
    padding: Vec<u8>,
}

/// Fill `buf` or fail with a structural error naming `what`.
fn read_exact_at<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64, what: &str) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(DbfError::structural(
            offset,
            format!("stream ended inside {}", what),
        )),
        Err(e) => Err(DbfError::Io(e)),
    }
}

impl DbfHeader {
    /// Build a header for a new file.
    ///
    /// Header and record lengths are derived from the field list.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let header_length = HEADER_SIZE + DESCRIPTOR_SIZE * fields.len() + 1;
        let record_length = 1 + fields.iter().map(|f| f.length()).sum::<usize>();

        let header_length = u16::try_from(header_length).map_err(|_| {
            DbfError::InvalidConfig(format!("{} fields exceed the header size limit", fields.len()))
        })?;
        let record_length = u16::try_from(record_length).map_err(|_| {
            DbfError::InvalidConfig(format!(
                "record length {} exceeds 65535 bytes",
                record_length
            ))
        })?;

        Ok(DbfHeader {
            signature: DBASE3_SIGNATURE,
            year: 0,
            month: 1,
            day: 1,
            record_count: 0,
            header_length,
            record_length,
            reserved1: [0; 2],
            incomplete_transaction: 0,
            encryption_flag: 0,
            free_record_thread: 0,
            reserved2: [0; 4],
            reserved3: [0; 4],
            mdx_flag: 0,
            language_driver: 0,
            reserved4: [0; 2],
            fields,
            padding: Vec::new(),
        })
    }

    /// Set the record count stored at offset 4.
    pub fn with_record_count(mut self, count: u32) -> Self {
        self.record_count = count;
        self
    }

    /// Set the last-update date. Years outside 1900..=2155 are clamped.
    pub fn with_last_update(mut self, date: NaiveDate) -> Self {
        self.year = (date.year() - 1900).clamp(0, 255) as u8;
        self.month = date.month() as u8;
        self.day = date.day() as u8;
        self
    }

    /// Set the language-driver id (offset 29).
    pub fn with_language_driver(mut self, driver: u8) -> Self {
        self.language_driver = driver;
        self
    }

    /// Decode a header from the start of a stream.
    ///
    /// Consumes exactly `header_length` bytes, leaving the stream positioned at
    /// the first record.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::Structural`] if:
    /// - The stream ends before the terminator or the declared header length
    /// - The descriptor table overruns the declared header length
    /// - The record length disagrees with the field lengths
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fixed = [0u8; HEADER_SIZE];
        read_exact_at(reader, &mut fixed, 0, "the 32-byte header")?;

        let header_length = u16::from_le_bytes([fixed[8], fixed[9]]);
        let record_length = u16::from_le_bytes([fixed[10], fixed[11]]);

        let mut fields = Vec::new();
        let mut offset = HEADER_SIZE as u64;
        loop {
            let mut first = [0u8; 1];
            read_exact_at(reader, &mut first, offset, "the field descriptor table")?;
            if first[0] == FIELD_TERMINATOR {
                offset += 1;
                break;
            }

            if offset + DESCRIPTOR_SIZE as u64 > header_length as u64 {
                return Err(DbfError::structural(
                    offset,
                    format!(
                        "field descriptor runs past declared header length {}",
                        header_length
                    ),
                ));
            }

            let mut buf = [0u8; DESCRIPTOR_SIZE];
            buf[0] = first[0];
            read_exact_at(reader, &mut buf[1..], offset + 1, "a field descriptor")?;
            fields.push(FieldDescriptor::from_bytes(&buf));
            offset += DESCRIPTOR_SIZE as u64;
        }

        if offset > header_length as u64 {
            return Err(DbfError::structural(
                offset,
                format!(
                    "descriptor table ends at byte {} but header length is {}",
                    offset, header_length
                ),
            ));
        }

        let mut padding = vec![0u8; (header_length as u64 - offset) as usize];
        read_exact_at(reader, &mut padding, offset, "the header padding")?;

        let expected = 1 + fields.iter().map(|f| f.length()).sum::<usize>();
        if expected != record_length as usize {
            return Err(DbfError::structural(
                10,
                format!(
                    "record length {} does not match 1 + sum of field lengths ({})",
                    record_length, expected
                ),
            ));
        }

        Ok(DbfHeader {
            signature: fixed[0],
            year: fixed[1],
            month: fixed[2],
            day: fixed[3],
            record_count: u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
            header_length,
            record_length,
            reserved1: [fixed[12], fixed[13]],
            incomplete_transaction: fixed[14],
            encryption_flag: fixed[15],
            free_record_thread: u32::from_le_bytes([fixed[16], fixed[17], fixed[18], fixed[19]]),
            reserved2: [fixed[20], fixed[21], fixed[22], fixed[23]],
            reserved3: [fixed[24], fixed[25], fixed[26], fixed[27]],
            mdx_flag: fixed[28],
            language_driver: fixed[29],
            reserved4: [fixed[30], fixed[31]],
            fields,
            padding,
        })
    }

    /// Encode the header, descriptor table, terminator and padding.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut fixed = [0u8; HEADER_SIZE];
        fixed[0] = self.signature;
        fixed[1] = self.year;
        fixed[2] = self.month;
        fixed[3] = self.day;
        fixed[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        fixed[8..10].copy_from_slice(&self.header_length.to_le_bytes());
        fixed[10..12].copy_from_slice(&self.record_length.to_le_bytes());
        fixed[12..14].copy_from_slice(&self.reserved1);
        fixed[14] = self.incomplete_transaction;
        fixed[15] = self.encryption_flag;
        fixed[16..20].copy_from_slice(&self.free_record_thread.to_le_bytes());
        fixed[20..24].copy_from_slice(&self.reserved2);
        fixed[24..28].copy_from_slice(&self.reserved3);
        fixed[28] = self.mdx_flag;
        fixed[29] = self.language_driver;
        fixed[30..32].copy_from_slice(&self.reserved4);
        writer.write_all(&fixed)?;

        for field in &self.fields {
            writer.write_all(&field.to_bytes())?;
        }
        writer.write_all(&[FIELD_TERMINATOR])?;
        writer.write_all(&self.padding)
    }

    /// Encoded header as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_length as usize);
        // Writing to a Vec cannot fail
        let _ = self.write(&mut buf);
        buf
    }

    pub fn signature(&self) -> u8 {
        self.signature
    }

    /// Last-update date, or `None` if the stored bytes aren't a valid date.
    pub fn last_update(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(1900 + self.year as i32, self.month as u32, self.day as u32)
    }

    /// Record count as stored in the header (deleted records included).
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Bytes before the first record.
    pub fn header_length(&self) -> u64 {
        self.header_length as u64
    }

    /// Bytes per record, deletion flag included.
    pub fn record_length(&self) -> u64 {
        self.record_length as u64
    }

    pub fn incomplete_transaction(&self) -> u8 {
        self.incomplete_transaction
    }

    pub fn encryption_flag(&self) -> u8 {
        self.encryption_flag
    }

    pub fn free_record_thread(&self) -> u32 {
        self.free_record_thread
    }

    pub fn mdx_flag(&self) -> u8 {
        self.mdx_flag
    }

    pub fn language_driver(&self) -> u8 {
        self.language_driver
    }

    /// Field descriptors in column order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Column index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// File length implied by the stored record count plus the `0x1A` trailer.
    pub fn expected_file_length(&self) -> u64 {
        self.header_length() + self.record_count as u64 * self.record_length() + 1
    }
}
