//! Sequential record scanning.
//!
//! A scanner walks fixed-width records from an open stream:
//!
//! - `0x2A` status byte: deleted record, skipped without being emitted
//! - `0x1A` status byte or end of stream: no more records
//! - anything else: a live record, decoded field by field
//!
//! When created for a [`Split`], the scanner only reads status bytes at
//! offsets inside `[start, start + length)`. Deleted records advance the
//! position like live ones, so adjacent splits never emit the same record
//! twice and never drop one.

use super::charset;
use super::header::DbfHeader;
use super::record::DbfRecord;
use super::{DELETED, END_OF_FILE};
use crate::error::{DbfError, Result};
use crate::split::Split;
use encoding_rs::Encoding;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Decoding options shared by every scanner of a job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Charset for `C` fields. `None` resolves it from the header's
    /// language-driver byte, falling back to GBK.
    pub encoding: Option<&'static Encoding>,
    /// Fail with [`DbfError::ValueDecode`] instead of substituting a
    /// zero/false/empty value for malformed field bytes.
    pub strict: bool,
}

impl ScanOptions {
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Where the scanner is in the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Next read is a status byte
    AwaitingRecord,
    /// A deletion marker was read; the record body must be skipped
    Deleted,
    /// End sentinel, end of stream or split end reached
    Done,
}

/// Streaming scanner over the records of one file or one split.
pub struct RecordScanner<R> {
    reader: R,
    header: Arc<DbfHeader>,
    encoding: &'static Encoding,
    strict: bool,
    state: ScanState,
    /// Absolute offset of the next status byte
    position: u64,
    start: u64,
    /// Exclusive bound on status-byte offsets
    end: Option<u64>,
    record_number: u64,
    /// Reusable record body buffer
    buffer: Vec<u8>,
    emitted: u64,
    deleted: u64,
    anomalies: u64,
    /// Fields that already logged an anomaly warning
    warned: Vec<bool>,
}

impl<R: Read> RecordScanner<R> {
    /// Create a scanner for a stream positioned at the first record.
    ///
    /// Typically the stream the header was just decoded from.
    pub fn new(reader: R, header: Arc<DbfHeader>, options: &ScanOptions) -> Self {
        let start = header.header_length();
        Self::with_range(reader, header, options, start, None)
    }

    fn with_range(
        reader: R,
        header: Arc<DbfHeader>,
        options: &ScanOptions,
        start: u64,
        end: Option<u64>,
    ) -> Self {
        let encoding = charset::resolve(options.encoding, header.language_driver());
        let body_len = header.record_length().saturating_sub(1) as usize;
        let record_number = (start - header.header_length()) / header.record_length().max(1);
        let field_count = header.field_count();

        RecordScanner {
            reader,
            header,
            encoding,
            strict: options.strict,
            state: ScanState::AwaitingRecord,
            position: start,
            start,
            end,
            record_number,
            buffer: vec![0u8; body_len],
            emitted: 0,
            deleted: 0,
            anomalies: 0,
            warned: vec![false; field_count],
        }
    }

    pub fn header(&self) -> &Arc<DbfHeader> {
        &self.header
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Charset used for `C` fields.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Absolute offset of the next status byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Fraction of the split (or of the header's record count) consumed.
    ///
    /// Always 0 for an empty range, 1 once the scan is done.
    pub fn progress(&self) -> f32 {
        let end = self.end.unwrap_or_else(|| {
            self.header.header_length()
                + self.header.record_count() as u64 * self.header.record_length()
        });
        if end <= self.start {
            return 0.0;
        }
        if self.state == ScanState::Done {
            return 1.0;
        }
        ((self.position - self.start) as f32 / (end - self.start) as f32).min(1.0)
    }

    /// Live records emitted so far.
    pub fn records_emitted(&self) -> u64 {
        self.emitted
    }

    /// Deleted records skipped so far.
    pub fn deleted_skipped(&self) -> u64 {
        self.deleted
    }

    /// Field values that didn't match their declared type.
    pub fn anomaly_count(&self) -> u64 {
        self.anomalies
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Create an iterator over the remaining records.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { scanner: self }
    }

    /// Read the next live record.
    ///
    /// Returns `Ok(None)` once the end sentinel, the end of the stream or the
    /// end of the split is reached, and keeps returning it afterwards.
    /// After an error the scanner is `Done`; the record stream can't be
    /// resynchronized.
    pub fn next_record(&mut self) -> Result<Option<DbfRecord>> {
        let result = self.step();
        if result.is_err() {
            self.state = ScanState::Done;
        }
        result
    }

    fn step(&mut self) -> Result<Option<DbfRecord>> {
        loop {
            match self.state {
                ScanState::Done => return Ok(None),
                ScanState::Deleted => {
                    self.read_body()?;
                    trace!(record = self.record_number, "skipped deleted record");
                    self.advance();
                    self.state = ScanState::AwaitingRecord;
                }
                ScanState::AwaitingRecord => {
                    if self.end.is_some_and(|end| self.position >= end) {
                        self.finish();
                        return Ok(None);
                    }
                    match self.read_status()? {
                        None | Some(END_OF_FILE) => {
                            self.finish();
                            return Ok(None);
                        }
                        Some(DELETED) => {
                            self.deleted += 1;
                            self.state = ScanState::Deleted;
                        }
                        Some(_) => {
                            self.read_body()?;
                            let record = self.decode_body()?;
                            self.advance();
                            self.emitted += 1;
                            return Ok(Some(record));
                        }
                    }
                }
            }
        }
    }

    /// One status byte, or `None` at end of stream.
    fn read_status(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DbfError::Io(e)),
            }
        }
    }

    /// Fill the body buffer with the `record_length - 1` bytes after the status byte.
    fn read_body(&mut self) -> Result<()> {
        match self.reader.read_exact(&mut self.buffer) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(DbfError::structural(
                self.position,
                format!(
                    "record {} truncated: expected {} bytes",
                    self.record_number,
                    self.header.record_length()
                ),
            )),
            Err(e) => Err(DbfError::Io(e)),
        }
    }

    fn decode_body(&mut self) -> Result<DbfRecord> {
        let mut values = Vec::with_capacity(self.header.field_count());
        let mut offset = 0usize;

        for (index, field) in self.header.fields().iter().enumerate() {
            let raw = &self.buffer[offset..offset + field.length()];
            let value = match field.try_decode(raw, self.encoding) {
                Ok(value) => value,
                Err(anomaly) => {
                    self.anomalies += 1;
                    let field_offset = self.position + 1 + offset as u64;
                    if self.strict {
                        return Err(DbfError::ValueDecode {
                            field: field.name().to_string(),
                            offset: field_offset,
                            message: anomaly.message,
                        });
                    }
                    if !self.warned[index] {
                        self.warned[index] = true;
                        warn!(
                            field = field.name(),
                            offset = field_offset,
                            reason = %anomaly,
                            "substituting fallback for malformed field value"
                        );
                    } else {
                        trace!(
                            field = field.name(),
                            offset = field_offset,
                            reason = %anomaly,
                            "value anomaly"
                        );
                    }
                    anomaly.fallback
                }
            };
            values.push(value);
            offset += field.length();
        }

        Ok(DbfRecord::new(
            self.record_number,
            values,
            Arc::clone(&self.header),
        ))
    }

    fn advance(&mut self) {
        self.position += self.header.record_length();
        self.record_number += 1;
    }

    fn finish(&mut self) {
        self.state = ScanState::Done;
        debug!(
            start = self.start,
            position = self.position,
            records = self.emitted,
            deleted = self.deleted,
            anomalies = self.anomalies,
            "scan finished"
        );
    }
}

impl<R: Read + Seek> RecordScanner<R> {
    /// Seek to a split's start and scan only the records inside it.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::Structural`] if the split start is not a whole
    /// number of records past the header.
    pub fn for_split(mut reader: R, split: &Split, options: &ScanOptions) -> Result<Self> {
        let header = Arc::clone(split.header());
        let header_length = header.header_length();
        let record_length = header.record_length();

        if record_length == 0
            || split.start() < header_length
            || (split.start() - header_length) % record_length != 0
        {
            return Err(DbfError::structural(
                split.start(),
                format!(
                    "split start is not aligned to {}-byte records after a {}-byte header",
                    record_length, header_length
                ),
            ));
        }

        reader.seek(SeekFrom::Start(split.start()))?;
        Ok(Self::with_range(
            reader,
            header,
            options,
            split.start(),
            Some(split.end()),
        ))
    }
}

/// Iterator over scanned records.
///
/// Created by [`RecordScanner::records()`].
pub struct Records<'a, R> {
    scanner: &'a mut RecordScanner<R>,
}

impl<'a, R: Read> Iterator for Records<'a, R> {
    type Item = Result<DbfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scanner.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
