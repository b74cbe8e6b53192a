//! Field descriptors and per-field value decoding.
//!
//! A descriptor is one 32-byte entry of the table that follows the fixed
//! header:
//!
//! | Offset | Size | Content                                  |
//! |--------|------|------------------------------------------|
//! | 0      | 11   | name, NUL-padded                         |
//! | 11     | 1    | type tag (`C`, `D`, `F`, `L`, `N`, ...)  |
//! | 12     | 4    | reserved                                 |
//! | 16     | 1    | field length in bytes                    |
//! | 17     | 1    | decimal count                            |
//! | 18     | 2    | reserved                                 |
//! | 20     | 1    | work area id                             |
//! | 21     | 2    | reserved                                 |
//! | 23     | 1    | set fields flag                          |
//! | 24     | 7    | reserved                                 |
//! | 31     | 1    | index field flag                         |
//!
//! Everything we don't interpret is kept verbatim so a descriptor re-encodes
//! to the exact bytes it was decoded from.

use super::value::FieldValue;
use super::DESCRIPTOR_SIZE;
use crate::error::{DbfError, Result};
use chrono::{Duration, NaiveDate};
use encoding_rs::Encoding;
use std::fmt;

/// Maximum number of name bytes (the 11th byte is always NUL in valid files).
pub const MAX_NAME_LEN: usize = 10;

/// Field type tag (descriptor byte 11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `C`
    Character,
    /// `D`, eight ASCII digits `YYYYMMDD`
    Date,
    /// `F`
    Float,
    /// `L`
    Logical,
    /// `N`
    Numeric,
    /// Any other tag; decodes to [`FieldValue::Null`]
    Other(u8),
}

impl FieldType {
    /// Parse a type tag byte.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            b'C' => FieldType::Character,
            b'D' => FieldType::Date,
            b'F' => FieldType::Float,
            b'L' => FieldType::Logical,
            b'N' => FieldType::Numeric,
            other => FieldType::Other(other),
        }
    }

    /// The tag byte as stored on disk.
    pub fn as_u8(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Date => b'D',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Numeric => b'N',
            FieldType::Other(tag) => tag,
        }
    }
}

/// Raw bytes of a field didn't match the grammar of its type.
///
/// Carries the value a tolerant reader should use instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueAnomaly {
    /// What was wrong with the bytes
    pub message: String,
    /// Zero/false/empty substitute
    pub fallback: FieldValue,
}

impl fmt::Display for ValueAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    raw_name: [u8; 11],
    field_type: FieldType,
    length: u8,
    decimal_count: u8,
    reserved1: [u8; 4],
    reserved2: [u8; 2],
    work_area_id: u8,
    reserved3: [u8; 2],
    set_fields_flag: u8,
    reserved4: [u8; 7],
    index_field_flag: u8,
}

impl FieldDescriptor {
    /// Build a descriptor for writing a new file.
    ///
    /// Names longer than 10 bytes or containing NUL are rejected.
    pub fn new(name: &str, field_type: FieldType, length: u8, decimal_count: u8) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_NAME_LEN || bytes.contains(&0) {
            return Err(DbfError::InvalidConfig(format!(
                "field name {:?} must be 1-{} bytes without NUL",
                name, MAX_NAME_LEN
            )));
        }
        let mut raw_name = [0u8; 11];
        raw_name[..bytes.len()].copy_from_slice(bytes);

        Ok(FieldDescriptor {
            name: name.to_string(),
            raw_name,
            field_type,
            length,
            decimal_count,
            reserved1: [0; 4],
            reserved2: [0; 2],
            work_area_id: 0,
            reserved3: [0; 2],
            set_fields_flag: 0,
            reserved4: [0; 7],
            index_field_flag: 0,
        })
    }

    /// `C` field of `length` bytes.
    pub fn character(name: &str, length: u8) -> Result<Self> {
        Self::new(name, FieldType::Character, length, 0)
    }

    /// `N` field; `decimal_count == 0` decodes as an integer.
    pub fn numeric(name: &str, length: u8, decimal_count: u8) -> Result<Self> {
        Self::new(name, FieldType::Numeric, length, decimal_count)
    }

    /// `F` field.
    pub fn float(name: &str, length: u8, decimal_count: u8) -> Result<Self> {
        Self::new(name, FieldType::Float, length, decimal_count)
    }

    /// `D` field (always 8 bytes).
    pub fn date(name: &str) -> Result<Self> {
        Self::new(name, FieldType::Date, 8, 0)
    }

    /// `L` field (always 1 byte).
    pub fn logical(name: &str) -> Result<Self> {
        Self::new(name, FieldType::Logical, 1, 0)
    }

    /// Decode a descriptor from its 32 on-disk bytes.
    ///
    /// The first name byte is taken literally even when it is zero; trailing
    /// zero bytes of the remaining ten are trimmed.
    pub fn from_bytes(buf: &[u8; DESCRIPTOR_SIZE]) -> Self {
        let mut raw_name = [0u8; 11];
        raw_name.copy_from_slice(&buf[0..11]);

        let mut end = raw_name.len();
        while end > 1 && raw_name[end - 1] == 0 {
            end -= 1;
        }
        let name = String::from_utf8_lossy(&raw_name[..end]).into_owned();

        FieldDescriptor {
            name,
            raw_name,
            field_type: FieldType::from_u8(buf[11]),
            length: buf[16],
            decimal_count: buf[17],
            reserved1: [buf[12], buf[13], buf[14], buf[15]],
            reserved2: [buf[18], buf[19]],
            work_area_id: buf[20],
            reserved3: [buf[21], buf[22]],
            set_fields_flag: buf[23],
            reserved4: [buf[24], buf[25], buf[26], buf[27], buf[28], buf[29], buf[30]],
            index_field_flag: buf[31],
        }
    }

    /// Encode to the 32 on-disk bytes.
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[0..11].copy_from_slice(&self.raw_name);
        buf[11] = self.field_type.as_u8();
        buf[12..16].copy_from_slice(&self.reserved1);
        buf[16] = self.length;
        buf[17] = self.decimal_count;
        buf[18..20].copy_from_slice(&self.reserved2);
        buf[20] = self.work_area_id;
        buf[21..23].copy_from_slice(&self.reserved3);
        buf[23] = self.set_fields_flag;
        buf[24..31].copy_from_slice(&self.reserved4);
        buf[31] = self.index_field_flag;
        buf
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Declared width in bytes.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Digits after the decimal point (meaningful for `N` only).
    pub fn decimal_count(&self) -> u8 {
        self.decimal_count
    }

    pub fn work_area_id(&self) -> u8 {
        self.work_area_id
    }

    pub fn set_fields_flag(&self) -> u8 {
        self.set_fields_flag
    }

    pub fn index_field_flag(&self) -> u8 {
        self.index_field_flag
    }

    /// Decode a field, substituting the fallback value on an anomaly.
    ///
    /// `raw` must be exactly [`length()`](Self::length) bytes.
    pub fn decode(&self, raw: &[u8], encoding: &'static Encoding) -> FieldValue {
        self.try_decode(raw, encoding)
            .unwrap_or_else(|anomaly| anomaly.fallback)
    }

    /// Decode a field, reporting bytes that don't fit the declared type.
    pub fn try_decode(
        &self,
        raw: &[u8],
        encoding: &'static Encoding,
    ) -> std::result::Result<FieldValue, ValueAnomaly> {
        match self.field_type {
            FieldType::Character => decode_character(raw, encoding),
            FieldType::Date => decode_date(raw),
            FieldType::Logical => Ok(FieldValue::Logical(decode_logical(raw))),
            FieldType::Float => decode_float(raw),
            FieldType::Numeric if self.decimal_count == 0 => decode_integer(raw, self.length),
            FieldType::Numeric => decode_double(raw),
            FieldType::Other(_) => Ok(FieldValue::Null),
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}({}",
            self.name,
            self.field_type.as_u8() as char,
            self.length
        )?;
        if self.decimal_count > 0 {
            write!(f, ",{}", self.decimal_count)?;
        }
        write!(f, ")")
    }
}

fn is_padding(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0
}

/// Strip padding from both ends.
fn trim_padding(raw: &[u8]) -> &[u8] {
    let start = raw.iter().position(|&b| !is_padding(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| !is_padding(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Trimmed numeric text, or `None` for the blank/`?` "uninitialized" sentinel.
fn numeric_text(raw: &[u8]) -> std::result::Result<Option<&str>, String> {
    let trimmed = trim_padding(raw);
    if trimmed.is_empty() || trimmed[0] == b'?' {
        return Ok(None);
    }
    std::str::from_utf8(trimmed)
        .map(Some)
        .map_err(|_| format!("non-ASCII numeric content {:?}", trimmed))
}

fn decode_character(
    raw: &[u8],
    encoding: &'static Encoding,
) -> std::result::Result<FieldValue, ValueAnomaly> {
    let (text, had_errors) = encoding.decode_without_bom_handling(raw);
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let value = FieldValue::Character(trimmed.to_string());
    if had_errors {
        return Err(ValueAnomaly {
            message: format!("malformed {} byte sequence", encoding.name()),
            fallback: value,
        });
    }
    Ok(value)
}

fn decode_date(raw: &[u8]) -> std::result::Result<FieldValue, ValueAnomaly> {
    let anomaly = |message: String| ValueAnomaly {
        message,
        fallback: FieldValue::Null,
    };

    if raw.iter().all(|&b| is_padding(b) || b == b'0') {
        return Ok(FieldValue::Null);
    }
    if raw.len() < 8 {
        return Err(anomaly(format!("date needs 8 bytes, field has {}", raw.len())));
    }
    let digits = &raw[..8];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(anomaly(format!(
            "date {:?} is not YYYYMMDD",
            String::from_utf8_lossy(digits)
        )));
    }

    let year = parse_digits(&digits[0..4]) as i32;
    let month = parse_digits(&digits[4..6]);
    let day = parse_digits(&digits[6..8]);
    roll_date(year, month, day)
        .map(FieldValue::Date)
        .ok_or_else(|| anomaly(format!("{:04}{:02}{:02} is out of range", year, month, day)))
}

/// Lenient calendar arithmetic: out-of-range months and days roll over, so
/// `2014-02-30` is 2014-03-02 and `2014-13-01` is 2015-01-01.
fn roll_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let months = year * 12 + month as i32 - 1;
    let first = NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)?;
    first.checked_add_signed(Duration::days(day as i64 - 1))
}

/// Unsigned decimal value of ASCII digits (caller checked they are digits).
fn parse_digits(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, &b| acc * 10 + (b - b'0') as u32)
}

fn decode_logical(raw: &[u8]) -> bool {
    matches!(raw.first(), Some(b'Y' | b'y' | b'T' | b't'))
}

/// Integer width follows the declared length: < 5 → i16, < 8 → i32, else i64.
fn decode_integer(raw: &[u8], length: u8) -> std::result::Result<FieldValue, ValueAnomaly> {
    let zero = match length {
        0..=4 => FieldValue::Short(0),
        5..=7 => FieldValue::Integer(0),
        _ => FieldValue::Long(0),
    };
    let text = match numeric_text(raw) {
        Ok(Some(text)) => text,
        Ok(None) => return Ok(zero),
        Err(message) => return Err(ValueAnomaly { message, fallback: zero }),
    };

    let parsed = match zero {
        FieldValue::Short(_) => text.parse::<i16>().map(FieldValue::Short),
        FieldValue::Integer(_) => text.parse::<i32>().map(FieldValue::Integer),
        _ => text.parse::<i64>().map(FieldValue::Long),
    };
    parsed.map_err(|e| ValueAnomaly {
        message: format!("integer {:?}: {}", text, e),
        fallback: zero,
    })
}

fn decode_double(raw: &[u8]) -> std::result::Result<FieldValue, ValueAnomaly> {
    let zero = FieldValue::Double(0.0);
    match numeric_text(raw) {
        Ok(Some(text)) => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FieldValue::Double(v)),
            Ok(_) => Err(ValueAnomaly {
                message: format!("decimal {:?} is not finite", text),
                fallback: zero,
            }),
            Err(e) => Err(ValueAnomaly {
                message: format!("decimal {:?}: {}", text, e),
                fallback: zero,
            }),
        },
        Ok(None) => Ok(zero),
        Err(message) => Err(ValueAnomaly { message, fallback: zero }),
    }
}

fn decode_float(raw: &[u8]) -> std::result::Result<FieldValue, ValueAnomaly> {
    let zero = FieldValue::Float(0.0);
    match numeric_text(raw) {
        Ok(Some(text)) => match text.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(FieldValue::Float(v)),
            Ok(_) => Err(ValueAnomaly {
                message: format!("float {:?} is not finite", text),
                fallback: zero,
            }),
            Err(e) => Err(ValueAnomaly {
                message: format!("float {:?}: {}", text, e),
                fallback: zero,
            }),
        },
        Ok(None) => Ok(zero),
        Err(message) => Err(ValueAnomaly { message, fallback: zero }),
    }
}
