//! Decoded field values.
//!
//! Every field decodes to exactly one [`FieldValue`] variant. Numeric fields
//! without decimals pick their integer width from the declared field length,
//! so the variant itself is part of the decoded output.

use chrono::NaiveDate;
use std::fmt;

/// A typed value decoded from one fixed-width field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Character field, whitespace-trimmed
    Character(String),
    /// Date field (`YYYYMMDD`), naive local date
    Date(NaiveDate),
    /// Float field (`F`)
    Float(f32),
    /// Logical field (`L`)
    Logical(bool),
    /// Numeric field, no decimals, declared length < 5
    Short(i16),
    /// Numeric field, no decimals, declared length 5..8
    Integer(i32),
    /// Numeric field, no decimals, declared length >= 8
    Long(i64),
    /// Numeric field with decimals
    Double(f64),
    /// Unrecognized type tag or empty date
    Null,
}

impl FieldValue {
    /// True for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Widen any integer variant to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Short(v) => Some(*v as i64),
            FieldValue::Integer(v) => Some(*v as i64),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert any numeric variant to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Borrow the text of a character field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Character(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Milliseconds since 1970-01-01 at naive midnight of a date value.
    ///
    /// The usual "epoch millis" representation of a `D` field.
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.as_date()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Character(s) => write!(f, "{}", s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Logical(b) => write!(f, "{}", b),
            FieldValue::Short(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Null => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert_eq!(FieldValue::Short(-3).as_i64(), Some(-3));
        assert_eq!(FieldValue::Integer(70_000).as_i64(), Some(70_000));
        assert_eq!(FieldValue::Long(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(FieldValue::Double(1.5).as_i64(), None);
        assert_eq!(FieldValue::Short(2).as_f64(), Some(2.0));
    }

    #[test]
    fn test_timestamp_millis() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(FieldValue::Date(date).timestamp_millis(), Some(86_400_000));
        assert_eq!(FieldValue::Null.timestamp_millis(), None);
    }

    #[test]
    fn test_display() {
        let date = NaiveDate::from_ymd_opt(2014, 12, 9).unwrap();
        assert_eq!(FieldValue::Date(date).to_string(), "2014-12-09");
        assert_eq!(FieldValue::Character("abc".into()).to_string(), "abc");
        assert_eq!(FieldValue::Null.to_string(), "");
    }
}
