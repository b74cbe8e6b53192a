//! Decoded records.

use super::header::DbfHeader;
use super::value::FieldValue;
use std::collections::HashMap;
use std::sync::Arc;

/// One live record: field values in descriptor order.
///
/// Holds a shared reference to the header so values can be looked up by
/// field name without copying the field table.
#[derive(Debug, Clone)]
pub struct DbfRecord {
    number: u64,
    values: Vec<FieldValue>,
    header: Arc<DbfHeader>,
}

impl DbfRecord {
    pub(crate) fn new(number: u64, values: Vec<FieldValue>, header: Arc<DbfHeader>) -> Self {
        DbfRecord {
            number,
            values,
            header,
        }
    }

    /// Zero-based physical record number within the file.
    ///
    /// Deleted records occupy numbers too, so numbering has gaps where
    /// records were skipped.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Values in column order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column index.
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Value by field name.
    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.header
            .field_index(name)
            .and_then(|index| self.values.get(index))
    }

    /// `(field name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.header
            .fields()
            .iter()
            .map(|f| f.name())
            .zip(self.values.iter())
    }

    /// Field name → value map.
    pub fn to_map(&self) -> HashMap<String, FieldValue> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    pub fn header(&self) -> &Arc<DbfHeader> {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dbf::field::FieldDescriptor;

    fn record() -> DbfRecord {
        let header = DbfHeader::new(vec![
            FieldDescriptor::character("NAME", 4).unwrap(),
            FieldDescriptor::logical("OK").unwrap(),
        ])
        .unwrap();
        DbfRecord::new(
            7,
            vec![FieldValue::Character("ab".into()), FieldValue::Logical(true)],
            Arc::new(header),
        )
    }

    #[test]
    fn test_named_access() {
        let record = record();
        assert_eq!(record.number(), 7);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get_by_name("OK"), Some(&FieldValue::Logical(true)));
        assert_eq!(record.get_by_name("MISSING"), None);
        assert_eq!(record.get(0).and_then(|v| v.as_str()), Some("ab"));
    }

    #[test]
    fn test_pairs_and_map() {
        let record = record();
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["NAME", "OK"]);

        let map = record.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["NAME"], FieldValue::Character("ab".into()));
    }
}
