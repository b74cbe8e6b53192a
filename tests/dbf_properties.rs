//! Property-based tests for the DBF codec and the split planner.
//!
//! Covers header/descriptor round trips, the header and record length
//! invariants, numeric and logical decoding rules, and split partitioning.

use dbfsplit::io::dbf::{DbfHeader, FieldDescriptor, FieldType, FieldValue, DESCRIPTOR_SIZE};
use dbfsplit::split::{plan_splits, BlockLocation, SplitConfig};
use proptest::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Header Properties
// ============================================================================

mod header_properties {
    use super::*;

    fn arb_field() -> impl Strategy<Value = FieldDescriptor> {
        (
            "[A-Z][A-Z0-9_]{0,9}",
            prop_oneof![
                Just(FieldType::Character),
                Just(FieldType::Date),
                Just(FieldType::Float),
                Just(FieldType::Logical),
                Just(FieldType::Numeric),
            ],
            1u8..=254,
            0u8..=8,
        )
            .prop_map(|(name, field_type, length, decimals)| {
                FieldDescriptor::new(&name, field_type, length, decimals).unwrap()
            })
    }

    fn arb_header() -> impl Strategy<Value = DbfHeader> {
        (
            prop::collection::vec(arb_field(), 0..40),
            any::<u32>(),
            any::<u8>(),
        )
            .prop_map(|(fields, records, driver)| {
                DbfHeader::new(fields)
                    .unwrap()
                    .with_record_count(records)
                    .with_language_driver(driver)
            })
    }

    proptest! {
        #[test]
        fn test_header_length_invariant(header in arb_header()) {
            prop_assert_eq!(
                header.header_length(),
                32 + 32 * header.field_count() as u64 + 1
            );
        }

        #[test]
        fn test_record_length_invariant(header in arb_header()) {
            let sum: usize = header.fields().iter().map(|f| f.length()).sum();
            prop_assert_eq!(header.record_length(), 1 + sum as u64);
        }

        #[test]
        fn test_header_roundtrip(header in arb_header()) {
            let bytes = header.to_bytes();
            prop_assert_eq!(bytes.len() as u64, header.header_length());

            let decoded = DbfHeader::read(&mut Cursor::new(&bytes)).unwrap();
            prop_assert_eq!(&decoded, &header);
            prop_assert_eq!(decoded.to_bytes(), bytes);
        }

        /// Reserved and flag bytes survive decoding untouched.
        #[test]
        fn test_reserved_bytes_roundtrip(
            header in arb_header(),
            fixed in prop::collection::vec(any::<u8>(), 20),
        ) {
            let mut bytes = header.to_bytes();
            // Offsets 12..=27 and 30..=31; 28/29 are mdx flag and language driver
            bytes[12..28].copy_from_slice(&fixed[..16]);
            bytes[28] = fixed[16];
            bytes[29] = fixed[17];
            bytes[30] = fixed[18];
            bytes[31] = fixed[19];

            let decoded = DbfHeader::read(&mut Cursor::new(&bytes)).unwrap();
            prop_assert_eq!(decoded.to_bytes(), bytes);
        }

        /// Any 32 descriptor bytes re-encode identically.
        #[test]
        fn test_descriptor_bytes_roundtrip(raw in prop::array::uniform32(any::<u8>())) {
            let field = FieldDescriptor::from_bytes(&raw);
            prop_assert_eq!(field.to_bytes(), raw);
            prop_assert_eq!(raw.len(), DESCRIPTOR_SIZE);
        }

        #[test]
        fn test_truncated_header_is_structural(header in arb_header(), cut in 0usize..1000) {
            let bytes = header.to_bytes();
            let cut = cut % bytes.len();
            let err = DbfHeader::read(&mut Cursor::new(&bytes[..cut])).unwrap_err();
            prop_assert!(err.is_structural());
        }
    }
}

// ============================================================================
// Field Decoding Properties
// ============================================================================

mod decode_properties {
    use super::*;

    fn decode(field: &FieldDescriptor, raw: &[u8]) -> FieldValue {
        field.decode(raw, encoding_rs::GBK)
    }

    proptest! {
        #[test]
        fn test_blank_numeric_is_zero(length in 1u8..=30) {
            let field = FieldDescriptor::numeric("N", length, 0).unwrap();
            let blank = vec![b' '; length as usize];
            prop_assert_eq!(decode(&field, &blank).as_i64(), Some(0));

            let field = FieldDescriptor::numeric("N", length, 2).unwrap();
            prop_assert_eq!(decode(&field, &blank), FieldValue::Double(0.0));
        }

        #[test]
        fn test_placeholder_numeric_is_zero(length in 1u8..=30, tail in "[ 0-9?*]{0,29}") {
            let mut raw = vec![b'?'];
            raw.extend_from_slice(tail.as_bytes());
            raw.resize(length as usize, b' ');

            let field = FieldDescriptor::numeric("N", length, 0).unwrap();
            prop_assert_eq!(decode(&field, &raw).as_i64(), Some(0));
            let field = FieldDescriptor::float("F", length, 3).unwrap();
            prop_assert_eq!(decode(&field, &raw), FieldValue::Float(0.0));
        }

        #[test]
        fn test_integer_width_follows_length(value in -999i64..=9999, length in 4u8..=19) {
            let field = FieldDescriptor::numeric("N", length, 0).unwrap();
            let raw = format!("{:>width$}", value, width = length as usize);
            let decoded = decode(&field, raw.as_bytes());

            let expected = match length {
                0..=4 => FieldValue::Short(value as i16),
                5..=7 => FieldValue::Integer(value as i32),
                _ => FieldValue::Long(value),
            };
            prop_assert_eq!(decoded, expected);
        }

        #[test]
        fn test_logical_never_fails(raw in prop::collection::vec(any::<u8>(), 1..4)) {
            let field = FieldDescriptor::logical("L").unwrap();
            let expected = matches!(raw[0], b'Y' | b'y' | b'T' | b't');
            prop_assert_eq!(field.try_decode(&raw, encoding_rs::GBK), Ok(FieldValue::Logical(expected)));
        }

        #[test]
        fn test_unknown_type_is_null(tag in b'a'..=b'z', raw in prop::collection::vec(any::<u8>(), 0..16)) {
            let field = FieldDescriptor::new("X", FieldType::from_u8(tag), 16, 0).unwrap();
            prop_assert_eq!(decode(&field, &raw), FieldValue::Null);
        }
    }
}

// ============================================================================
// Split Planning Properties
// ============================================================================

mod split_properties {
    use super::*;

    fn header(field_length: u8) -> Arc<DbfHeader> {
        Arc::new(
            DbfHeader::new(vec![FieldDescriptor::character("C", field_length).unwrap()])
                .unwrap(),
        )
    }

    proptest! {
        #[test]
        fn test_splits_partition_record_region(
            field_length in 1u8..=200,
            records in 0u64..20_000,
            tail in 0u64..2,
            records_per_split in 1u64..3_000,
            slop in 1.0f64..2.0,
        ) {
            let header = header(field_length);
            let hl = header.header_length();
            let rl = header.record_length();
            let file_length = hl + records * rl + tail;
            let config = SplitConfig::default()
                .with_records_per_split(records_per_split)
                .with_slop(slop);
            let blocks = vec![BlockLocation::new(0, file_length, vec!["h".into()])];

            let splits = plan_splits(Path::new("p.dbf"), file_length, header, &config, &blocks).unwrap();

            prop_assert!(!splits.is_empty());
            prop_assert_eq!(splits[0].start(), hl);
            prop_assert_eq!(splits.last().unwrap().end(), file_length);
            for pair in splits.windows(2) {
                prop_assert_eq!(pair[0].end(), pair[1].start());
            }
            for split in &splits[..splits.len() - 1] {
                prop_assert_eq!(split.length(), records_per_split * rl);
                prop_assert_eq!((split.start() - hl) % rl, 0);
            }
            let last = splits.last().unwrap();
            prop_assert_eq!((last.start() - hl) % rl, 0);
            prop_assert!(last.length() as f64 / (records_per_split * rl) as f64 <= slop);

            let slots: u64 = splits.iter().map(|s| s.record_slots()).sum();
            prop_assert_eq!(slots, records);
        }
    }
}
