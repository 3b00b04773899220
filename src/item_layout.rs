//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Native struct-alignment offset computation and item pack/unpack.
//!
//! TeaFile items are laid out the way a C compiler lays out a `struct`: each
//! field starts at the next offset that is a multiple of its own size, and
//! the item's overall size is padded up to the widest field's alignment.
//! This crate computes that placement directly; the reference implementation
//! arrives at the same layout by packing a probe struct and observing where
//! per-type magic values land (spec. section 4.4's design note; cross-checked
//! by a test in `field_type`).
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, function `_analyzefieldoffsets`.

use crate::description::Field;
use crate::error::{Error, Result};
use crate::field_type::{FieldType, FieldValue};

/// Computes offsets for a sequence of fields in declaration order, following
/// native struct alignment, and returns the fields with `offset` filled in
/// along with the item's total (padded) size.
///
/// `types` defaults every field to `FieldType::Int64` when `None` (spec.
/// section 4.4's "Default format"). The sole event-time field is detected
/// automatically: the first field whose name equals "time" case-insensitively
/// is flagged, exactly as the reference's `TeaFile.create` does unconditionally
/// (spec. section 4.7) — there is no caller-supplied override.
pub fn layout_fields(names: &[String], types: Option<&[FieldType]>) -> Result<(Vec<Field>, usize)> {
    let owned_default;
    let types: &[FieldType] = match types {
        Some(types) => types,
        None => {
            owned_default = vec![FieldType::Int64; names.len()];
            &owned_default
        }
    };

    if names.len() != types.len() {
        return Err(Error::FieldCountMismatch {
            names: names.len(),
            format: types.len(),
        });
    }

    let time_field_index = names.iter().position(|n| n.eq_ignore_ascii_case("time"));

    let mut fields = Vec::with_capacity(names.len());
    let mut cursor = 0usize;
    let mut max_align = 1usize;

    for (i, (name, field_type)) in names.iter().zip(types.iter().copied()).enumerate() {
        let size = field_type.size();
        max_align = max_align.max(size);
        let offset = align_up(cursor, size);
        fields.push(Field {
            name: name.clone(),
            field_type,
            offset,
            is_time: time_field_index == Some(i),
        });
        cursor = offset + size;
    }

    let item_size = align_up(cursor, max_align);
    Ok((fields, item_size))
}

fn align_up(offset: usize, align: usize) -> usize {
    if align == 0 {
        return offset;
    }
    let remainder = offset % align;
    if remainder == 0 {
        offset
    } else {
        offset + (align - remainder)
    }
}

/// Packs one item's values into a fixed-size byte buffer per `fields`'
/// offsets, little-endian, zero-filling any inter-field padding.
pub fn pack_item(fields: &[Field], item_size: usize, values: &[FieldValue]) -> Result<Vec<u8>> {
    if values.len() != fields.len() {
        return Err(Error::ArityMismatch {
            expected: fields.len(),
            got: values.len(),
        });
    }
    let mut buffer = vec![0u8; item_size];
    for (field, value) in fields.iter().zip(values.iter()) {
        let start = field.offset;
        let end = start + field.size();
        write_scalar(&mut buffer[start..end], value)?;
    }
    Ok(buffer)
}

/// Unpacks one item's values out of a fixed-size byte buffer per `fields`'
/// offsets.
pub fn unpack_item(fields: &[Field], buffer: &[u8]) -> Result<Vec<FieldValue>> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let start = field.offset;
        let end = start + field.size();
        if end > buffer.len() {
            return Err(Error::SectionOverrun {
                section_id: 0x0A,
                declared: buffer.len(),
                consumed: end,
            });
        }
        values.push(read_scalar(field.field_type, &buffer[start..end]));
    }
    Ok(values)
}

fn write_scalar(slot: &mut [u8], value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Int8(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Int16(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Int32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Int64(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::UInt8(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::UInt16(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::UInt32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::UInt64(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Float32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Float64(v) => slot.copy_from_slice(&v.to_le_bytes()),
    }
    Ok(())
}

fn read_scalar(field_type: FieldType, bytes: &[u8]) -> FieldValue {
    match field_type {
        FieldType::Int8 => FieldValue::Int8(bytes[0] as i8),
        FieldType::Int16 => FieldValue::Int16(i16::from_le_bytes([bytes[0], bytes[1]])),
        FieldType::Int32 => FieldValue::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        FieldType::Int64 => {
            let mut a = [0u8; 8];
            a.copy_from_slice(bytes);
            FieldValue::Int64(i64::from_le_bytes(a))
        }
        FieldType::UInt8 => FieldValue::UInt8(bytes[0]),
        FieldType::UInt16 => FieldValue::UInt16(u16::from_le_bytes([bytes[0], bytes[1]])),
        FieldType::UInt32 => FieldValue::UInt32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        FieldType::UInt64 => {
            let mut a = [0u8; 8];
            a.copy_from_slice(bytes);
            FieldValue::UInt64(u64::from_le_bytes(a))
        }
        FieldType::Float32 => FieldValue::Float32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        FieldType::Float64 => {
            let mut a = [0u8; 8];
            a.copy_from_slice(bytes);
            FieldValue::Float64(f64::from_le_bytes(a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_qdq_matches_native_alignment() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let types = vec![FieldType::Int64, FieldType::Float64, FieldType::Int64];
        let (fields, item_size) = layout_fields(&names, Some(&types)).unwrap();
        let offsets: Vec<usize> = fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(item_size, 24);
    }

    #[test]
    fn test_layout_inserts_padding_for_mixed_widths() {
        // byte, then int32: int32 must start at offset 4, not 1.
        let names = vec!["flag".to_string(), "value".to_string()];
        let types = vec![FieldType::Int8, FieldType::Int32];
        let (fields, item_size) = layout_fields(&names, Some(&types)).unwrap();
        assert_eq!(fields[0].offset, 0);
        assert_eq!(fields[1].offset, 4);
        assert_eq!(item_size, 8);
    }

    #[test]
    fn test_layout_flags_time_field_case_insensitively() {
        let names = vec!["Time".to_string(), "price".to_string()];
        let types = vec![FieldType::Int64, FieldType::Float64];
        let (fields, _) = layout_fields(&names, Some(&types)).unwrap();
        assert!(fields[0].is_time);
        assert!(!fields[1].is_time);
    }

    #[test]
    fn test_layout_defaults_every_field_to_int64_when_types_omitted() {
        let names = vec!["a".to_string(), "b".to_string()];
        let (fields, item_size) = layout_fields(&names, None).unwrap();
        assert!(fields.iter().all(|f| f.field_type == FieldType::Int64));
        assert_eq!(item_size, 16);
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let names = vec!["time".to_string(), "price".to_string(), "volume".to_string()];
        let types = vec![FieldType::Int64, FieldType::Float64, FieldType::Int32];
        let (fields, item_size) = layout_fields(&names, Some(&types)).unwrap();
        let values = vec![
            FieldValue::Int64(1_700_000_000_000),
            FieldValue::Float64(101.25),
            FieldValue::Int32(500),
        ];
        let buffer = pack_item(&fields, item_size, &values).unwrap();
        assert_eq!(buffer.len(), item_size);
        let unpacked = unpack_item(&fields, &buffer).unwrap();
        assert_eq!(unpacked, values);
    }

    #[test]
    fn test_pack_rejects_arity_mismatch() {
        let names = vec!["x".to_string()];
        let types = vec![FieldType::Int32];
        let (fields, item_size) = layout_fields(&names, Some(&types)).unwrap();
        let err = pack_item(&fields, item_size, &[]).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 1, got: 0 }));
    }
}
