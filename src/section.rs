//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The four section payload codecs: Item, Time, Content, NameValue.
//!
//! Each function here reads or writes exactly one section's payload, nothing
//! more. `header` is responsible for framing: writing the section id and
//! byte length around a payload, and for bounding a read to the declared
//! length so an unknown or malformed section cannot run into its neighbors.
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, classes `_ItemSectionFormatter`,
//!    `_TimeSectionFormatter`, `_ContentDescriptionFormatter`,
//!    `_NameValueSectionFormatter`.

use std::io::Cursor;

use crate::byte_codec::ByteCodec;
use crate::description::{ContentDescription, Field, ItemDescription, NameValue, NameValues, TimeScale};
use crate::error::{Error, Result};
use crate::field_type::FieldType;
use crate::formatted_codec::{FormattedReader, FormattedWriter};

/// Section id tags (spec. section 4.6).
pub const ITEM_SECTION_ID: i32 = 0x0A;
pub const TIME_SECTION_ID: i32 = 0x40;
pub const CONTENT_SECTION_ID: i32 = 0x80;
pub const NAME_VALUE_SECTION_ID: i32 = 0x81;

fn writer_codec() -> ByteCodec<Cursor<Vec<u8>>> {
    ByteCodec::new(Cursor::new(Vec::new()))
}

fn into_bytes(codec: ByteCodec<Cursor<Vec<u8>>>) -> Vec<u8> {
    codec.into_inner().into_inner()
}

fn reader_codec(bytes: &[u8]) -> ByteCodec<Cursor<&[u8]>> {
    ByteCodec::new(Cursor::new(bytes))
}

/// Serializes the Item section payload: item name, item size, then each
/// field's type tag, offset and name, in declaration order.
pub fn write_item_section(item: &ItemDescription) -> Result<Vec<u8>> {
    let mut codec = writer_codec();
    {
        let mut writer = FormattedWriter::new(&mut codec);
        writer.write_text(&item.item_name)?;
    }
    codec.write_i32(item.item_size as i32)?;
    codec.write_i32(item.fields.len() as i32)?;
    for field in &item.fields {
        codec.write_i32(field.field_type.tag())?;
        codec.write_i32(field.offset as i32)?;
        let mut writer = FormattedWriter::new(&mut codec);
        writer.write_text(&field.name)?;
    }
    Ok(into_bytes(codec))
}

/// Parses an Item section payload. Time-field flags are left false here;
/// `header::read_header` fills them in from the Time section afterwards,
/// matching the reference's read-time asymmetry (spec. section 9, Open
/// Question (ii)).
pub fn read_item_section(bytes: &[u8]) -> Result<ItemDescription> {
    let mut codec = reader_codec(bytes);
    let item_name = {
        let mut reader = FormattedReader::new(&mut codec);
        reader.read_text()?
    };
    let item_size = codec.read_i32()? as usize;
    let field_count = codec.read_i32()?;
    if field_count < 0 {
        return Err(Error::InvalidFieldType(field_count));
    }
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let field_type = FieldType::from_tag(codec.read_i32()?)?;
        let offset = codec.read_i32()? as usize;
        let name = {
            let mut reader = FormattedReader::new(&mut codec);
            reader.read_text()?
        };
        fields.push(Field {
            name,
            field_type,
            offset,
            is_time: false,
        });
    }
    Ok(ItemDescription {
        item_name,
        fields,
        item_size,
    })
}

/// Serializes the Content section payload: a single length-prefixed string.
pub fn write_content_section(content: &ContentDescription) -> Result<Vec<u8>> {
    let mut codec = writer_codec();
    {
        let mut writer = FormattedWriter::new(&mut codec);
        writer.write_text(content)?;
    }
    Ok(into_bytes(codec))
}

pub fn read_content_section(bytes: &[u8]) -> Result<ContentDescription> {
    let mut codec = reader_codec(bytes);
    let mut reader = FormattedReader::new(&mut codec);
    reader.read_text()
}

/// Serializes the NameValue section payload: a count, then that many
/// name/value records in insertion order.
pub fn write_name_value_section(name_values: &NameValues) -> Result<Vec<u8>> {
    let mut codec = writer_codec();
    codec.write_i32(name_values.len() as i32)?;
    for (name, value) in name_values.iter() {
        let mut writer = FormattedWriter::new(&mut codec);
        writer.write_name_value(name, value)?;
    }
    Ok(into_bytes(codec))
}

pub fn read_name_value_section(bytes: &[u8]) -> Result<NameValues> {
    let mut codec = reader_codec(bytes);
    let count = codec.read_i32()?;
    if count < 0 {
        return Err(Error::SectionOverrun {
            section_id: NAME_VALUE_SECTION_ID,
            declared: bytes.len(),
            consumed: 0,
        });
    }
    let mut name_values = NameValues::new();
    for _ in 0..count {
        let (name, value) = {
            let mut reader = FormattedReader::new(&mut codec);
            reader.read_name_value()?
        };
        name_values.insert(name, value);
    }
    Ok(name_values)
}

/// Serializes the Time section payload: the time scale's epoch and
/// ticks/day, then a count of time-flagged fields and that many item-area
/// byte offsets (the first is the event-time field). The reference always
/// writes this section, even with a field count of zero, once a time scale
/// is configured (spec. section 9, Open Question (ii)); this crate preserves
/// that behavior in `TeaFile::create`.
pub fn write_time_section(time_scale: TimeScale, fields: &[Field]) -> Result<Vec<u8>> {
    let offsets: Vec<i32> = fields
        .iter()
        .filter(|f| f.is_time)
        .map(|f| f.offset as i32)
        .collect();
    let mut codec = writer_codec();
    codec.write_i64(time_scale.epoch_days)?;
    codec.write_i64(time_scale.ticks_per_day)?;
    codec.write_i32(offsets.len() as i32)?;
    for offset in offsets {
        codec.write_i32(offset)?;
    }
    Ok(into_bytes(codec))
}

/// Parses a Time section payload into its time scale and the list of
/// item-area byte offsets it names. The caller matches the offsets back
/// against the Item section's fields.
pub fn read_time_section(bytes: &[u8]) -> Result<(TimeScale, Vec<i32>)> {
    let mut codec = reader_codec(bytes);
    let epoch_days = codec.read_i64()?;
    let ticks_per_day = codec.read_i64()?;
    let count = codec.read_i32()?;
    if count < 0 {
        return Err(Error::SectionOverrun {
            section_id: TIME_SECTION_ID,
            declared: bytes.len(),
            consumed: 0,
        });
    }
    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        offsets.push(codec.read_i32()?);
    }
    let time_scale = TimeScale { epoch_days, ticks_per_day };
    Ok((time_scale, offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{Field, NameValue};
    use crate::field_type::FieldType;

    fn sample_item() -> ItemDescription {
        ItemDescription {
            item_name: "Tick".to_string(),
            fields: vec![
                Field { name: "time".into(), field_type: FieldType::Int64, offset: 0, is_time: true },
                Field { name: "price".into(), field_type: FieldType::Float64, offset: 8, is_time: false },
            ],
            item_size: 16,
        }
    }

    #[test]
    fn test_item_section_round_trip() {
        let item = sample_item();
        let payload = write_item_section(&item).unwrap();
        let parsed = read_item_section(&payload).unwrap();
        assert_eq!(parsed.item_name, item.item_name);
        assert_eq!(parsed.item_size, item.item_size);
        assert_eq!(parsed.fields.len(), item.fields.len());
        assert_eq!(parsed.fields[0].offset, 0);
        assert_eq!(parsed.fields[1].offset, 8);
    }

    #[test]
    fn test_content_section_round_trip() {
        let payload = write_content_section(&"ACME daily ticks".to_string()).unwrap();
        assert_eq!(read_content_section(&payload).unwrap(), "ACME daily ticks");
    }

    #[test]
    fn test_name_value_section_round_trip() {
        let mut nvs = NameValues::new();
        nvs.insert("decimals", NameValue::Int32(2));
        nvs.insert("provider", NameValue::Text("acme".into()));
        let payload = write_name_value_section(&nvs).unwrap();
        let parsed = read_name_value_section(&payload).unwrap();
        assert_eq!(parsed.decimals(), Some(2));
        assert_eq!(parsed.get("provider"), Some(&NameValue::Text("acme".into())));
    }

    #[test]
    fn test_time_section_round_trip_with_time_field() {
        let item = sample_item();
        let payload = write_time_section(TimeScale::JAVA, &item.fields).unwrap();
        let (time_scale, offsets) = read_time_section(&payload).unwrap();
        assert_eq!(offsets, vec![0]);
        assert_eq!(time_scale, TimeScale::JAVA);
    }

    #[test]
    fn test_time_section_round_trip_with_no_time_fields() {
        let fields = vec![Field { name: "x".into(), field_type: FieldType::Int32, offset: 0, is_time: false }];
        let payload = write_time_section(TimeScale::NET, &fields).unwrap();
        let (time_scale, offsets) = read_time_section(&payload).unwrap();
        assert!(offsets.is_empty());
        assert_eq!(time_scale, TimeScale::NET);
    }
}
