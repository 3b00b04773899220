//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Header assembly and parsing.
//!
//! A TeaFile header is: an 8-byte byte-order-mark, the absolute byte offset
//! where the item area starts, the absolute byte offset where it ends (0
//! meaning "grows with the file"), a section count, that many
//! id-prefixed/length-prefixed sections, and zero-padding out to the item
//! area start.
//!
//! Section payloads are built into memory first so their lengths are known
//! before the section count and the item area start are written; both
//! values are then written once, already correct, rather than being
//! back-patched after the fact with a second seek (spec. section 4.7's
//! header-assembly design note).
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, class `_HeaderManager`, in
//!    particular `createsections`, `writeheader` and `readheader`.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use log::debug;

use crate::byte_codec::ByteCodec;
use crate::description::{Field, ItemDescription, NameValues, TeaFileDescription, TimeScale};
use crate::error::{Error, Result};
use crate::section;

/// The fixed byte-order-mark every TeaFile starts with.
pub const BOM: u64 = 0x0D0E0A0402080500;

const PAD_ALIGNMENT: u64 = 8;

struct RawSection {
    id: i32,
    payload: Vec<u8>,
}

fn build_sections(description: &TeaFileDescription) -> Result<Vec<RawSection>> {
    let mut sections = Vec::new();

    sections.push(RawSection {
        id: section::ITEM_SECTION_ID,
        payload: section::write_item_section(&description.item_description)?,
    });

    if let Some(content) = &description.content_description {
        sections.push(RawSection {
            id: section::CONTENT_SECTION_ID,
            payload: section::write_content_section(content)?,
        });
    }

    if !description.name_values.is_empty() {
        sections.push(RawSection {
            id: section::NAME_VALUE_SECTION_ID,
            payload: section::write_name_value_section(&description.name_values)?,
        });
    }

    if let Some(time_scale) = description.time_scale {
        sections.push(RawSection {
            id: section::TIME_SECTION_ID,
            payload: section::write_time_section(time_scale, &description.item_description.fields)?,
        });
    }

    Ok(sections)
}

/// Writes a complete header to `stream`, positioned at offset 0, and leaves
/// the stream positioned at the start of the item area. Returns the absolute
/// byte offset the item area starts at.
pub fn write_header<S: Write + Seek>(stream: &mut S, description: &TeaFileDescription) -> Result<u64> {
    let sections = build_sections(description)?;

    let raw_len: u64 = 8 // BOM
        + 8 // item area start
        + 8 // item area end
        + 8 // section count
        + sections
            .iter()
            .map(|s| 4 + 4 + s.payload.len() as u64)
            .sum::<u64>();

    let padding = (PAD_ALIGNMENT - (raw_len % PAD_ALIGNMENT)) % PAD_ALIGNMENT;
    let item_area_start = raw_len + padding;

    let mut codec = ByteCodec::new(stream);
    codec.write_u64(BOM)?;
    codec.write_i64(item_area_start as i64)?;
    codec.write_i64(0)?; // unbounded; grows with the file until closed
    codec.write_i64(sections.len() as i64)?;
    for raw in &sections {
        codec.write_i32(raw.id)?;
        codec.write_i32(raw.payload.len() as i32)?;
        codec.write_bytes(&raw.payload)?;
    }
    if padding > 0 {
        codec.write_bytes(&vec![0u8; padding as usize])?;
    }

    Ok(item_area_start)
}

/// Reads a complete header starting at the stream's current position
/// (offset 0), and leaves the stream positioned at the start of the item
/// area. Returns the parsed description together with the item area's
/// absolute start and end offsets (`None` for an end that was written as
/// "grows with the file").
pub fn read_header<S: Read + Seek>(stream: &mut S) -> Result<(TeaFileDescription, u64, Option<u64>)> {
    let mut codec = ByteCodec::new(stream);

    let bom = codec.read_u64()?;
    if bom != BOM {
        return Err(Error::InvalidHeader);
    }

    let item_area_start = codec.read_i64()? as u64;
    let item_area_end_raw = codec.read_i64()?;
    let item_area_end = if item_area_end_raw == 0 {
        None
    } else {
        Some(item_area_end_raw as u64)
    };

    let section_count = codec.read_i64()?;
    if section_count < 0 {
        return Err(Error::InvalidHeader);
    }

    let known_ids = [
        section::ITEM_SECTION_ID,
        section::TIME_SECTION_ID,
        section::CONTENT_SECTION_ID,
        section::NAME_VALUE_SECTION_ID,
    ];

    let mut payloads: HashMap<i32, Vec<u8>> = HashMap::new();
    for _ in 0..section_count {
        let id = codec.read_i32()?;
        let declared = codec.read_i32()?;
        if declared < 0 {
            return Err(Error::InvalidHeader);
        }
        let payload = codec.read_bytes(declared as usize)?;
        if !known_ids.contains(&id) {
            debug!("skipping unknown section 0x{:02X}, {} payload byte(s)", id, declared);
        }
        payloads.insert(id, payload);
    }

    let mut item_description = match payloads.get(&section::ITEM_SECTION_ID) {
        Some(bytes) => section::read_item_section(bytes)?,
        None => ItemDescription {
            item_name: String::new(),
            fields: Vec::new(),
            item_size: 0,
        },
    };

    let time_scale = if let Some(bytes) = payloads.get(&section::TIME_SECTION_ID) {
        let (time_scale, offsets) = section::read_time_section(bytes)?;
        apply_time_offsets(&mut item_description.fields, &offsets)?;
        Some(time_scale)
    } else {
        None
    };

    let content_description = match payloads.get(&section::CONTENT_SECTION_ID) {
        Some(bytes) => Some(section::read_content_section(bytes)?),
        None => None,
    };

    let name_values = match payloads.get(&section::NAME_VALUE_SECTION_ID) {
        Some(bytes) => section::read_name_value_section(bytes)?,
        None => NameValues::new(),
    };

    codec.seek_to(item_area_start)?;

    let description = TeaFileDescription {
        item_description,
        content_description,
        name_values,
        time_scale,
    };

    Ok((description, item_area_start, item_area_end))
}

fn apply_time_offsets(fields: &mut [Field], offsets: &[i32]) -> Result<()> {
    for offset in offsets {
        let field = fields.iter_mut().find(|f| f.offset as i32 == *offset);
        match field {
            Some(field) => field.is_time = true,
            None => return Err(Error::InvalidTimeFieldOffset(*offset)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{ContentDescription, Field, NameValue};
    use crate::field_type::FieldType;
    use std::io::Cursor;

    fn sample_description() -> TeaFileDescription {
        TeaFileDescription {
            item_description: ItemDescription {
                item_name: "Tick".to_string(),
                fields: vec![
                    Field { name: "time".into(), field_type: FieldType::Int64, offset: 0, is_time: true },
                    Field { name: "price".into(), field_type: FieldType::Float64, offset: 8, is_time: false },
                ],
                item_size: 16,
            },
            content_description: Some("ACME daily ticks".to_string() as ContentDescription),
            name_values: {
                let mut nvs = NameValues::new();
                nvs.insert("decimals", NameValue::Int32(2));
                nvs
            },
            time_scale: Some(TimeScale::JAVA),
        }
    }

    #[test]
    fn test_header_round_trip() {
        let description = sample_description();
        let mut buffer = Cursor::new(Vec::new());
        let item_area_start = write_header(&mut buffer, &description).unwrap();

        buffer.set_position(0);
        let (parsed, parsed_start, parsed_end) = read_header(&mut buffer).unwrap();

        assert_eq!(parsed_start, item_area_start);
        assert_eq!(parsed_end, None);
        assert_eq!(parsed.item_description.item_name, "Tick");
        assert_eq!(parsed.item_description.fields[0].is_time, true);
        assert_eq!(parsed.item_description.fields[1].is_time, false);
        assert_eq!(parsed.content_description, description.content_description);
        assert_eq!(parsed.name_values.decimals(), Some(2));
        assert_eq!(parsed.time_scale, Some(TimeScale::JAVA));
    }

    #[test]
    fn test_item_area_start_is_eight_byte_aligned() {
        let description = sample_description();
        let mut buffer = Cursor::new(Vec::new());
        let item_area_start = write_header(&mut buffer, &description).unwrap();
        assert_eq!(item_area_start % 8, 0);
    }

    #[test]
    fn test_wrong_bom_is_invalid_header() {
        let mut buffer = Cursor::new(vec![0u8; 64]);
        let err = read_header(&mut buffer).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader));
    }

    #[test]
    fn test_unknown_section_is_skipped_forward_compatibly() {
        let description = sample_description();
        let mut buffer = Cursor::new(Vec::new());
        write_header(&mut buffer, &description).unwrap();
        let mut bytes = buffer.into_inner();

        // Splice an unknown section (id 0xFF, 4-byte payload) in front of
        // the section list and bump the section count and offsets by hand,
        // to prove forward-compatible readers skip bytes they don't
        // recognize instead of failing.
        let mut codec = ByteCodec::new(Cursor::new(&mut bytes[..]));
        let _bom = codec.read_u64().unwrap();
        let old_start = codec.read_i64().unwrap();
        let _old_end = codec.read_i64().unwrap();
        let old_count = codec.read_i64().unwrap();
        drop(codec);

        let mut spliced = Vec::new();
        spliced.extend_from_slice(&BOM.to_le_bytes());
        spliced.extend_from_slice(&(old_start + 12).to_le_bytes());
        spliced.extend_from_slice(&0i64.to_le_bytes());
        spliced.extend_from_slice(&(old_count + 1).to_le_bytes());
        spliced.extend_from_slice(&0xFFi32.to_le_bytes());
        spliced.extend_from_slice(&4i32.to_le_bytes());
        spliced.extend_from_slice(&[0u8; 4]);
        spliced.extend_from_slice(&bytes[32..]);

        let mut cursor = Cursor::new(spliced);
        let (parsed, _, _) = read_header(&mut cursor).unwrap();
        assert_eq!(parsed.item_description.item_name, "Tick");
    }
}
