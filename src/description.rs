//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Item layout, content description and free-form name/value metadata.
//!
//! `ItemDescription` captures the fixed record layout a TeaFile carries (its
//! field names, types, offsets and the overall item size). `NameValues` is an
//! insertion-order-preserving bag of scalar metadata, the free-form sibling of
//! the two typed descriptions. `TeaFileDescription` bundles everything a
//! header round-trips.
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, classes `ItemDescription`,
//!    `Field`, `TimeScale` and `TeaFileDescription`.

use std::fmt::{self, Display};

use ascii::AsciiStr;
use ordered_float::OrderedFloat;

use crate::error::{Error, Result};
use crate::field_type::FieldType;

/// One field of an item: its name, type, and byte offset within the item.
#[derive(Clone, PartialEq, Debug)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub offset: usize,
    /// True for the field the Time section designates as the event-time field.
    pub is_time: bool,
}

impl Field {
    pub fn size(&self) -> usize {
        self.field_type.size()
    }
}

/// Describes the fixed-size record an item area is built from.
#[derive(Clone, PartialEq, Debug)]
pub struct ItemDescription {
    /// The name given to the item type, e.g. "Tick". Falls back to a
    /// generated name (spec. section 4.3's "default item name" rule) when
    /// the caller does not supply one.
    pub item_name: String,
    pub fields: Vec<Field>,
    pub item_size: usize,
}

impl ItemDescription {
    /// The name used when the caller does not provide an explicit item name:
    /// the first character of each field name, concatenated in order (spec.
    /// section 4.4's "Default item name" rule).
    pub fn default_item_name(fields: &[Field]) -> String {
        let joined: String = fields
            .iter()
            .filter_map(|f| f.name.chars().next())
            .collect();
        sanitize_name(&joined)
    }

    /// The index, if any, of the field flagged as the event-time field.
    pub fn time_field_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.is_time)
    }
}

impl Display for ItemDescription {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{} {{ ", self.item_name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{}: {:?}@{}", field.name, field.field_type, field.offset)?;
        }
        formatter.write_str(" }")
    }
}

/// Sanitizes an arbitrary string into the `[A-Za-z0-9_]` alphabet the
/// reference implementation's `_getsafename` restricts identifiers to,
/// replacing every other character with an underscore.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| match AsciiStr::from_ascii(c.to_string().as_bytes()) {
            Ok(_) if c.is_ascii_alphanumeric() || c == '_' => c,
            _ => '_',
        })
        .collect()
}

/// A single scalar of free-form metadata (spec. section 4.2's `NameValue`).
#[derive(Clone, PartialEq, Debug)]
pub enum NameValue {
    Int32(i32),
    Float64(OrderedFloat<f64>),
    Text(String),
    Uuid([u8; 16]),
}

impl NameValue {
    #[cfg(feature = "uuid-namevalues")]
    pub fn from_uuid(uuid: uuid::Uuid) -> NameValue {
        NameValue::Uuid(*uuid.as_bytes())
    }

    #[cfg(feature = "uuid-namevalues")]
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            NameValue::Uuid(bytes) => Some(uuid::Uuid::from_bytes(*bytes)),
            _ => None,
        }
    }
}

impl Display for NameValue {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NameValue::Int32(v) => write!(formatter, "{}", v),
            NameValue::Float64(v) => write!(formatter, "{}", v),
            NameValue::Text(v) => write!(formatter, "{}", v),
            NameValue::Uuid(bytes) => {
                for b in bytes.iter() {
                    write!(formatter, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// An insertion-order-preserving bag of name/value metadata.
///
/// Kept as a `Vec` rather than a `HashMap` so a file's NameValue section
/// round-trips byte-for-byte: readers that re-save a file with `NameValues`
/// they did not themselves reorder must reproduce the original write order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct NameValues {
    entries: Vec<(String, NameValue)>,
}

impl NameValues {
    pub fn new() -> Self {
        NameValues { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces a value, preserving the position of an existing
    /// key and appending new keys at the end.
    pub fn insert(&mut self, name: impl Into<String>, value: NameValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&NameValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, NameValue)> {
        self.entries.iter()
    }

    /// The `decimals` convenience accessor the reference implementation
    /// exposes directly on `TeaFile` (spec. section 10.4 supplement).
    pub fn decimals(&self) -> Option<i32> {
        match self.get("decimals") {
            Some(NameValue::Int32(v)) => Some(*v),
            _ => None,
        }
    }
}

impl Display for NameValues {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// A time scale: the epoch (in days from 0001-01-01) and tick resolution
/// ticks are counted in.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TimeScale {
    pub epoch_days: i64,
    pub ticks_per_day: i64,
}

impl TimeScale {
    /// Java's epoch (1970-01-01, 719162 days after 0001-01-01) counted in
    /// milliseconds.
    pub const JAVA: TimeScale = TimeScale {
        epoch_days: 719_162,
        ticks_per_day: 86_400_000,
    };

    /// .NET's epoch (0001-01-01) counted in 100ns ticks.
    pub const NET: TimeScale = TimeScale {
        epoch_days: 0,
        ticks_per_day: 864_000_000_000,
    };
}

impl Display for TimeScale {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "epoch={} ticksperday={}", self.epoch_days, self.ticks_per_day)
    }
}

/// Free-form descriptive text about the file's contents, stored verbatim in
/// the Content section. An alias rather than a distinct type: the Content
/// section's payload is exactly one length-prefixed string (spec. section
/// 4.6).
pub type ContentDescription = String;

/// Everything a header round-trips about a file beyond the raw item bytes.
#[derive(Clone, PartialEq, Debug)]
pub struct TeaFileDescription {
    pub item_description: ItemDescription,
    pub content_description: Option<ContentDescription>,
    pub name_values: NameValues,
    pub time_scale: Option<TimeScale>,
}

impl Display for TeaFileDescription {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "item: {}", self.item_description)?;
        if let Some(content) = &self.content_description {
            writeln!(formatter, "content: {}", content)?;
        }
        if !self.name_values.is_empty() {
            writeln!(formatter, "namevalues: {}", self.name_values)?;
        }
        if let Some(time_scale) = &self.time_scale {
            writeln!(formatter, "timescale: {}", time_scale)?;
        }
        Ok(())
    }
}

/// Validates that a field format string uses only the ten known type
/// characters, with no repeat counts or byte-order/alignment prefixes (the
/// reference implementation strips `@<>=!` and digits; this crate rejects
/// them outright as stated in spec. section 4.3's boundary rules).
pub fn parse_format_string(format: &str) -> Result<Vec<FieldType>> {
    let mut types = Vec::with_capacity(format.len());
    for c in format.chars() {
        if "@<>=!".contains(c) || c.is_ascii_digit() {
            return Err(Error::InvalidFormatString(format.to_string()));
        }
        types.push(FieldType::from_format_char(c)?);
    }
    Ok(types)
}
