//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Length-prefixed text, UUIDs and name/value pairs.
//!
//! `FormattedCodec` builds on `ByteCodec` to provide the composite encodings
//! TeaFile headers use: length-prefixed UTF-8 text, raw 16-byte UUIDs, and
//! the tagged `NameValue` record.
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, classes `_FormattedReader` and
//!    `_FormattedWriter`.

use std::convert::TryFrom;
use std::io::{Read, Seek, Write};

use ordered_float::OrderedFloat;

use crate::byte_codec::ByteCodec;
use crate::error::{Error, Result};
use crate::description::NameValue;

/// The `kind` tag distinguishing a NameValue's payload (spec. section 4.2).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NameValueKind {
    Int32 = 1,
    Float64 = 2,
    Text = 3,
    Uuid = 4,
}

impl NameValueKind {
    pub fn from_tag(tag: i32) -> Result<NameValueKind> {
        match tag {
            1 => Ok(NameValueKind::Int32),
            2 => Ok(NameValueKind::Float64),
            3 => Ok(NameValueKind::Text),
            4 => Ok(NameValueKind::Uuid),
            other => Err(Error::UnknownNameValueKind(other)),
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    fn of(value: &NameValue) -> NameValueKind {
        match value {
            NameValue::Int32(_) => NameValueKind::Int32,
            NameValue::Float64(_) => NameValueKind::Float64,
            NameValue::Text(_) => NameValueKind::Text,
            NameValue::Uuid(_) => NameValueKind::Uuid,
        }
    }
}

/// Formatted reads built on top of `ByteCodec`.
pub struct FormattedReader<'a, S> {
    codec: &'a mut ByteCodec<S>,
}

impl<'a, S: Read> FormattedReader<'a, S> {
    pub fn new(codec: &'a mut ByteCodec<S>) -> Self {
        FormattedReader { codec }
    }

    /// Reads an Int32 byte count followed by that many raw bytes.
    pub fn read_bytes_length_prefixed(&mut self) -> Result<Vec<u8>> {
        let len = self.codec.read_i32()?;
        let len = usize::try_from(len).map_err(|_| Error::InvalidEncoding)?;
        self.codec.read_bytes(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_text(&mut self) -> Result<String> {
        let bytes = self.read_bytes_length_prefixed()?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidEncoding)
    }

    /// Reads a raw 16-byte UUID blob.
    pub fn read_uuid_bytes(&mut self) -> Result<[u8; 16]> {
        let bytes = self.codec.read_bytes(16)?;
        let mut array = [0u8; 16];
        array.copy_from_slice(&bytes);
        Ok(array)
    }

    /// Reads one name/value record: a text key, an Int32 kind tag, then the
    /// payload matching that kind.
    pub fn read_name_value(&mut self) -> Result<(String, NameValue)> {
        let name = self.read_text()?;
        let kind = NameValueKind::from_tag(self.codec.read_i32()?)?;
        let value = match kind {
            NameValueKind::Int32 => NameValue::Int32(self.codec.read_i32()?),
            NameValueKind::Float64 => NameValue::Float64(OrderedFloat::from(self.codec.read_f64()?)),
            NameValueKind::Text => NameValue::Text(self.read_text()?),
            NameValueKind::Uuid => NameValue::Uuid(self.read_uuid_bytes()?),
        };
        Ok((name, value))
    }
}

/// Formatted writes built on top of `ByteCodec`.
pub struct FormattedWriter<'a, S> {
    codec: &'a mut ByteCodec<S>,
}

impl<'a, S: Write> FormattedWriter<'a, S> {
    pub fn new(codec: &'a mut ByteCodec<S>) -> Self {
        FormattedWriter { codec }
    }

    pub fn write_bytes_length_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        self.codec.write_i32(bytes.len() as i32)?;
        self.codec.write_bytes(bytes)
    }

    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_bytes_length_prefixed(text.as_bytes())
    }

    pub fn write_uuid_bytes(&mut self, bytes: &[u8; 16]) -> Result<()> {
        self.codec.write_bytes(bytes)
    }

    pub fn write_name_value(&mut self, name: &str, value: &NameValue) -> Result<()> {
        self.write_text(name)?;
        self.codec.write_i32(NameValueKind::of(value).tag())?;
        match value {
            NameValue::Int32(v) => self.codec.write_i32(*v)?,
            NameValue::Float64(v) => self.codec.write_f64(v.into_inner())?,
            NameValue::Text(v) => self.write_text(v)?,
            NameValue::Uuid(bytes) => self.write_uuid_bytes(bytes)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip<S: Read + Write + Seek>(mut codec: ByteCodec<S>, nv: &(String, NameValue)) -> (String, NameValue) {
        {
            let mut writer = FormattedWriter::new(&mut codec);
            writer.write_name_value(&nv.0, &nv.1).unwrap();
        }
        codec.seek_to(0).unwrap();
        let mut reader = FormattedReader::new(&mut codec);
        reader.read_name_value().unwrap()
    }

    #[test]
    fn test_text_round_trip() {
        let mut codec = ByteCodec::new(Cursor::new(Vec::new()));
        {
            let mut writer = FormattedWriter::new(&mut codec);
            writer.write_text("ACME stock").unwrap();
        }
        codec.seek_to(0).unwrap();
        let mut reader = FormattedReader::new(&mut codec);
        assert_eq!(reader.read_text().unwrap(), "ACME stock");
    }

    #[test]
    fn test_name_value_int32_round_trip() {
        let codec = ByteCodec::new(Cursor::new(Vec::new()));
        let (name, value) = roundtrip(codec, &("decimals".to_string(), NameValue::Int32(3)));
        assert_eq!(name, "decimals");
        assert_eq!(value, NameValue::Int32(3));
    }

    #[test]
    fn test_name_value_uuid_round_trip() {
        let codec = ByteCodec::new(Cursor::new(Vec::new()));
        let bytes = [7u8; 16];
        let (name, value) = roundtrip(codec, &("id".to_string(), NameValue::Uuid(bytes)));
        assert_eq!(name, "id");
        assert_eq!(value, NameValue::Uuid(bytes));
    }

    #[test]
    fn test_invalid_utf8_is_invalid_encoding() {
        let mut codec = ByteCodec::new(Cursor::new(Vec::new()));
        codec.write_i32(1).unwrap();
        codec.write_bytes(&[0xFF]).unwrap();
        codec.seek_to(0).unwrap();
        let mut reader = FormattedReader::new(&mut codec);
        assert!(matches!(reader.read_text(), Err(Error::InvalidEncoding)));
    }
}
