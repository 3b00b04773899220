//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Fixed-width little-endian scalar I/O.
//!
//! `ByteCodec` wraps any stream and reads or writes the fixed-width integers,
//! doubles and raw byte runs that make up a TeaFile header and item area.
//! Every multi-byte value is little-endian on disk regardless of host
//! byte order.
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, class `_FileIO`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// Reads and writes fixed-width little-endian values on an underlying stream.
#[derive(Debug)]
pub struct ByteCodec<S> {
    stream: S,
}

impl<S> ByteCodec<S> {
    /// Wraps `stream` in a codec.
    pub fn new(stream: S) -> Self {
        ByteCodec { stream }
    }

    /// Consumes the codec, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Borrows the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S: Read> ByteCodec<S> {
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.stream.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.stream.read_u32::<LittleEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.stream.read_i64::<LittleEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.stream.read_u64::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.stream.read_f64::<LittleEndian>()?)
    }

    /// Reads exactly `n` bytes, failing with a truncated-file error if fewer are available.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; n];
        self.stream.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Skips `n` bytes forward without interpreting them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        let mut scratch = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.stream.read_exact(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

impl<S: Write> ByteCodec<S> {
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.stream.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.stream.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.stream.write_i64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.stream.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.stream.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }
}

impl<S: Seek> ByteCodec<S> {
    /// Returns the current absolute position of the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.seek(SeekFrom::Current(0))?)
    }

    /// Sets the absolute position of the stream.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ByteCodec;
    use std::io::Cursor;

    #[test]
    fn test_round_trip_scalars() {
        let mut codec = ByteCodec::new(Cursor::new(Vec::new()));
        codec.write_i32(-7).unwrap();
        codec.write_i64(-70_000_000_000).unwrap();
        codec.write_u64(0x0D0E0A0402080500).unwrap();
        codec.write_f64(core::f64::consts::PI).unwrap();
        codec.write_bytes(&[1, 2, 3]).unwrap();

        let mut codec = ByteCodec::new(Cursor::new(codec.into_inner().into_inner()));
        assert_eq!(codec.read_i32().unwrap(), -7);
        assert_eq!(codec.read_i64().unwrap(), -70_000_000_000);
        assert_eq!(codec.read_u64().unwrap(), 0x0D0E0A0402080500);
        assert_eq!(codec.read_f64().unwrap(), core::f64::consts::PI);
        assert_eq!(codec.read_bytes(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_little_endian_byte_order() {
        let mut codec = ByteCodec::new(Cursor::new(Vec::new()));
        codec.write_i32(0x01020304).unwrap();
        let bytes = codec.into_inner().into_inner();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_short_read_is_truncated_file() {
        let mut codec = ByteCodec::new(Cursor::new(vec![0x01, 0x02]));
        let err = codec.read_i32().unwrap_err();
        assert!(matches!(err, crate::error::Error::TruncatedFile));
    }

    #[test]
    fn test_skip_advances_position() {
        let mut codec = ByteCodec::new(Cursor::new(vec![0u8; 16]));
        codec.skip(5).unwrap();
        assert_eq!(codec.position().unwrap(), 5);
    }
}
