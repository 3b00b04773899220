//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The `TeaFile` facade.
//!
//! `TeaFile` wraps a single `std::fs::File` handle, owns its header
//! description, and exposes the external interface spec. section 6
//! describes: creating a new file, opening an existing one for reading or
//! appending, reading and writing items one at a time, seeking by item
//! index, and querying how many items the file currently holds.
//!
//! # References
//!
//! 1. `original_source/teafiles/teafile.py`, class `TeaFile`.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::description::{ContentDescription, Field, ItemDescription, NameValues, TeaFileDescription, TimeScale};
use crate::error::{Error, Result};
use crate::field_type::{FieldType, FieldValue};
use crate::header;
use crate::item_layout::{self, layout_fields};

/// One item's field values, indexable by position or by field name.
#[derive(Clone, PartialEq, Debug)]
pub struct Item {
    fields: Vec<Field>,
    values: Vec<FieldValue>,
}

impl Item {
    fn new(fields: Vec<Field>, values: Vec<FieldValue>) -> Self {
        Item { fields, values }
    }

    /// The value at position `index` in declaration order.
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// The value of the field named `name`, or `None` if no field has that name.
    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// The raw ticks in this item's event-time field, if it has one. Plain
    /// `i64`, available regardless of the `time-decoration` feature.
    pub fn time_ticks(&self) -> Option<i64> {
        self.fields
            .iter()
            .position(|f| f.is_time)
            .and_then(|i| self.values.get(i))
            .and_then(FieldValue::as_ticks)
    }

    /// The event-time field's value wrapped as a `Tick`. Only compiled in
    /// under the `time-decoration` feature; without it, callers read time
    /// fields as plain integers via `time_ticks` or `get_by_name`.
    #[cfg(feature = "time-decoration")]
    pub fn time(&self) -> Option<crate::time::Tick> {
        self.time_ticks().map(crate::time::Tick)
    }
}

/// A reader/writer handle onto one TeaFile.
pub struct TeaFile {
    file: Option<File>,
    writable: bool,
    description: TeaFileDescription,
    item_area_start: u64,
    /// The persisted item-area end (preallocation in force), if any. When
    /// set, `itemcount` derives from this rather than the live file length
    /// (spec. section 3's "File image" / section 4.8's `itemcount` contract).
    item_area_end: Option<u64>,
    /// Cached once the handle is closed, so `itemcount` keeps answering
    /// afterwards without touching a dropped file handle.
    cached_len: Option<u64>,
}

impl TeaFile {
    /// Creates a new file at `path` and writes its header. `field_types`
    /// defaults every field to `FieldType::Int64` when `None` (spec. section
    /// 4.4's "Default format"). The event-time field is detected
    /// automatically — the first field named "time", case-insensitively —
    /// matching the reference's unconditional behavior (spec. section 4.7);
    /// there is no separate parameter to choose it. `item_name` may be
    /// omitted to fall back to the default derived name (spec. section 4.4).
    /// `content_description` and `name_values` are optional metadata.
    pub fn create(
        path: impl AsRef<Path>,
        field_names: &[String],
        field_types: Option<&[FieldType]>,
        item_name: Option<String>,
        content_description: Option<ContentDescription>,
        name_values: NameValues,
    ) -> Result<TeaFile> {
        let (fields, item_size) = layout_fields(field_names, field_types)?;
        let item_name = item_name.unwrap_or_else(|| ItemDescription::default_item_name(&fields));
        let item_description = ItemDescription {
            item_name,
            fields,
            item_size,
        };

        let description = TeaFileDescription {
            item_description,
            content_description,
            name_values,
            // The reference implementation always configures Java-epoch
            // ticks on creation; a Time section is therefore always present,
            // even with zero time fields (spec. section 9, Open Question (ii)).
            time_scale: Some(TimeScale::JAVA),
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        let item_area_start = header::write_header(&mut file, &description)?;
        debug!("created teafile at {:?}, item area starts at {}", path.as_ref(), item_area_start);

        Ok(TeaFile {
            file: Some(file),
            writable: true,
            description,
            item_area_start,
            // `create` always writes itemAreaEnd = 0 (no preallocation).
            item_area_end: None,
            cached_len: None,
        })
    }

    /// Opens an existing file read-only.
    pub fn open_read(path: impl AsRef<Path>) -> Result<TeaFile> {
        TeaFile::open(path, false)
    }

    /// Opens an existing file for reading and appending.
    pub fn open_write(path: impl AsRef<Path>) -> Result<TeaFile> {
        TeaFile::open(path, true)
    }

    fn open(path: impl AsRef<Path>, writable: bool) -> Result<TeaFile> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path.as_ref())?;

        let (description, item_area_start, item_area_end) = header::read_header(&mut file)?;

        if writable {
            file.seek(SeekFrom::End(0))?;
        }

        Ok(TeaFile {
            file: Some(file),
            writable,
            description,
            item_area_start,
            item_area_end,
            cached_len: None,
        })
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }

    fn file_ref(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::Closed)
    }

    pub fn description(&self) -> &TeaFileDescription {
        &self.description
    }

    pub fn decimals(&self) -> Option<i32> {
        self.description.name_values.decimals()
    }

    fn item_size(&self) -> usize {
        self.description.item_description.item_size
    }

    /// The number of whole items currently stored in the item area:
    /// `(effective_item_area_end - item_area_start) / itemsize`, where
    /// `effective_item_area_end` is the persisted `itemAreaEnd` if
    /// preallocation is in force, else the current file size (spec. section
    /// 3, section 4.8).
    pub fn itemcount(&self) -> Result<u64> {
        let effective_end = match self.item_area_end {
            Some(end) => end,
            None => {
                let len = match self.cached_len {
                    Some(len) => len,
                    None => self.file_ref()?.metadata()?.len(),
                };
                debug!("no persisted itemAreaEnd, falling back to file size {}", len);
                len
            }
        };
        let item_size = self.item_size() as u64;
        if item_size == 0 || effective_end <= self.item_area_start {
            return Ok(0);
        }
        Ok((effective_end - self.item_area_start) / item_size)
    }

    /// Seeks so the next `read` returns the item at `index` (0-based).
    pub fn seek_item(&mut self, index: u64) -> Result<()> {
        let item_size = self.item_size() as u64;
        let offset = self.item_area_start + index * item_size;
        self.file_mut()?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Seeks to just past the last stored item, ready for `write` to append.
    pub fn seek_end(&mut self) -> Result<()> {
        let count = self.itemcount()?;
        self.seek_item(count)
    }

    /// Reads the item at the current position and advances past it. Returns
    /// `Ok(None)` at end of the item area.
    pub fn read(&mut self) -> Result<Option<Item>> {
        let item_size = self.item_size();
        let fields = self.description.item_description.fields.clone();
        let file = self.file_mut()?;

        let mut buffer = vec![0u8; item_size];
        let mut read_total = 0;
        loop {
            use std::io::Read;
            let n = file.read(&mut buffer[read_total..])?;
            if n == 0 {
                break;
            }
            read_total += n;
            if read_total == item_size {
                break;
            }
        }

        if read_total == 0 {
            return Ok(None);
        }
        if read_total != item_size {
            return Err(Error::TruncatedFile);
        }

        let values = item_layout::unpack_item(&fields, &buffer)?;
        Ok(Some(Item::new(fields, values)))
    }

    /// Writes one item's values at the current position, in field
    /// declaration order, and advances past it.
    pub fn write(&mut self, values: &[FieldValue]) -> Result<()> {
        if !self.writable {
            return Err(Error::NotWritable);
        }
        let fields = self.description.item_description.fields.clone();
        let item_size = self.item_size();
        let buffer = item_layout::pack_item(&fields, item_size, values)?;

        use std::io::Write;
        self.file_mut()?.write_all(&buffer)?;
        Ok(())
    }

    /// Returns a lazy, single-pass iterator over the items in
    /// `[start, end)`, where `end` defaults to the current `itemcount` when
    /// `None`. Each call repositions the file at `start`, so a fresh call is
    /// restartable; an iterator already in progress is not (spec. section
    /// 4.8's `items` contract).
    pub fn items(&mut self, start: u64, end: Option<u64>) -> Result<Items<'_>> {
        let end = match end {
            Some(end) => end,
            None => self.itemcount()?,
        };
        self.seek_item(start)?;
        Ok(Items {
            file: self,
            current: start,
            end,
        })
    }

    /// Flushes buffered writes to the underlying storage.
    pub fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        self.file_mut()?.flush()?;
        Ok(())
    }

    /// Flushes and releases the underlying file handle. `itemcount` remains
    /// queryable afterwards from a cached length.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            use std::io::Write;
            file.flush()?;
            self.cached_len = Some(file.metadata()?.len());
        }
        Ok(())
    }
}

impl Drop for TeaFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A restartable-per-call, single-pass iterator over a range of items,
/// produced by `TeaFile::items`.
pub struct Items<'a> {
    file: &'a mut TeaFile,
    current: u64,
    end: u64,
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Result<Item>> {
        if self.current >= self.end {
            return None;
        }
        self.current += 1;
        match self.file.read() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
