//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A native Rust reader and writer for the TeaFile format: a flat,
//! self-describing binary container for homogeneous, fixed-size,
//! time-ordered records. A reader reconstructs record layout from the file
//! alone, with no out-of-band schema.
//!
//! ```no_run
//! use teafile::{FieldType, NameValues, TeaFile};
//!
//! # fn main() -> teafile::Result<()> {
//! let names = vec!["time".to_string(), "price".to_string()];
//! let types = vec![FieldType::Int64, FieldType::Float64];
//! let mut tf = TeaFile::create(
//!     "ticks.tea", &names, Some(&types), None, None, NameValues::new(),
//! )?;
//! tf.write(&[teafile::FieldValue::Int64(0), teafile::FieldValue::Float64(1.0)])?;
//! tf.close()?;
//! # Ok(())
//! # }
//! ```

mod byte_codec;
mod description;
mod error;
mod field_type;
mod file;
mod formatted_codec;
mod header;
mod item_layout;
mod section;
#[cfg(feature = "time-decoration")]
mod time;

pub use description::{
    sanitize_name, parse_format_string, ContentDescription, Field, ItemDescription, NameValue,
    NameValues, TeaFileDescription, TimeScale,
};
pub use error::{Error, Result};
pub use field_type::{FieldType, FieldValue};
pub use file::{Item, Items, TeaFile};
#[cfg(feature = "time-decoration")]
pub use time::Tick;
