//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std;
use std::fmt::{self, Display};
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// TeaFile reading, writing and layout-construction error.
#[derive(Debug)]
pub enum Error {
    /// The underlying storage failed; propagated unchanged.
    Io(io::Error),
    /// The byte-order-mark at the start of the file is missing or does not match.
    InvalidHeader,
    /// Fewer bytes were available than a fixed-width read required.
    TruncatedFile,
    /// A length-prefixed text field contained bytes that are not valid UTF-8.
    InvalidEncoding,
    /// A NameValue record used a `kind` tag outside {1, 2, 3, 4}.
    UnknownNameValueKind(i32),
    /// An item-section field used a type tag outside the ten known field types.
    InvalidFieldType(i32),
    /// A section read or would need to read more bytes than its declared payload size.
    SectionOverrun {
        section_id: i32,
        declared: usize,
        consumed: usize,
    },
    /// The Time section referenced a field offset absent from the item section.
    InvalidTimeFieldOffset(i32),
    /// The format string used a character outside the fixed ten-character type-code
    /// alphabet, a repeat count, or a byte-order/alignment prefix.
    InvalidFormatString(String),
    /// The format string and the field name list differ in length.
    FieldCountMismatch { names: usize, format: usize },
    /// `write` was called with a different number of values than the item has fields.
    ArityMismatch { expected: usize, got: usize },
    /// The operation requires a writable handle, but this one was opened read-only.
    NotWritable,
    /// The operation was attempted on a handle that has already been closed.
    Closed,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedFile
        } else {
            Error::Io(err)
        }
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) =>
                write!(formatter, "I/O error: {}", err),
            Error::InvalidHeader =>
                formatter.write_str("missing or invalid TeaFile byte-order-mark"),
            Error::TruncatedFile =>
                formatter.write_str("unexpected end of file"),
            Error::InvalidEncoding =>
                formatter.write_str("text field is not valid UTF-8"),
            Error::UnknownNameValueKind(kind) =>
                write!(formatter, "unknown name/value kind tag {}", kind),
            Error::InvalidFieldType(tag) =>
                write!(formatter, "unknown field type tag {}", tag),
            Error::SectionOverrun { section_id, declared, consumed } =>
                write!(
                    formatter,
                    "section 0x{:02X} declared {} payload bytes but needed {}",
                    section_id, declared, consumed
                ),
            Error::InvalidTimeFieldOffset(offset) =>
                write!(formatter, "time section references unknown field offset {}", offset),
            Error::InvalidFormatString(format) =>
                write!(formatter, "invalid format string: {:?}", format),
            Error::FieldCountMismatch { names, format } =>
                write!(
                    formatter,
                    "format string has {} field(s) but {} name(s) were given",
                    format, names
                ),
            Error::ArityMismatch { expected, got } =>
                write!(formatter, "expected {} value(s), got {}", expected, got),
            Error::NotWritable =>
                formatter.write_str("file was not opened for writing"),
            Error::Closed =>
                formatter.write_str("operation attempted on a closed TeaFile"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}
