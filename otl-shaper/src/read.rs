//! Traits for interpreting font data

use types::{MajorMinor, Tag};

use crate::font_data::FontData;

/// A type that can be read from raw table data.
///
/// This trait is implemented for all font tables that are self-describing:
/// that is, tables that do not require any external state in order to
/// interpret their underlying bytes. (Tables that require external state
/// implement [`FontReadWithArgs`] instead.)
pub trait FontRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data, performing validation.
    ///
    /// In the case of a table, this method is responsible for ensuring the
    /// input data is consistent: this means ensuring that any versioned
    /// fields are present as required by the version, and that any array
    /// lengths are not out-of-bounds.
    fn read(data: FontData<'a>) -> Result<Self, ReadError>;
}

/// A trait for a type that needs additional arguments to be read.
pub trait ReadArgs {
    type Args: Copy;
}

/// A trait for types that require external data in order to be constructed.
pub trait FontReadWithArgs<'a>: Sized + ReadArgs {
    /// read an item, using the provided args.
    ///
    /// If a type requires multiple arguments, they will be passed as a tuple.
    fn read_with_args(data: FontData<'a>, args: &Self::Args) -> Result<Self, ReadError>;
}

// a blanket impl of ReadArgs/FontReadWithArgs for general FontRead types,
// so that offsets to either can be resolved through a common interface.
impl<'a, T: FontRead<'a>> ReadArgs for T {
    type Args = ();
}

impl<'a, T: FontRead<'a>> FontReadWithArgs<'a> for T {
    fn read_with_args(data: FontData<'a>, _: &Self::Args) -> Result<Self, ReadError> {
        Self::read(data)
    }
}

/// An error that occurs when reading font data
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    /// A read or an offset went past the end of a table.
    OutOfBounds,
    /// A format or subtable type not defined by the spec.
    // i64 is flexible enough to store any value we might encounter
    InvalidFormat(i64),
    InvalidSfnt(u32),
    /// Specified array length not a multiple of item size.
    InvalidArrayLen,
    /// An offset was unexpectedly null.
    NullOffset,
    TableIsMissing(Tag),
    /// A structural invariant of a table failed.
    MalformedData(&'static str),
    /// [`MalformedData`](Self::MalformedData), attributed to a table.
    MalformedTable(Tag, &'static str),
    /// A major/minor version outside what this crate implements.
    UnsupportedVersion(Tag, MajorMinor),
    /// Well-formed data using a feature this crate does not implement.
    Unsupported(&'static str),
}

impl ReadError {
    /// Attribute a bare [`MalformedData`](Self::MalformedData) error to a table.
    pub(crate) fn in_table(self, tag: Tag) -> ReadError {
        match self {
            ReadError::MalformedData(reason) => ReadError::MalformedTable(tag, reason),
            other => other,
        }
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::OutOfBounds => write!(f, "An offset was out of bounds"),
            ReadError::InvalidFormat(x) => write!(f, "Invalid format '{x}'"),
            ReadError::InvalidSfnt(ver) => write!(f, "Invalid sfnt version 0x{ver:08X}"),
            ReadError::InvalidArrayLen => {
                write!(f, "Specified array length not a multiple of item size")
            }
            ReadError::NullOffset => write!(f, "An offset was unexpectedly null"),
            ReadError::TableIsMissing(tag) => write!(f, "the {tag} table is missing"),
            ReadError::MalformedData(msg) => write!(f, "Malformed data: '{msg}'"),
            ReadError::MalformedTable(tag, msg) => {
                write!(f, "Malformed {tag} table: '{msg}'")
            }
            ReadError::UnsupportedVersion(tag, version) => {
                write!(f, "Unsupported {tag} version {version}")
            }
            ReadError::Unsupported(msg) => write!(f, "Unsupported: '{msg}'"),
        }
    }
}

impl std::error::Error for ReadError {}
