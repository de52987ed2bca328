//! Common [scalar data types][data types] used in font files
//!
//! [data types]: https://docs.microsoft.com/en-us/typography/opentype/spec/otff#data-types

#![deny(rustdoc::broken_intra_doc_links)]

mod bbox;
mod fword;
mod glyph_id;
mod offset;
mod raw;
mod tag;
mod version;

pub use bbox::BoundingBox;
pub use fword::{FWord, UfWord};
pub use glyph_id::GlyphId;
pub use offset::{Offset16, Offset32};
pub use raw::{BigEndian, FixedSize, Scalar};
pub use tag::{InvalidTag, Tag};
pub use version::MajorMinor;

/// The SFNT version for fonts containing TrueType outlines.
pub const TT_SFNT_VERSION: u32 = 0x00010000;
/// The SFNT version for legacy Apple fonts containing TrueType outlines.
pub const TRUE_SFNT_VERSION: u32 = 0x74727565;
/// The SFNT version for fonts containing CFF outlines.
pub const CFF_SFNT_VERSION: u32 = 0x4F54544F;
