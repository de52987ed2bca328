//! the [maxp (Maximum Profile)](https://docs.microsoft.com/en-us/typography/opentype/spec/maxp) table
//!
//! Only the glyph count is decoded; everything else in this table concerns
//! glyph outlines.

use types::{MajorMinor, Scalar, Tag};

use crate::{FontData, FontRead, ReadError};

/// 'maxp'
pub const TAG: Tag = Tag::new(b"maxp");

/// The maximum profile table.
#[derive(Clone)]
pub struct Maxp<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for Maxp<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: u32 = data.read_at(0)?;
        // version 0.5 (CFF) or 1.0 (TrueType), stored as 16.16 fixed
        if version != 0x00005000 && version != 0x00010000 {
            return Err(ReadError::UnsupportedVersion(
                TAG,
                MajorMinor::from_raw(version.to_be_bytes()),
            ));
        }
        // ensure num_glyphs is present
        data.read_at::<u16>(4)?;
        Ok(Maxp { data })
    }
}

impl Maxp<'_> {
    /// The number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.data.read_at(4).unwrap()
    }
}
