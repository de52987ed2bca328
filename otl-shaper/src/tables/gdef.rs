//! the [GDEF](https://docs.microsoft.com/en-us/typography/opentype/spec/gdef) table

use types::{MajorMinor, Offset16, Tag};

use super::layout::ClassDef;
use crate::{FontData, FontRead, ReadError, ResolveOffset};

/// 'GDEF'
pub const TAG: Tag = Tag::new(b"GDEF");

/// Glyph class bits, as produced by [`Gdef::glyph_class_mask`].
///
/// The GDEF GlyphClassDef stores classes 1..=4; we re-express them as single
/// bits so the lookup-flag skip rules can test membership with one AND.
pub const BASE_GLYPH: u16 = 1 << 0;
pub const LIGATURE_GLYPH: u16 = 1 << 1;
pub const MARK_GLYPH: u16 = 1 << 2;
pub const COMPONENT_GLYPH: u16 = 1 << 3;

/// The glyph classifications of the GDEF table.
///
/// Both sub-tables are optional, and a missing GDEF is not an error: the
/// shaping engine then considers every glyph usable by every lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gdef {
    pub(crate) glyph_classes: Option<ClassDef>,
    pub(crate) mark_attach_classes: Option<ClassDef>,
}

impl<'a> FontRead<'a> for Gdef {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: MajorMinor = data.read_at(0)?;
        if version.major != 1 {
            return Err(ReadError::UnsupportedVersion(TAG, version));
        }
        let glyph_class_def_offset: Offset16 = data.read_at(4)?;
        // attachListOffset and ligCaretListOffset are not used by shaping
        let mark_attach_class_def_offset: Offset16 = data.read_at(10)?;

        let read_class_def = |offset: Offset16| -> Result<Option<ClassDef>, ReadError> {
            if offset.non_null().is_none() {
                return Ok(None);
            }
            offset
                .resolve(data)
                .map_err(|e| e.in_table(TAG))
                .map(Some)
        };

        Ok(Gdef {
            glyph_classes: read_class_def(glyph_class_def_offset)?,
            mark_attach_classes: read_class_def(mark_attach_class_def_offset)?,
        })
    }
}

impl Gdef {
    /// `true` if the font provides a GlyphClassDef sub-table.
    pub fn has_glyph_classes(&self) -> bool {
        self.glyph_classes.is_some()
    }

    /// `true` if the font provides a MarkAttachClassDef sub-table.
    pub fn has_mark_attach_classes(&self) -> bool {
        self.mark_attach_classes.is_some()
    }

    /// The glyph's class, as a single bit out of [`BASE_GLYPH`],
    /// [`LIGATURE_GLYPH`], [`MARK_GLYPH`], [`COMPONENT_GLYPH`].
    ///
    /// Returns 0 for unclassified glyphs, and when the font has no
    /// GlyphClassDef at all.
    pub fn glyph_class_mask(&self, glyph_id: types::GlyphId) -> u16 {
        match self.glyph_classes.as_ref().map(|c| c.get(glyph_id)) {
            Some(class @ 1..=4) => 1 << (class - 1),
            _ => 0,
        }
    }

    /// The glyph's mark attachment class, or 0.
    pub fn mark_attach_class(&self, glyph_id: types::GlyphId) -> u16 {
        self.mark_attach_classes
            .as_ref()
            .map(|c| c.get(glyph_id))
            .unwrap_or_default()
    }

    /// `true` if GDEF classifies this glyph as a mark.
    pub fn is_mark(&self, glyph_id: types::GlyphId) -> bool {
        self.glyph_class_mask(glyph_id) == MARK_GLYPH
    }
}
