//! The assembled shaping pipeline for one font.

use types::{GlyphId, Tag};

use crate::tables::kern;
use crate::{ReadError, TableProvider};

use super::plan::{kern_as_lookup, load_gpos, load_gsub};
use super::{shape, LookupList, ShapeError, ShapedGlyph};

/// A loaded shaping configuration: substitution and positioning lookups for
/// one (script, language, feature set) selection, plus hmtx advances.
///
/// When the font has no applicable GPOS lookups and `kern` was requested,
/// the legacy `kern` table stands in for positioning.
pub struct Shaper {
    gsub: LookupList,
    pos: LookupList,
    widths: Vec<u16>,
}

impl Shaper {
    pub fn new<'a>(
        font: &impl TableProvider<'a>,
        script: Tag,
        language: Tag,
        features: &[Tag],
    ) -> Result<Self, ReadError> {
        let gsub = load_gsub(font, script, language, features)?;
        let mut pos = load_gpos(font, script, language, features)?;
        if pos.is_empty()
            && features.contains(&kern::TAG)
            && font.data_for_tag(kern::TAG).is_some()
        {
            pos = kern_as_lookup(font.kern()?.pair_map()?);
        }
        Ok(Shaper {
            gsub,
            pos,
            widths: read_widths(font).unwrap_or_default(),
        })
    }

    /// A glyph with its advance seeded from the font's metrics.
    pub fn glyph(&self, gid: GlyphId, text: impl IntoIterator<Item = char>) -> ShapedGlyph {
        let mut glyph = ShapedGlyph::new(gid, text);
        glyph.advance = self.advance(gid);
        glyph
    }

    /// Substitute, re-seed advances for the substituted glyphs, position.
    pub fn shape(&self, glyphs: &mut Vec<ShapedGlyph>) -> Result<(), ShapeError> {
        shape(glyphs, &self.gsub)?;
        if !self.widths.is_empty() {
            for glyph in glyphs.iter_mut() {
                glyph.advance = self.advance(glyph.gid);
            }
        }
        shape(glyphs, &self.pos)
    }

    fn advance(&self, gid: GlyphId) -> i32 {
        self.widths
            .get(gid.to_usize())
            .copied()
            .map(i32::from)
            .unwrap_or_default()
    }
}

/// Advance widths per glyph; `None` when the metrics tables are absent.
fn read_widths<'a>(font: &impl TableProvider<'a>) -> Option<Vec<u16>> {
    let num_glyphs = font.maxp().ok()?.num_glyphs();
    let hmtx = font.hmtx().ok()?;
    Some(
        (0..num_glyphs)
            .map(|gid| hmtx.advance(GlyphId::new(gid)).unwrap_or_default())
            .collect(),
    )
}
