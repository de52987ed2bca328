//! the [GSUB](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub) table

use std::rc::Rc;

use types::{BigEndian, FixedSize, GlyphId, Tag};

use super::layout::{
    ChainedContextFormat1, ChainedContextFormat2, ChainedContextFormat3, Coverage, DecodeCtx,
    LookupSubtable, SequenceContextFormat2, UnsupportedSubtable,
};
use crate::ReadError;

#[cfg(test)]
#[path = "../tests/test_gsub.rs"]
mod tests;

/// 'GSUB'
pub const TAG: Tag = Tag::new(b"GSUB");

/// Decode one GSUB subtable.
///
/// Anything outside the supported (type, format) matrix becomes an
/// [`UnsupportedSubtable`] placeholder, which never matches.
pub(crate) fn read_subtable(
    ctx: &mut DecodeCtx,
    lookup_type: u16,
    offset: usize,
) -> Result<LookupSubtable, ReadError> {
    let format: u16 = ctx.data().read_at(offset)?;
    match (lookup_type, format) {
        (1, 1) => SingleSubstFormat1::read(ctx, offset).map(LookupSubtable::SingleSubst1),
        (1, 2) => SingleSubstFormat2::read(ctx, offset).map(LookupSubtable::SingleSubst2),
        (2, 1) => MultipleSubstFormat1::read(ctx, offset).map(LookupSubtable::MultipleSubst),
        (4, 1) => LigatureSubstFormat1::read(ctx, offset).map(LookupSubtable::LigatureSubst),
        (5, 2) => SequenceContextFormat2::read(ctx, offset).map(LookupSubtable::SequenceContext),
        (6, 1) => ChainedContextFormat1::read(ctx, offset).map(LookupSubtable::ChainedContext1),
        (6, 2) => ChainedContextFormat2::read(ctx, offset).map(LookupSubtable::ChainedContext2),
        (6, 3) => ChainedContextFormat3::read(ctx, offset).map(LookupSubtable::ChainedContext3),
        (7, 1) => {
            let extension_lookup_type: u16 = ctx.data().read_at(offset + 2)?;
            let extension_offset: u32 = ctx.data().read_at(offset + 4)?;
            if extension_lookup_type == 7 {
                return ctx.malformed("extension lookup redirects to the extension type");
            }
            read_subtable(ctx, extension_lookup_type, offset + extension_offset as usize)
        }
        (lookup_type, format) => {
            log::debug!("unimplemented GSUB subtable: type {lookup_type} format {format}");
            Ok(LookupSubtable::Unsupported(UnsupportedSubtable {
                lookup_type,
                format,
            }))
        }
    }
}

/// [Single substitution format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#11-single-substitution-format-1):
/// covered glyph → glyph + delta, modulo 65536.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleSubstFormat1 {
    pub coverage: Rc<Coverage>,
    pub delta_glyph_id: i16,
}

impl SingleSubstFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let coverage_offset: u16 = ctx.data().read_at(offset + 2)?;
        let delta_glyph_id: i16 = ctx.data().read_at(offset + 4)?;
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        Ok(SingleSubstFormat1 {
            coverage,
            delta_glyph_id,
        })
    }
}

/// [Single substitution format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#12-single-substitution-format-2):
/// covered glyph → substitute from a parallel array.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleSubstFormat2 {
    pub coverage: Rc<Coverage>,
    pub substitute_glyph_ids: Vec<GlyphId>,
}

impl SingleSubstFormat2 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let glyph_count: u16 = data.read_at(offset + 4)?;
        let glyphs: &[BigEndian<GlyphId>] = data.read_array(
            offset + 6..offset + 6 + glyph_count as usize * GlyphId::RAW_BYTE_LEN,
        )?;
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        coverage
            .check_len(glyph_count as usize, "coverage index out of bounds")
            .map_err(|e| e.in_table(ctx.tag()))?;
        Ok(SingleSubstFormat2 {
            coverage,
            substitute_glyph_ids: glyphs.iter().map(|g| g.get()).collect(),
        })
    }
}

/// [Multiple substitution format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#21-multiple-substitution-format-1):
/// covered glyph → a sequence of glyphs (possibly empty).
#[derive(Clone, Debug, PartialEq)]
pub struct MultipleSubstFormat1 {
    pub coverage: Rc<Coverage>,
    pub sequences: Vec<Vec<GlyphId>>,
}

impl MultipleSubstFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let sequence_count: u16 = data.read_at(offset + 4)?;
        let mut sequences = Vec::with_capacity(sequence_count as usize);
        for i in 0..sequence_count as usize {
            let sequence_offset: u16 = data.read_at(offset + 6 + i * 2)?;
            let sequence_base = offset + sequence_offset as usize;
            let mut cursor = data.cursor_at(sequence_base);
            let glyph_count: u16 = cursor.read()?;
            let glyphs: &[BigEndian<GlyphId>] = cursor.read_array(glyph_count as usize)?;
            sequences.push(glyphs.iter().map(|g| g.get()).collect());
        }
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        coverage
            .check_len(sequence_count as usize, "coverage index out of bounds")
            .map_err(|e| e.in_table(ctx.tag()))?;
        Ok(MultipleSubstFormat1 {
            coverage,
            sequences,
        })
    }
}

/// A single ligature rule: tail components and the glyph that replaces the
/// full match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ligature {
    pub ligature_glyph: GlyphId,
    /// The components following the covered first glyph.
    pub component_glyph_ids: Vec<GlyphId>,
}

/// [Ligature substitution format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#41-ligature-substitution-format-1).
#[derive(Clone, Debug, PartialEq)]
pub struct LigatureSubstFormat1 {
    pub coverage: Rc<Coverage>,
    /// Candidate ligatures, indexed by the coverage index of the first
    /// glyph. The first matching rule in a set wins.
    pub ligature_sets: Vec<Vec<Ligature>>,
}

impl LigatureSubstFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let set_count: u16 = data.read_at(offset + 4)?;
        let mut ligature_sets = Vec::with_capacity(set_count as usize);
        for i in 0..set_count as usize {
            let set_offset: u16 = data.read_at(offset + 6 + i * 2)?;
            let set_base = offset + set_offset as usize;
            let ligature_count: u16 = data.read_at(set_base)?;
            let mut ligatures = Vec::with_capacity(ligature_count as usize);
            for j in 0..ligature_count as usize {
                let ligature_offset: u16 = data.read_at(set_base + 2 + j * 2)?;
                let mut cursor = data.cursor_at(set_base + ligature_offset as usize);
                let ligature_glyph: GlyphId = cursor.read()?;
                let component_count: u16 = cursor.read()?;
                // the covered glyph is the first component
                if component_count == 0 {
                    return ctx.malformed("ligature with component count of zero");
                }
                let components: &[BigEndian<GlyphId>] =
                    cursor.read_array(component_count as usize - 1)?;
                ligatures.push(Ligature {
                    ligature_glyph,
                    component_glyph_ids: components.iter().map(|g| g.get()).collect(),
                });
            }
            ligature_sets.push(ligatures);
        }
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        coverage
            .check_len(set_count as usize, "coverage index out of bounds")
            .map_err(|e| e.in_table(ctx.tag()))?;
        Ok(LigatureSubstFormat1 {
            coverage,
            ligature_sets,
        })
    }
}
