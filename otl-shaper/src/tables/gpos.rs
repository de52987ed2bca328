//! the [GPOS](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos) table

use std::rc::Rc;

use types::{GlyphId, Tag};

use super::layout::{
    ChainedContextFormat1, ChainedContextFormat2, ChainedContextFormat3, ClassDef, Coverage,
    DecodeCtx, LookupSubtable, SequenceContextFormat2, UnsupportedSubtable,
};
use super::value_record::{ValueFormat, ValueRecord};
use crate::{FontData, FontRead, ReadError};

#[cfg(test)]
#[path = "../tests/test_gpos.rs"]
mod tests;

/// 'GPOS'
pub const TAG: Tag = Tag::new(b"GPOS");

/// Decode one GPOS subtable.
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
        (2, 1) => PairPosFormat1::read(ctx, offset).map(LookupSubtable::PairPos1),
        (2, 2) => PairPosFormat2::read(ctx, offset).map(LookupSubtable::PairPos2),
        (4, 1) => MarkBasePosFormat1::read(ctx, offset).map(LookupSubtable::MarkBasePos),
        (6, 1) => MarkMarkPosFormat1::read(ctx, offset).map(LookupSubtable::MarkMarkPos),
        (7, 2) => SequenceContextFormat2::read(ctx, offset).map(LookupSubtable::SequenceContext),
        (8, 1) => ChainedContextFormat1::read(ctx, offset).map(LookupSubtable::ChainedContext1),
        (8, 2) => ChainedContextFormat2::read(ctx, offset).map(LookupSubtable::ChainedContext2),
        (8, 3) => ChainedContextFormat3::read(ctx, offset).map(LookupSubtable::ChainedContext3),
        (9, 1) => {
            let extension_lookup_type: u16 = ctx.data().read_at(offset + 2)?;
            let extension_offset: u32 = ctx.data().read_at(offset + 4)?;
            if extension_lookup_type == 9 {
                return ctx.malformed("extension lookup redirects to the extension type");
            }
            read_subtable(ctx, extension_lookup_type, offset + extension_offset as usize)
        }
        (lookup_type, format) => {
            log::debug!("unimplemented GPOS subtable: type {lookup_type} format {format}");
            Ok(LookupSubtable::Unsupported(UnsupportedSubtable {
                lookup_type,
                format,
            }))
        }
    }
}

/// A 2-D point used to align a mark against a base or another mark.
///
/// Anchor formats 1, 2 and 3 all carry the design-unit coordinates we use;
/// the format 2 contour point is ignored, and the format 3 device offsets
/// are decoded but contribute no delta (this crate positions in font units,
/// with no pixels-per-em anywhere in its interface).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl<'a> FontRead<'a> for Anchor {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        let x: i16 = data.read_at(2)?;
        let y: i16 = data.read_at(4)?;
        match format {
            1 | 2 => (),
            3 => {
                // device table offsets; kept for bounds validation only
                let _x_device_offset: u16 = data.read_at(6)?;
                let _y_device_offset: u16 = data.read_at(8)?;
            }
            other => return Err(ReadError::InvalidFormat(other as _)),
        }
        Ok(Anchor { x, y })
    }
}

/// One record of a [MarkArray](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#mark-array-table).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkRecord {
    pub mark_class: u16,
    pub anchor: Anchor,
}

impl MarkRecord {
    /// Decode a MarkArray rooted at `offset`.
    pub(crate) fn read_array(
        ctx: &mut DecodeCtx,
        offset: usize,
    ) -> Result<Vec<MarkRecord>, ReadError> {
        let data = ctx.data();
        let mark_count: u16 = data.read_at(offset)?;
        let mut marks = Vec::with_capacity(mark_count as usize);
        for i in 0..mark_count as usize {
            let record_offset = offset + 2 + i * 4;
            let mark_class: u16 = data.read_at(record_offset)?;
            let anchor_offset: u16 = data.read_at(record_offset + 2)?;
            let anchor = ctx.anchor(offset + anchor_offset as usize)?;
            marks.push(MarkRecord { mark_class, anchor });
        }
        Ok(marks)
    }
}

/// [Pair adjustment format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#pair-adjustment-positioning-format-1-adjustments-for-glyph-pairs):
/// adjustments for specific glyph pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct PairPosFormat1 {
    pub coverage: Rc<Coverage>,
    /// Pair sets, indexed by the coverage index of the first glyph; each is
    /// sorted by second glyph id.
    pub pair_sets: Vec<Vec<PairValueRecord>>,
}

/// One entry of a pair set: the second glyph and the two adjustments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairValueRecord {
    pub second_glyph: GlyphId,
    pub record1: ValueRecord,
    pub record2: ValueRecord,
}

impl PairPosFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let value_format1: ValueFormat = data.read_at(offset + 4)?;
        let value_format2: ValueFormat = data.read_at(offset + 6)?;
        let pair_set_count: u16 = data.read_at(offset + 8)?;
        let mut pair_sets = Vec::with_capacity(pair_set_count as usize);
        for i in 0..pair_set_count as usize {
            let pair_set_offset: u16 = data.read_at(offset + 10 + i * 2)?;
            let set_base = offset + pair_set_offset as usize;
            let mut cursor = data.cursor_at(set_base);
            let pair_value_count: u16 = cursor.read()?;
            let mut pairs = Vec::with_capacity(pair_value_count as usize);
            for _ in 0..pair_value_count {
                let second_glyph: GlyphId = cursor.read()?;
                let record1 = ValueRecord::read(&mut cursor, value_format1)?;
                let record2 = ValueRecord::read(&mut cursor, value_format2)?;
                pairs.push(PairValueRecord {
                    second_glyph,
                    record1,
                    record2,
                });
            }
            pair_sets.push(pairs);
        }
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        coverage
            .check_len(pair_set_count as usize, "mismatched coverage and pair sets")
            .map_err(|e| e.in_table(ctx.tag()))?;
        Ok(PairPosFormat1 {
            coverage,
            pair_sets,
        })
    }
}

/// [Pair adjustment format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#pair-adjustment-positioning-format-2-class-pair-adjustment):
/// adjustments keyed by (class, class).
#[derive(Clone, Debug, PartialEq)]
pub struct PairPosFormat2 {
    pub coverage: Rc<Coverage>,
    pub class_def1: Rc<ClassDef>,
    pub class_def2: Rc<ClassDef>,
    pub class1_count: u16,
    pub class2_count: u16,
    /// `class1_count * class2_count` records, row-major by first class.
    pub records: Vec<(ValueRecord, ValueRecord)>,
}

impl PairPosFormat2 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let value_format1: ValueFormat = data.read_at(offset + 4)?;
        let value_format2: ValueFormat = data.read_at(offset + 6)?;
        let class_def1_offset: u16 = data.read_at(offset + 8)?;
        let class_def2_offset: u16 = data.read_at(offset + 10)?;
        let class1_count: u16 = data.read_at(offset + 12)?;
        let class2_count: u16 = data.read_at(offset + 14)?;
        let mut cursor = data.cursor_at(offset + 16);
        let record_count = class1_count as usize * class2_count as usize;
        let mut records = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            let record1 = ValueRecord::read(&mut cursor, value_format1)?;
            let record2 = ValueRecord::read(&mut cursor, value_format2)?;
            records.push((record1, record2));
        }
        Ok(PairPosFormat2 {
            coverage: ctx.coverage(offset + coverage_offset as usize)?,
            class_def1: ctx.class_def(offset + class_def1_offset as usize)?,
            class_def2: ctx.class_def(offset + class_def2_offset as usize)?,
            class1_count,
            class2_count,
            records,
        })
    }
}

/// [Mark-to-base attachment format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#mark-to-base-attachment-positioning-format-1-mark-to-base-attachment-point):
/// aligns a mark's anchor with an anchor on the preceding base glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkBasePosFormat1 {
    pub mark_coverage: Rc<Coverage>,
    pub base_coverage: Rc<Coverage>,
    pub mark_class_count: u16,
    pub marks: Rc<Vec<MarkRecord>>,
    /// Anchors per base glyph, one (optional) per mark class.
    pub base_anchors: Vec<Vec<Option<Anchor>>>,
}

impl MarkBasePosFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let mark_coverage_offset: u16 = data.read_at(offset + 2)?;
        let base_coverage_offset: u16 = data.read_at(offset + 4)?;
        let mark_class_count: u16 = data.read_at(offset + 6)?;
        let mark_array_offset: u16 = data.read_at(offset + 8)?;
        let base_array_offset: u16 = data.read_at(offset + 10)?;

        let mark_coverage = ctx.coverage(offset + mark_coverage_offset as usize)?;
        let base_coverage = ctx.coverage(offset + base_coverage_offset as usize)?;
        let marks = ctx.mark_array(offset + mark_array_offset as usize)?;
        check_mark_classes(ctx, &marks, mark_class_count)?;
        mark_coverage
            .check_len(marks.len(), "mismatched mark coverage and mark array")
            .map_err(|e| e.in_table(ctx.tag()))?;

        let base_anchors = read_anchor_matrix(
            ctx,
            offset + base_array_offset as usize,
            mark_class_count,
        )?;
        base_coverage
            .check_len(base_anchors.len(), "mismatched base coverage and base array")
            .map_err(|e| e.in_table(ctx.tag()))?;

        Ok(MarkBasePosFormat1 {
            mark_coverage,
            base_coverage,
            mark_class_count,
            marks,
            base_anchors,
        })
    }
}

/// [Mark-to-mark attachment format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#mark-to-mark-attachment-positioning-format-1-mark-to-mark-attachment):
/// aligns a mark's anchor with an anchor on a preceding mark.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkMarkPosFormat1 {
    pub mark1_coverage: Rc<Coverage>,
    pub mark2_coverage: Rc<Coverage>,
    pub mark_class_count: u16,
    /// The marks being positioned.
    pub marks: Rc<Vec<MarkRecord>>,
    /// Anchors per attachment-target mark, one (optional) per mark class.
    pub mark2_anchors: Vec<Vec<Option<Anchor>>>,
}

impl MarkMarkPosFormat1 {
    fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let mark1_coverage_offset: u16 = data.read_at(offset + 2)?;
        let mark2_coverage_offset: u16 = data.read_at(offset + 4)?;
        let mark_class_count: u16 = data.read_at(offset + 6)?;
        let mark1_array_offset: u16 = data.read_at(offset + 8)?;
        let mark2_array_offset: u16 = data.read_at(offset + 10)?;

        let mark1_coverage = ctx.coverage(offset + mark1_coverage_offset as usize)?;
        let mark2_coverage = ctx.coverage(offset + mark2_coverage_offset as usize)?;
        let marks = ctx.mark_array(offset + mark1_array_offset as usize)?;
        check_mark_classes(ctx, &marks, mark_class_count)?;
        mark1_coverage
            .check_len(marks.len(), "mismatched mark coverage and mark array")
            .map_err(|e| e.in_table(ctx.tag()))?;

        let mark2_anchors = read_anchor_matrix(
            ctx,
            offset + mark2_array_offset as usize,
            mark_class_count,
        )?;
        mark2_coverage
            .check_len(
                mark2_anchors.len(),
                "mismatched mark coverage and mark2 array",
            )
            .map_err(|e| e.in_table(ctx.tag()))?;

        Ok(MarkMarkPosFormat1 {
            mark1_coverage,
            mark2_coverage,
            mark_class_count,
            marks,
            mark2_anchors,
        })
    }
}

fn check_mark_classes(
    ctx: &DecodeCtx,
    marks: &[MarkRecord],
    mark_class_count: u16,
) -> Result<(), ReadError> {
    if marks.iter().any(|mark| mark.mark_class >= mark_class_count) {
        return ctx.malformed("mark class out of bounds");
    }
    Ok(())
}

/// Decode a BaseArray/Mark2Array: a count, then `count * mark_class_count`
/// nullable anchor offsets.
fn read_anchor_matrix(
    ctx: &mut DecodeCtx,
    offset: usize,
    mark_class_count: u16,
) -> Result<Vec<Vec<Option<Anchor>>>, ReadError> {
    let data = ctx.data();
    let count: u16 = data.read_at(offset)?;
    let mut rows = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let mut row = Vec::with_capacity(mark_class_count as usize);
        for j in 0..mark_class_count as usize {
            let record_offset = offset + 2 + (i * mark_class_count as usize + j) * 2;
            let anchor_offset: u16 = data.read_at(record_offset)?;
            if anchor_offset == 0 {
                row.push(None);
            } else {
                row.push(Some(ctx.anchor(offset + anchor_offset as usize)?));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
