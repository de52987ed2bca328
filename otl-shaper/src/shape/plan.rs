//! Loading lookup lists from a font.

use std::collections::BTreeMap;
use std::rc::Rc;

use types::{GlyphId, Tag};

use crate::tables::gdef::{self, Gdef};
use crate::tables::gpos::{self, PairPosFormat1, PairValueRecord};
use crate::tables::gsub;
use crate::tables::layout::{
    Coverage, DecodeCtx, LayoutTable, Lookup, LookupFlag, LookupList, LookupSubtable,
    SubtableDecodeFn,
};
use crate::tables::value_record::ValueRecord;
use crate::{FontRead, ReadError, TableProvider};

/// Load the GSUB lookups selected by (script, language, features).
///
/// A missing GSUB table yields an empty list; malformed data is an error.
pub fn load_gsub<'a>(
    font: &impl TableProvider<'a>,
    script: Tag,
    language: Tag,
    features: &[Tag],
) -> Result<LookupList, ReadError> {
    load_layout(font, gsub::TAG, gsub::read_subtable, script, language, features)
}

/// Load the GPOS lookups selected by (script, language, features).
///
/// A missing GPOS table yields an empty list; malformed data is an error.
pub fn load_gpos<'a>(
    font: &impl TableProvider<'a>,
    script: Tag,
    language: Tag,
    features: &[Tag],
) -> Result<LookupList, ReadError> {
    load_layout(font, gpos::TAG, gpos::read_subtable, script, language, features)
}

fn load_layout<'a>(
    font: &impl TableProvider<'a>,
    tag: Tag,
    decode: SubtableDecodeFn,
    script: Tag,
    language: Tag,
    features: &[Tag],
) -> Result<LookupList, ReadError> {
    let Some(data) = font.data_for_tag(tag) else {
        return Ok(LookupList::default());
    };
    let table = LayoutTable::read(data, tag)?;
    let active = table.select_lookups(script, language, features)?;
    let mut ctx = DecodeCtx::new(data, tag);
    let lookups = table.read_lookups(&mut ctx, decode)?;
    if active.iter().any(|&ix| ix as usize >= lookups.len()) {
        return Err(ReadError::MalformedTable(tag, "lookup index out of bounds"));
    }
    log::debug!(
        "loaded {} with {} lookups, {} active",
        tag,
        lookups.len(),
        active.len()
    );
    Ok(LookupList {
        lookups,
        active,
        classes: read_classes(font)?,
    })
}

/// GDEF is optional; when absent every glyph is usable by every lookup.
fn read_classes<'a>(font: &impl TableProvider<'a>) -> Result<Gdef, ReadError> {
    match font.data_for_tag(gdef::TAG) {
        Some(data) => Gdef::read(data),
        None => Ok(Gdef::default()),
    }
}

/// Re-express legacy kern pairs as a pair-adjustment lookup.
///
/// The synthesized lookup adjusts the first glyph's advance only, exactly
/// like a GPOS type 2 format 1 subtable whose second value record is empty,
/// so the shaping engine needs no special handling for `kern`.
pub fn kern_as_lookup(pairs: BTreeMap<(GlyphId, GlyphId), i16>) -> LookupList {
    let mut lefts = Vec::new();
    let mut pair_sets: Vec<Vec<PairValueRecord>> = Vec::new();
    // BTreeMap iteration is sorted by (left, right), so each set stays
    // sorted by second glyph
    for ((left, right), value) in pairs {
        if lefts.last() != Some(&left) {
            lefts.push(left);
            pair_sets.push(Vec::new());
        }
        pair_sets.last_mut().unwrap().push(PairValueRecord {
            second_glyph: right,
            record1: ValueRecord::new_x_advance(value),
            record2: ValueRecord::default(),
        });
    }
    let subtable = LookupSubtable::PairPos1(PairPosFormat1 {
        coverage: Rc::new(Coverage::from_sorted_glyphs(lefts)),
        pair_sets,
    });
    LookupList {
        lookups: vec![Lookup {
            lookup_type: 2,
            flags: LookupFlag::empty(),
            mark_filtering_set: None,
            subtables: vec![subtable],
        }],
        active: vec![0],
        classes: Gdef::default(),
    }
}
