//! Driving decoded lookups across a glyph sequence.
//!
//! Each lookup scans left to right; at every position its subtables are
//! tried in order, and the first match decides where the scan resumes. A
//! no-match advances by one. Contextual subtables record the matched input
//! positions and dispatch their nested lookups at those positions; nested
//! lookups must not change the sequence length.

use crate::tables::gdef::Gdef;
use crate::tables::gpos::{
    MarkBasePosFormat1, MarkMarkPosFormat1, PairPosFormat1, PairPosFormat2,
};
use crate::tables::gsub::{
    LigatureSubstFormat1, MultipleSubstFormat1, SingleSubstFormat1, SingleSubstFormat2,
};
use crate::tables::layout::{
    ChainedContextFormat1, ChainedContextFormat2, ChainedContextFormat3, ClassDef, Lookup,
    LookupList, LookupSubtable, SequenceLookupRecord, SequenceContextFormat2,
};
use crate::tables::value_record::ValueRecord;

use super::filter::GlyphFilter;
use super::{ShapeError, ShapedGlyph};

pub(crate) fn apply_all(
    list: &LookupList,
    glyphs: &mut Vec<ShapedGlyph>,
    budget: usize,
) -> Result<(), ShapeError> {
    let mut ctx = ShapeContext {
        lookups: &list.lookups,
        classes: &list.classes,
        budget,
    };
    for &index in &list.active {
        // indices were bounds-checked at load
        let Some(lookup) = list.lookups.get(index as usize) else {
            continue;
        };
        ctx.apply_lookup(lookup, glyphs)?;
    }
    Ok(())
}

struct ShapeContext<'a> {
    lookups: &'a [Lookup],
    classes: &'a Gdef,
    budget: usize,
}

impl<'a> ShapeContext<'a> {
    fn apply_lookup(
        &mut self,
        lookup: &'a Lookup,
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> Result<(), ShapeError> {
        let filter = GlyphFilter::new(lookup.flags, self.classes);
        let mut pos = 0;
        while pos < glyphs.len() {
            match self.apply_subtables_at(lookup, &filter, glyphs, pos)? {
                // progress is guaranteed: the only apply returning `pos`
                // itself is an empty multiple substitution, which shrinks
                // the sequence
                Some(next) => pos = next,
                None => pos += 1,
            }
        }
        Ok(())
    }

    fn apply_subtables_at(
        &mut self,
        lookup: &'a Lookup,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        for subtable in &lookup.subtables {
            self.charge()?;
            if let Some(next) = self.apply_subtable(subtable, filter, glyphs, pos)? {
                return Ok(Some(next));
            }
        }
        Ok(None)
    }

    fn charge(&mut self) -> Result<(), ShapeError> {
        if self.budget == 0 {
            return Err(ShapeError::BudgetExhausted);
        }
        self.budget -= 1;
        Ok(())
    }

    /// Apply one subtable at `pos`. `Some(next)` is a match with the
    /// position where scanning resumes; `None` is no match.
    fn apply_subtable(
        &mut self,
        subtable: &'a LookupSubtable,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        if !filter.keep(&glyphs[pos]) {
            return Ok(None);
        }
        match subtable {
            LookupSubtable::SingleSubst1(table) => Ok(apply_single1(table, glyphs, pos)),
            LookupSubtable::SingleSubst2(table) => Ok(apply_single2(table, glyphs, pos)),
            LookupSubtable::MultipleSubst(table) => Ok(apply_multiple(table, glyphs, pos)),
            LookupSubtable::LigatureSubst(table) => {
                Ok(apply_ligature(table, filter, glyphs, pos))
            }
            LookupSubtable::PairPos1(table) => Ok(apply_pair1(table, filter, glyphs, pos)),
            LookupSubtable::PairPos2(table) => Ok(apply_pair2(table, filter, glyphs, pos)),
            LookupSubtable::MarkBasePos(table) => Ok(apply_mark_base(table, filter, glyphs, pos)),
            LookupSubtable::MarkMarkPos(table) => Ok(apply_mark_mark(table, filter, glyphs, pos)),
            LookupSubtable::SequenceContext(table) => {
                self.apply_seq_context(table, filter, glyphs, pos)
            }
            LookupSubtable::ChainedContext1(table) => {
                self.apply_chained1(table, filter, glyphs, pos)
            }
            LookupSubtable::ChainedContext2(table) => {
                self.apply_chained2(table, filter, glyphs, pos)
            }
            LookupSubtable::ChainedContext3(table) => {
                self.apply_chained3(table, filter, glyphs, pos)
            }
            LookupSubtable::Unsupported(_) => Ok(None),
        }
    }

    fn apply_seq_context(
        &mut self,
        table: &'a SequenceContextFormat2,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        if table.coverage.get(glyphs[pos].gid).is_none() {
            return Ok(None);
        }
        let first_class = table.class_def.get(glyphs[pos].gid);
        let Some(Some(rules)) = table.rule_sets.get(first_class as usize) else {
            return Ok(None);
        };
        for rule in rules {
            let Some(positions) =
                match_input_classes(filter, &table.class_def, glyphs, pos, &rule.input_classes)
            else {
                continue;
            };
            return self.finish_context(&rule.actions, &positions, glyphs).map(Some);
        }
        Ok(None)
    }

    fn apply_chained1(
        &mut self,
        table: &'a ChainedContextFormat1,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        let Some(coverage_index) = table.coverage.get(glyphs[pos].gid) else {
            return Ok(None);
        };
        let Some(Some(rules)) = table.rule_sets.get(coverage_index as usize) else {
            return Ok(None);
        };
        for rule in rules {
            if !match_backtrack(filter, glyphs, pos, &rule.backtrack, |glyph, &want| {
                glyph.gid == want
            }) {
                continue;
            }
            let Some(positions) =
                match_input(filter, glyphs, pos, &rule.input, |glyph, &want| {
                    glyph.gid == want
                })
            else {
                continue;
            };
            if !match_lookahead(
                filter,
                glyphs,
                *positions.last().unwrap(),
                &rule.lookahead,
                |glyph, &want| glyph.gid == want,
            ) {
                continue;
            }
            return self.finish_context(&rule.actions, &positions, glyphs).map(Some);
        }
        Ok(None)
    }

    fn apply_chained2(
        &mut self,
        table: &'a ChainedContextFormat2,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        if table.coverage.get(glyphs[pos].gid).is_none() {
            return Ok(None);
        }
        let first_class = table.input_classes.get(glyphs[pos].gid);
        let Some(Some(rules)) = table.rule_sets.get(first_class as usize) else {
            return Ok(None);
        };
        for rule in rules {
            if !match_backtrack(filter, glyphs, pos, &rule.backtrack, |glyph, &want| {
                table.backtrack_classes.get(glyph.gid) == want
            }) {
                continue;
            }
            let Some(positions) =
                match_input(filter, glyphs, pos, &rule.input, |glyph, &want| {
                    table.input_classes.get(glyph.gid) == want
                })
            else {
                continue;
            };
            if !match_lookahead(
                filter,
                glyphs,
                *positions.last().unwrap(),
                &rule.lookahead,
                |glyph, &want| table.lookahead_classes.get(glyph.gid) == want,
            ) {
                continue;
            }
            return self.finish_context(&rule.actions, &positions, glyphs).map(Some);
        }
        Ok(None)
    }

    fn apply_chained3(
        &mut self,
        table: &'a ChainedContextFormat3,
        filter: &GlyphFilter,
        glyphs: &mut Vec<ShapedGlyph>,
        pos: usize,
    ) -> Result<Option<usize>, ShapeError> {
        if table.input[0].get(glyphs[pos].gid).is_none() {
            return Ok(None);
        }
        if !match_backtrack(filter, glyphs, pos, &table.backtrack, |glyph, coverage| {
            coverage.get(glyph.gid).is_some()
        }) {
            return Ok(None);
        }
        let Some(positions) = match_input(filter, glyphs, pos, &table.input[1..], |glyph, coverage| {
            coverage.get(glyph.gid).is_some()
        }) else {
            return Ok(None);
        };
        if !match_lookahead(
            filter,
            glyphs,
            *positions.last().unwrap(),
            &table.lookahead,
            |glyph, coverage| coverage.get(glyph.gid).is_some(),
        ) {
            return Ok(None);
        }
        self.finish_context(&table.actions, &positions, glyphs).map(Some)
    }

    /// Dispatch a matched rule's actions and compute where scanning
    /// resumes: just past the last input glyph, or past whatever a nested
    /// pair positioning consumed beyond it.
    fn finish_context(
        &mut self,
        actions: &'a [SequenceLookupRecord],
        positions: &[usize],
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> Result<usize, ShapeError> {
        let after_input = positions.last().unwrap() + 1;
        let consumed = self.dispatch_actions(actions, positions, glyphs)?;
        Ok(consumed.map_or(after_input, |next| next.max(after_input)))
    }

    fn dispatch_actions(
        &mut self,
        actions: &'a [SequenceLookupRecord],
        positions: &[usize],
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> Result<Option<usize>, ShapeError> {
        let len_before = glyphs.len();
        let mut consumed = None;
        for action in actions {
            let Some(lookup) = self.lookups.get(action.lookup_list_index as usize) else {
                continue;
            };
            let Some(&at) = positions.get(action.sequence_index as usize) else {
                continue;
            };
            let filter = GlyphFilter::new(lookup.flags, self.classes);
            for subtable in &lookup.subtables {
                self.charge()?;
                if let Some(next) = self.apply_subtable(subtable, &filter, glyphs, at)? {
                    if glyphs.len() != len_before {
                        return Err(ShapeError::NestedLengthChange);
                    }
                    consumed = consumed.map_or(Some(next), |c: usize| Some(c.max(next)));
                    break;
                }
            }
        }
        Ok(consumed)
    }
}

/// Match the glyphs preceding `pos` (closest first) against `wanted`,
/// skipping glyphs the filter drops.
fn match_backtrack<T>(
    filter: &GlyphFilter,
    glyphs: &[ShapedGlyph],
    pos: usize,
    wanted: &[T],
    matches: impl Fn(&ShapedGlyph, &T) -> bool,
) -> bool {
    let mut cur = pos;
    for want in wanted {
        let Some(prev) = filter.prev(glyphs, cur) else {
            return false;
        };
        if !matches(&glyphs[prev], want) {
            return false;
        }
        cur = prev;
    }
    true
}

/// Match the input tail starting after `pos` against `wanted`, skipping
/// glyphs the filter drops. Returns all matched positions, `pos` included.
fn match_input<T>(
    filter: &GlyphFilter,
    glyphs: &[ShapedGlyph],
    pos: usize,
    wanted: &[T],
    matches: impl Fn(&ShapedGlyph, &T) -> bool,
) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(wanted.len() + 1);
    positions.push(pos);
    let mut cur = pos;
    for want in wanted {
        cur = filter.next(glyphs, cur + 1)?;
        if !matches(&glyphs[cur], want) {
            return None;
        }
        positions.push(cur);
    }
    Some(positions)
}

/// Match the glyphs following `last_input` against `wanted`, skipping
/// glyphs the filter drops.
fn match_lookahead<T>(
    filter: &GlyphFilter,
    glyphs: &[ShapedGlyph],
    last_input: usize,
    wanted: &[T],
    matches: impl Fn(&ShapedGlyph, &T) -> bool,
) -> bool {
    let mut cur = last_input;
    for want in wanted {
        let Some(next) = filter.next(glyphs, cur + 1) else {
            return false;
        };
        if !matches(&glyphs[next], want) {
            return false;
        }
        cur = next;
    }
    true
}

/// Match the input tail by class numbers (sequence context format 2).
fn match_input_classes(
    filter: &GlyphFilter,
    class_def: &ClassDef,
    glyphs: &[ShapedGlyph],
    pos: usize,
    classes: &[u16],
) -> Option<Vec<usize>> {
    match_input(filter, glyphs, pos, classes, |glyph, &want| {
        class_def.get(glyph.gid) == want
    })
}

fn apply_single1(
    table: &SingleSubstFormat1,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    table.coverage.get(glyphs[pos].gid)?;
    let gid = glyphs[pos].gid.to_u16();
    // delta arithmetic is modulo 65536
    glyphs[pos].gid = types::GlyphId::new(gid.wrapping_add(table.delta_glyph_id as u16));
    Some(pos + 1)
}

fn apply_single2(
    table: &SingleSubstFormat2,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    let index = table.coverage.get(glyphs[pos].gid)?;
    glyphs[pos].gid = table.substitute_glyph_ids[index as usize];
    Some(pos + 1)
}

fn apply_multiple(
    table: &MultipleSubstFormat1,
    glyphs: &mut Vec<ShapedGlyph>,
    pos: usize,
) -> Option<usize> {
    let index = table.coverage.get(glyphs[pos].gid)?;
    let sequence = &table.sequences[index as usize];
    if sequence.is_empty() {
        // the glyph is deleted, and its text with it; scanning resumes at
        // this same index, which now holds the following glyph
        glyphs.remove(pos);
        return Some(pos);
    }
    // the original glyph's text (and metrics slot) goes to the first
    // replacement; the rest start fresh
    let mut replacement = glyphs[pos].clone();
    replacement.gid = sequence[0];
    let rest: Vec<ShapedGlyph> = sequence[1..]
        .iter()
        .map(|gid| ShapedGlyph::new(*gid, []))
        .collect();
    glyphs[pos] = replacement;
    glyphs.splice(pos + 1..pos + 1, rest);
    Some(pos + sequence.len())
}

fn apply_ligature(
    table: &LigatureSubstFormat1,
    filter: &GlyphFilter,
    glyphs: &mut Vec<ShapedGlyph>,
    pos: usize,
) -> Option<usize> {
    let index = table.coverage.get(glyphs[pos].gid)?;
    'rules: for ligature in &table.ligature_sets[index as usize] {
        let mut positions = vec![pos];
        let mut cur = pos;
        for component in &ligature.component_glyph_ids {
            match filter.next(glyphs, cur + 1) {
                Some(next) if glyphs[next].gid == *component => cur = next,
                _ => continue 'rules,
            }
            positions.push(cur);
        }
        // replace the first component in place, concatenating the text of
        // every consumed glyph; skipped glyphs in between stay put
        let last = *positions.last().unwrap();
        let consumed = positions.len();
        for &p in &positions[1..] {
            let text = std::mem::take(&mut glyphs[p].text);
            glyphs[pos].text.extend(text);
        }
        glyphs[pos].gid = ligature.ligature_glyph;
        for &p in positions[1..].iter().rev() {
            glyphs.remove(p);
        }
        // just after the last consumed glyph, in the shrunken sequence
        return Some(last + 2 - consumed);
    }
    None
}

fn apply_pair1(
    table: &PairPosFormat1,
    filter: &GlyphFilter,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    let first_index = table.coverage.get(glyphs[pos].gid)?;
    let second = filter.next(glyphs, pos + 1)?;
    let pairs = &table.pair_sets[first_index as usize];
    let record = pairs
        .binary_search_by_key(&glyphs[second].gid, |pair| pair.second_glyph)
        .ok()
        .map(|ix| &pairs[ix])?;
    apply_value(&record.record1, &mut glyphs[pos]);
    apply_value(&record.record2, &mut glyphs[second]);
    Some(pair_next(second, &record.record2))
}

fn apply_pair2(
    table: &PairPosFormat2,
    filter: &GlyphFilter,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    table.coverage.get(glyphs[pos].gid)?;
    let second = filter.next(glyphs, pos + 1)?;
    let class1 = table.class_def1.get(glyphs[pos].gid);
    let class2 = table.class_def2.get(glyphs[second].gid);
    if class1 >= table.class1_count || class2 >= table.class2_count {
        return None;
    }
    let index = class1 as usize * table.class2_count as usize + class2 as usize;
    let (record1, record2) = &table.records[index];
    apply_value(record1, &mut glyphs[pos]);
    apply_value(record2, &mut glyphs[second]);
    Some(pair_next(second, record2))
}

/// After a pair match, scanning resumes at the second glyph, or past it
/// when the second value record is non-empty.
fn pair_next(second: usize, record2: &ValueRecord) -> usize {
    if record2.is_empty() {
        second
    } else {
        second + 1
    }
}

fn apply_value(record: &ValueRecord, glyph: &mut ShapedGlyph) {
    // y_advance and the device fields are decoded but never applied
    if let Some(x) = record.x_placement {
        glyph.x_offset += x as i32;
    }
    if let Some(y) = record.y_placement {
        glyph.y_offset += y as i32;
    }
    if let Some(x) = record.x_advance {
        glyph.advance += x as i32;
    }
}

fn apply_mark_base(
    table: &MarkBasePosFormat1,
    filter: &GlyphFilter,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    let mark_index = table.mark_coverage.get(glyphs[pos].gid)?;
    let base = filter.prev(glyphs, pos)?;
    let base_index = table.base_coverage.get(glyphs[base].gid)?;
    let mark = &table.marks[mark_index as usize];
    let base_anchor = table.base_anchors[base_index as usize][mark.mark_class as usize]?;
    glyphs[pos].x_offset = -glyphs[base].advance + base_anchor.x as i32 - mark.anchor.x as i32;
    glyphs[pos].y_offset = base_anchor.y as i32 - mark.anchor.y as i32;
    Some(pos + 1)
}

fn apply_mark_mark(
    table: &MarkMarkPosFormat1,
    filter: &GlyphFilter,
    glyphs: &mut [ShapedGlyph],
    pos: usize,
) -> Option<usize> {
    let mark_index = table.mark1_coverage.get(glyphs[pos].gid)?;
    let target = filter.prev(glyphs, pos)?;
    let target_index = table.mark2_coverage.get(glyphs[target].gid)?;
    let mark = &table.marks[mark_index as usize];
    let target_anchor = table.mark2_anchors[target_index as usize][mark.mark_class as usize]?;
    glyphs[pos].x_offset = -glyphs[target].advance + target_anchor.x as i32 - mark.anchor.x as i32;
    glyphs[pos].y_offset = target_anchor.y as i32 - mark.anchor.y as i32;
    Some(pos + 1)
}
