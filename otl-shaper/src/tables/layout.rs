//! OpenType Layout common table formats
//!
//! The structures shared by the GSUB and GPOS tables: coverage and class
//! definition tables, the script/feature/lookup lists, and the contextual
//! subtable formats that both tables use. Subtables are decoded into owned
//! values; coverage, class-def, anchor and mark-array decodes are memoized
//! by table offset in a per-load [`DecodeCtx`].

#[path = "./lookupflag.rs"]
mod lookupflag;

pub use lookupflag::LookupFlag;

use std::collections::HashMap;
use std::rc::Rc;

use types::{BigEndian, FixedSize, GlyphId, MajorMinor, Tag};

use super::gdef::Gdef;
use super::gpos::{Anchor, MarkRecord};
use crate::font_data::Cursor;
use crate::{FontData, FontRead, ReadError};

#[cfg(test)]
#[path = "../tests/test_layout.rs"]
mod tests;

/// A decoded [Coverage Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table).
///
/// Maps each covered glyph to its zero-based coverage index, used by the
/// enclosing subtable to find per-glyph data in a parallel array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    map: std::collections::BTreeMap<GlyphId, u16>,
}

impl Coverage {
    /// The coverage index for this glyph, if it is covered.
    pub fn get(&self, glyph_id: GlyphId) -> Option<u16> {
        self.map.get(&glyph_id).copied()
    }

    /// The number of covered glyphs.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// One more than the largest coverage index produced by this table.
    ///
    /// Any parallel array in the enclosing subtable must have at least this
    /// many elements.
    pub fn index_bound(&self) -> usize {
        self.map
            .values()
            .copied()
            .max()
            .map(|max| max as usize + 1)
            .unwrap_or_default()
    }

    /// Iterate covered glyphs with their coverage indices.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, u16)> + '_ {
        self.map.iter().map(|(gid, idx)| (*gid, *idx))
    }

    /// Check that every coverage index is a valid index into a parallel
    /// array of `len` elements.
    pub(crate) fn check_len(&self, len: usize, what: &'static str) -> Result<(), ReadError> {
        if self.index_bound() > len {
            return Err(ReadError::MalformedData(what));
        }
        Ok(())
    }

    /// Build a coverage table from glyphs already in ascending order,
    /// assigning indices in iteration order.
    pub(crate) fn from_sorted_glyphs(glyphs: impl IntoIterator<Item = GlyphId>) -> Self {
        Coverage {
            map: glyphs
                .into_iter()
                .enumerate()
                .map(|(i, gid)| (gid, i as u16))
                .collect(),
        }
    }
}

/// A glyph range record in a format 2 coverage table.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(packed)]
pub struct RangeRecord {
    start_glyph_id: BigEndian<GlyphId>,
    end_glyph_id: BigEndian<GlyphId>,
    start_coverage_index: BigEndian<u16>,
}

// # SAFETY: all fields are raw big-endian byte arrays with no padding.
unsafe impl bytemuck::Zeroable for RangeRecord {}
unsafe impl bytemuck::AnyBitPattern for RangeRecord {}

impl FixedSize for RangeRecord {
    const RAW_BYTE_LEN: usize = GlyphId::RAW_BYTE_LEN * 2 + u16::RAW_BYTE_LEN;
}

impl<'a> FontRead<'a> for Coverage {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        let count: u16 = data.read_at(2)?;
        let mut map = std::collections::BTreeMap::new();
        match format {
            1 => {
                let glyphs: &[BigEndian<GlyphId>] =
                    data.read_array(4..4 + count as usize * GlyphId::RAW_BYTE_LEN)?;
                for (i, gid) in glyphs.iter().enumerate() {
                    map.insert(gid.get(), i as u16);
                }
            }
            2 => {
                let ranges: &[RangeRecord] =
                    data.read_array(4..4 + count as usize * RangeRecord::RAW_BYTE_LEN)?;
                for range in ranges {
                    let start = range.start_glyph_id.get().to_u16();
                    let end = range.end_glyph_id.get().to_u16();
                    let first_index = range.start_coverage_index.get();
                    if end < start {
                        return Err(ReadError::MalformedData(
                            "coverage range end precedes start",
                        ));
                    }
                    for gid in start..=end {
                        let index = first_index as u32 + (gid - start) as u32;
                        let index = u16::try_from(index).map_err(|_| {
                            ReadError::MalformedData("coverage index exceeds u16 range")
                        })?;
                        map.insert(GlyphId::new(gid), index);
                    }
                }
            }
            other => return Err(ReadError::InvalidFormat(other as _)),
        }
        Ok(Coverage { map })
    }
}

/// A decoded [Class Definition Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table).
///
/// A total classification of glyph ids: glyphs without an entry are in
/// class 0, and class-0 entries are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassDef {
    map: std::collections::BTreeMap<GlyphId, u16>,
}

impl ClassDef {
    /// The class for this glyph; unclassified glyphs are in class 0.
    pub fn get(&self, glyph_id: GlyphId) -> u16 {
        self.map.get(&glyph_id).copied().unwrap_or_default()
    }

    /// Iterate glyphs with a non-zero class.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, u16)> + '_ {
        self.map.iter().map(|(gid, class)| (*gid, *class))
    }

    fn insert(&mut self, glyph_id: GlyphId, class: u16) {
        // class 0 is implicit by absence
        if class != 0 {
            self.map.insert(glyph_id, class);
        }
    }
}

/// A glyph range record in a format 2 class definition table.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(packed)]
pub struct ClassRangeRecord {
    start_glyph_id: BigEndian<GlyphId>,
    end_glyph_id: BigEndian<GlyphId>,
    class: BigEndian<u16>,
}

// # SAFETY: all fields are raw big-endian byte arrays with no padding.
unsafe impl bytemuck::Zeroable for ClassRangeRecord {}
unsafe impl bytemuck::AnyBitPattern for ClassRangeRecord {}

impl FixedSize for ClassRangeRecord {
    const RAW_BYTE_LEN: usize = GlyphId::RAW_BYTE_LEN * 2 + u16::RAW_BYTE_LEN;
}

impl<'a> FontRead<'a> for ClassDef {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        let mut classes = ClassDef::default();
        match format {
            1 => {
                let start_glyph: u16 = data.read_at(2)?;
                let count: u16 = data.read_at(4)?;
                let values: &[BigEndian<u16>] =
                    data.read_array(6..6 + count as usize * u16::RAW_BYTE_LEN)?;
                for (i, class) in values.iter().enumerate() {
                    let gid = start_glyph as u32 + i as u32;
                    let gid = u16::try_from(gid)
                        .map_err(|_| ReadError::MalformedData("class def glyph id overflow"))?;
                    classes.insert(GlyphId::new(gid), class.get());
                }
            }
            2 => {
                let count: u16 = data.read_at(2)?;
                let ranges: &[ClassRangeRecord] =
                    data.read_array(4..4 + count as usize * ClassRangeRecord::RAW_BYTE_LEN)?;
                for range in ranges {
                    let start = range.start_glyph_id.get().to_u16();
                    let end = range.end_glyph_id.get().to_u16();
                    if end < start {
                        return Err(ReadError::MalformedData(
                            "class def range end precedes start",
                        ));
                    }
                    for gid in start..=end {
                        classes.insert(GlyphId::new(gid), range.class.get());
                    }
                }
            }
            other => return Err(ReadError::InvalidFormat(other as _)),
        }
        Ok(classes)
    }
}

/// Per-load decode state for a GSUB or GPOS table.
///
/// Subtables share coverage, class-def, anchor and mark-array data via
/// offsets into the same table; this context memoizes those decodes by
/// offset so each is performed at most once per load. The context is
/// created by `load_gsub`/`load_gpos` and dropped with the load; caches are
/// never shared across fonts.
pub(crate) struct DecodeCtx<'a> {
    data: FontData<'a>,
    tag: Tag,
    coverages: HashMap<usize, Rc<Coverage>>,
    class_defs: HashMap<usize, Rc<ClassDef>>,
    anchors: HashMap<usize, Anchor>,
    mark_arrays: HashMap<usize, Rc<Vec<MarkRecord>>>,
}

impl<'a> DecodeCtx<'a> {
    pub(crate) fn new(data: FontData<'a>, tag: Tag) -> Self {
        DecodeCtx {
            data,
            tag,
            coverages: Default::default(),
            class_defs: Default::default(),
            anchors: Default::default(),
            mark_arrays: Default::default(),
        }
    }

    /// The full table data; subtable offsets index into this.
    pub(crate) fn data(&self) -> FontData<'a> {
        self.data
    }

    pub(crate) fn tag(&self) -> Tag {
        self.tag
    }

    pub(crate) fn malformed<T>(&self, reason: &'static str) -> Result<T, ReadError> {
        Err(ReadError::MalformedTable(self.tag, reason))
    }

    pub(crate) fn coverage(&mut self, offset: usize) -> Result<Rc<Coverage>, ReadError> {
        if let Some(hit) = self.coverages.get(&offset) {
            return Ok(hit.clone());
        }
        let table = self
            .data
            .split_off(offset)
            .ok_or(ReadError::OutOfBounds)
            .and_then(Coverage::read)
            .map_err(|e| e.in_table(self.tag))?;
        let table = Rc::new(table);
        self.coverages.insert(offset, table.clone());
        Ok(table)
    }

    pub(crate) fn class_def(&mut self, offset: usize) -> Result<Rc<ClassDef>, ReadError> {
        if let Some(hit) = self.class_defs.get(&offset) {
            return Ok(hit.clone());
        }
        let table = self
            .data
            .split_off(offset)
            .ok_or(ReadError::OutOfBounds)
            .and_then(ClassDef::read)
            .map_err(|e| e.in_table(self.tag))?;
        let table = Rc::new(table);
        self.class_defs.insert(offset, table.clone());
        Ok(table)
    }

    pub(crate) fn anchor(&mut self, offset: usize) -> Result<Anchor, ReadError> {
        if let Some(hit) = self.anchors.get(&offset) {
            return Ok(*hit);
        }
        let anchor = self
            .data
            .split_off(offset)
            .ok_or(ReadError::OutOfBounds)
            .and_then(Anchor::read)
            .map_err(|e| e.in_table(self.tag))?;
        self.anchors.insert(offset, anchor);
        Ok(anchor)
    }

    pub(crate) fn mark_array(&mut self, offset: usize) -> Result<Rc<Vec<MarkRecord>>, ReadError> {
        if let Some(hit) = self.mark_arrays.get(&offset) {
            return Ok(hit.clone());
        }
        let marks = MarkRecord::read_array(self, offset)?;
        let marks = Rc::new(marks);
        self.mark_arrays.insert(offset, marks.clone());
        Ok(marks)
    }
}

/// The header shared by the GSUB and GPOS tables.
#[derive(Clone)]
pub(crate) struct LayoutTable<'a> {
    data: FontData<'a>,
    tag: Tag,
    script_list_offset: u16,
    feature_list_offset: u16,
    lookup_list_offset: u16,
}

impl<'a> LayoutTable<'a> {
    pub(crate) fn read(data: FontData<'a>, tag: Tag) -> Result<Self, ReadError> {
        let version: MajorMinor = data.read_at(0)?;
        if version.major != 1 {
            return Err(ReadError::UnsupportedVersion(tag, version));
        }
        let script_list_offset = data.read_at(4)?;
        let feature_list_offset = data.read_at(6)?;
        let lookup_list_offset = data.read_at(8)?;
        if version.minor >= 1 {
            let feature_variations_offset: u32 = data.read_at(10)?;
            if feature_variations_offset != 0 {
                return Err(ReadError::Unsupported("feature variations"));
            }
        }
        Ok(LayoutTable {
            data,
            tag,
            script_list_offset,
            feature_list_offset,
            lookup_list_offset,
        })
    }

    /// Resolve (script, language, features) to an ordered lookup index list.
    ///
    /// The result is sorted ascending and free of duplicates: lookups apply
    /// in the order they appear in the font, not the order features listed
    /// them.
    pub(crate) fn select_lookups(
        &self,
        script: Tag,
        language: Tag,
        features: &[Tag],
    ) -> Result<Vec<u16>, ReadError> {
        let Some(script_data) = self.select_script(script)? else {
            return Ok(Vec::new());
        };
        let Some(lang_sys) = select_lang_sys(script_data, language)? else {
            return Ok(Vec::new());
        };
        let required_index: u16 = lang_sys.read_at(2)?;
        let feature_index_count: u16 = lang_sys.read_at(4)?;
        let feature_indices: &[BigEndian<u16>] =
            lang_sys.read_array(6..6 + feature_index_count as usize * u16::RAW_BYTE_LEN)?;

        let mut indices: Vec<u16> = Vec::with_capacity(feature_indices.len() + 1);
        if required_index != 0xFFFF {
            indices.push(required_index);
        }
        indices.extend(feature_indices.iter().map(|idx| idx.get()));

        let feature_list = self
            .data
            .split_off(self.feature_list_offset as usize)
            .ok_or(ReadError::OutOfBounds)?;
        let feature_count: u16 = feature_list.read_at(0)?;

        let mut lookups = Vec::new();
        for index in indices {
            if index >= feature_count {
                return Err(ReadError::MalformedTable(
                    self.tag,
                    "feature index out of bounds",
                ));
            }
            let record_offset = 2 + index as usize * 6;
            let feature_tag: Tag = feature_list.read_at(record_offset)?;
            if index != required_index && !features.contains(&feature_tag) {
                continue;
            }
            let feature_offset: u16 = feature_list.read_at(record_offset + 4)?;
            let feature = feature_list
                .split_off(feature_offset as usize)
                .ok_or(ReadError::OutOfBounds)?;
            let feature_params_offset: u16 = feature.read_at(0)?;
            if feature_params_offset != 0 {
                return Err(ReadError::Unsupported("feature parameters"));
            }
            let lookup_index_count: u16 = feature.read_at(2)?;
            let lookup_indices: &[BigEndian<u16>] =
                feature.read_array(4..4 + lookup_index_count as usize * u16::RAW_BYTE_LEN)?;
            lookups.extend(lookup_indices.iter().map(|idx| idx.get()));
        }
        lookups.sort_unstable();
        lookups.dedup();
        Ok(lookups)
    }

    /// Choose a script record: the exact tag, else `DFLT`, else the first.
    fn select_script(&self, script: Tag) -> Result<Option<FontData<'a>>, ReadError> {
        let script_list = self
            .data
            .split_off(self.script_list_offset as usize)
            .ok_or(ReadError::OutOfBounds)?;
        let count: u16 = script_list.read_at(0)?;
        let mut fallback = None;
        for i in 0..count as usize {
            let record_offset = 2 + i * 6;
            let tag: Tag = script_list.read_at(record_offset)?;
            let offset: u16 = script_list.read_at(record_offset + 4)?;
            if tag == script {
                fallback = Some(offset);
                break;
            }
            if tag == Tag::new(b"DFLT") || (i == 0 && fallback.is_none()) {
                fallback = Some(offset);
            }
        }
        match fallback {
            Some(offset) => script_list
                .split_off(offset as usize)
                .ok_or(ReadError::OutOfBounds)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Decode every lookup in the lookup list, in font order.
    pub(crate) fn read_lookups(
        &self,
        ctx: &mut DecodeCtx<'a>,
        decode: SubtableDecodeFn,
    ) -> Result<Vec<Lookup>, ReadError> {
        let base = self.lookup_list_offset as usize;
        let count: u16 = self.data.read_at(base)?;
        let offsets: &[BigEndian<u16>] = self
            .data
            .read_array(base + 2..base + 2 + count as usize * u16::RAW_BYTE_LEN)?;
        let mut lookups = Vec::with_capacity(count as usize);
        for offset in offsets {
            lookups.push(self.read_lookup(ctx, base + offset.get() as usize, decode)?);
        }
        Ok(lookups)
    }

    fn read_lookup(
        &self,
        ctx: &mut DecodeCtx<'a>,
        offset: usize,
        decode: SubtableDecodeFn,
    ) -> Result<Lookup, ReadError> {
        let mut cursor = self.data.cursor_at(offset);
        let lookup_type: u16 = cursor.read()?;
        let flags = LookupFlag::from_bits_truncate(cursor.read()?);
        let subtable_count: u16 = cursor.read()?;
        let subtable_offsets: &[BigEndian<u16>] = cursor.read_array(subtable_count as usize)?;
        let mark_filtering_set = if flags.use_mark_filtering_set() {
            log::warn!(
                "{} lookup uses a mark filtering set; treating as 'use all glyphs'",
                self.tag
            );
            Some(cursor.read()?)
        } else {
            None
        };
        let mut subtables = Vec::with_capacity(subtable_count as usize);
        for subtable_offset in subtable_offsets {
            subtables.push(decode(
                ctx,
                lookup_type,
                offset + subtable_offset.get() as usize,
            )?);
        }
        Ok(Lookup {
            lookup_type,
            flags,
            mark_filtering_set,
            subtables,
        })
    }
}

/// Choose a LangSys from a script table: the exact tag, else the default.
fn select_lang_sys(script: FontData, language: Tag) -> Result<Option<FontData>, ReadError> {
    let default_offset: u16 = script.read_at(0)?;
    let count: u16 = script.read_at(2)?;
    let mut chosen = None;
    for i in 0..count as usize {
        let record_offset = 4 + i * 6;
        let tag: Tag = script.read_at(record_offset)?;
        if tag == language {
            chosen = Some(script.read_at::<u16>(record_offset + 4)?);
            break;
        }
    }
    if chosen.is_none() && default_offset != 0 {
        chosen = Some(default_offset);
    }
    match chosen {
        Some(offset) => script
            .split_off(offset as usize)
            .ok_or(ReadError::OutOfBounds)
            .map(Some),
        None => Ok(None),
    }
}

/// Decode one subtable of the given lookup type, rooted at `offset`.
pub(crate) type SubtableDecodeFn =
    fn(&mut DecodeCtx, u16, usize) -> Result<LookupSubtable, ReadError>;

/// A typed, flagged collection of subtables applied across a glyph sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup {
    /// The raw lookup type, as numbered by the enclosing table.
    pub lookup_type: u16,
    pub flags: LookupFlag,
    /// Index into GDEF mark glyph sets, when
    /// [`use_mark_filtering_set`](LookupFlag::use_mark_filtering_set) is set.
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<LookupSubtable>,
}

/// The lookups of one GSUB or GPOS table, plus the selection that applies.
///
/// `lookups` holds every lookup in the font's order, since contextual
/// subtables may invoke any of them by index; `active` holds the strictly
/// ascending, de-duplicated indices chosen by script/language/feature
/// resolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupList {
    pub lookups: Vec<Lookup>,
    pub active: Vec<u16>,
    pub(crate) classes: Gdef,
}

impl LookupList {
    /// `true` if applying this list can have no effect.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// A decoded lookup subtable.
///
/// One variant per supported (table, lookup type, format) triple, each
/// carrying only decoded data. Anything outside the supported matrix decodes
/// to [`Unsupported`](LookupSubtable::Unsupported), which never matches.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupSubtable {
    SingleSubst1(super::gsub::SingleSubstFormat1),
    SingleSubst2(super::gsub::SingleSubstFormat2),
    MultipleSubst(super::gsub::MultipleSubstFormat1),
    LigatureSubst(super::gsub::LigatureSubstFormat1),
    SequenceContext(SequenceContextFormat2),
    ChainedContext1(ChainedContextFormat1),
    ChainedContext2(ChainedContextFormat2),
    ChainedContext3(ChainedContextFormat3),
    PairPos1(super::gpos::PairPosFormat1),
    PairPos2(super::gpos::PairPosFormat2),
    MarkBasePos(super::gpos::MarkBasePosFormat1),
    MarkMarkPos(super::gpos::MarkMarkPosFormat1),
    Unsupported(UnsupportedSubtable),
}

/// A placeholder for a (type, format) pair outside the supported matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsupportedSubtable {
    pub lookup_type: u16,
    pub format: u16,
}

/// An action dispatched by a contextual rule: invoke the subtables of
/// lookup `lookup_list_index` once, at matched input position
/// `sequence_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceLookupRecord {
    pub sequence_index: u16,
    pub lookup_list_index: u16,
}

fn read_action_records(
    data: FontData,
    offset: usize,
    count: usize,
) -> Result<Vec<SequenceLookupRecord>, ReadError> {
    let mut cursor = data.cursor_at(offset);
    let mut actions = Vec::with_capacity(count);
    for _ in 0..count {
        let sequence_index = cursor.read()?;
        let lookup_list_index = cursor.read()?;
        actions.push(SequenceLookupRecord {
            sequence_index,
            lookup_list_index,
        });
    }
    Ok(actions)
}

fn read_glyphs(cursor: &mut Cursor, count: usize) -> Result<Vec<GlyphId>, ReadError> {
    let glyphs: &[BigEndian<GlyphId>] = cursor.read_array(count)?;
    Ok(glyphs.iter().map(|g| g.get()).collect())
}

fn read_classes(cursor: &mut Cursor, count: usize) -> Result<Vec<u16>, ReadError> {
    let classes: &[BigEndian<u16>] = cursor.read_array(count)?;
    Ok(classes.iter().map(|c| c.get()).collect())
}

/// One rule of a class-based sequence context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSequenceRule {
    /// Classes of the second and following input glyphs.
    pub input_classes: Vec<u16>,
    pub actions: Vec<SequenceLookupRecord>,
}

/// [Sequence Context Format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#seqctxt2):
/// class-based glyph contexts. GSUB lookup type 5 and GPOS lookup type 7
/// share this decoder.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceContextFormat2 {
    pub coverage: Rc<Coverage>,
    pub class_def: Rc<ClassDef>,
    /// Rule sets, indexed by the class of the first input glyph.
    pub rule_sets: Vec<Option<Vec<ClassSequenceRule>>>,
}

impl SequenceContextFormat2 {
    pub(crate) fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let class_def_offset: u16 = data.read_at(offset + 4)?;
        let rule_set_count: u16 = data.read_at(offset + 6)?;
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        let class_def = ctx.class_def(offset + class_def_offset as usize)?;
        let mut rule_sets = Vec::with_capacity(rule_set_count as usize);
        for i in 0..rule_set_count as usize {
            let rule_set_offset: u16 = data.read_at(offset + 8 + i * 2)?;
            if rule_set_offset == 0 {
                rule_sets.push(None);
                continue;
            }
            let set_base = offset + rule_set_offset as usize;
            let rule_count: u16 = data.read_at(set_base)?;
            let mut rules = Vec::with_capacity(rule_count as usize);
            for j in 0..rule_count as usize {
                let rule_offset: u16 = data.read_at(set_base + 2 + j * 2)?;
                let rule_base = set_base + rule_offset as usize;
                let mut cursor = data.cursor_at(rule_base);
                let glyph_count: u16 = cursor.read()?;
                let action_count: u16 = cursor.read()?;
                if glyph_count == 0 {
                    return ctx.malformed("context rule with no input glyphs");
                }
                let input_classes = read_classes(&mut cursor, glyph_count as usize - 1)?;
                let actions =
                    read_action_records(data, cursor.position()?, action_count as usize)?;
                rules.push(ClassSequenceRule {
                    input_classes,
                    actions,
                });
            }
            rule_sets.push(Some(rules));
        }
        Ok(SequenceContextFormat2 {
            coverage,
            class_def,
            rule_sets,
        })
    }
}

/// One rule of a glyph-based chained context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainedSequenceRule {
    /// Backtrack glyphs, closest to the input first.
    pub backtrack: Vec<GlyphId>,
    /// The second and following input glyphs.
    pub input: Vec<GlyphId>,
    pub lookahead: Vec<GlyphId>,
    pub actions: Vec<SequenceLookupRecord>,
}

/// [Chained Sequence Context Format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#chseqctxt1):
/// simple glyph contexts. GSUB lookup type 6 and GPOS lookup type 8 share
/// this decoder.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainedContextFormat1 {
    pub coverage: Rc<Coverage>,
    /// Rule sets, indexed by the coverage index of the first input glyph.
    pub rule_sets: Vec<Option<Vec<ChainedSequenceRule>>>,
}

impl ChainedContextFormat1 {
    pub(crate) fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let rule_set_count: u16 = data.read_at(offset + 4)?;
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        let mut rule_sets = Vec::with_capacity(rule_set_count as usize);
        for i in 0..rule_set_count as usize {
            let rule_set_offset: u16 = data.read_at(offset + 6 + i * 2)?;
            if rule_set_offset == 0 {
                rule_sets.push(None);
                continue;
            }
            let set_base = offset + rule_set_offset as usize;
            let rule_count: u16 = data.read_at(set_base)?;
            let mut rules = Vec::with_capacity(rule_count as usize);
            for j in 0..rule_count as usize {
                let rule_offset: u16 = data.read_at(set_base + 2 + j * 2)?;
                let mut cursor = data.cursor_at(set_base + rule_offset as usize);
                let backtrack_count: u16 = cursor.read()?;
                let backtrack = read_glyphs(&mut cursor, backtrack_count as usize)?;
                let input_count: u16 = cursor.read()?;
                if input_count == 0 {
                    return ctx.malformed("chained context rule with no input glyphs");
                }
                let input = read_glyphs(&mut cursor, input_count as usize - 1)?;
                let lookahead_count: u16 = cursor.read()?;
                let lookahead = read_glyphs(&mut cursor, lookahead_count as usize)?;
                let action_count: u16 = cursor.read()?;
                let actions =
                    read_action_records(data, cursor.position()?, action_count as usize)?;
                rules.push(ChainedSequenceRule {
                    backtrack,
                    input,
                    lookahead,
                    actions,
                });
            }
            rule_sets.push(Some(rules));
        }
        Ok(ChainedContextFormat1 {
            coverage,
            rule_sets,
        })
    }
}

/// One rule of a class-based chained context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainedClassSequenceRule {
    /// Backtrack classes, closest to the input first.
    pub backtrack: Vec<u16>,
    /// Classes of the second and following input glyphs.
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub actions: Vec<SequenceLookupRecord>,
}

/// [Chained Sequence Context Format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#chseqctxt2):
/// class-based glyph contexts.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainedContextFormat2 {
    pub coverage: Rc<Coverage>,
    pub backtrack_classes: Rc<ClassDef>,
    pub input_classes: Rc<ClassDef>,
    pub lookahead_classes: Rc<ClassDef>,
    /// Rule sets, indexed by the input class of the first input glyph.
    pub rule_sets: Vec<Option<Vec<ChainedClassSequenceRule>>>,
}

impl ChainedContextFormat2 {
    pub(crate) fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let coverage_offset: u16 = data.read_at(offset + 2)?;
        let backtrack_offset: u16 = data.read_at(offset + 4)?;
        let input_offset: u16 = data.read_at(offset + 6)?;
        let lookahead_offset: u16 = data.read_at(offset + 8)?;
        let rule_set_count: u16 = data.read_at(offset + 10)?;
        let coverage = ctx.coverage(offset + coverage_offset as usize)?;
        let backtrack_classes = ctx.class_def(offset + backtrack_offset as usize)?;
        let input_classes = ctx.class_def(offset + input_offset as usize)?;
        let lookahead_classes = ctx.class_def(offset + lookahead_offset as usize)?;
        let mut rule_sets = Vec::with_capacity(rule_set_count as usize);
        for i in 0..rule_set_count as usize {
            let rule_set_offset: u16 = data.read_at(offset + 12 + i * 2)?;
            if rule_set_offset == 0 {
                rule_sets.push(None);
                continue;
            }
            let set_base = offset + rule_set_offset as usize;
            let rule_count: u16 = data.read_at(set_base)?;
            let mut rules = Vec::with_capacity(rule_count as usize);
            for j in 0..rule_count as usize {
                let rule_offset: u16 = data.read_at(set_base + 2 + j * 2)?;
                let mut cursor = data.cursor_at(set_base + rule_offset as usize);
                let backtrack_count: u16 = cursor.read()?;
                let backtrack = read_classes(&mut cursor, backtrack_count as usize)?;
                let input_count: u16 = cursor.read()?;
                if input_count == 0 {
                    return ctx.malformed("chained context rule with no input glyphs");
                }
                let input = read_classes(&mut cursor, input_count as usize - 1)?;
                let lookahead_count: u16 = cursor.read()?;
                let lookahead = read_classes(&mut cursor, lookahead_count as usize)?;
                let action_count: u16 = cursor.read()?;
                let actions =
                    read_action_records(data, cursor.position()?, action_count as usize)?;
                rules.push(ChainedClassSequenceRule {
                    backtrack,
                    input,
                    lookahead,
                    actions,
                });
            }
            rule_sets.push(Some(rules));
        }
        Ok(ChainedContextFormat2 {
            coverage,
            backtrack_classes,
            input_classes,
            lookahead_classes,
            rule_sets,
        })
    }
}

/// [Chained Sequence Context Format 3](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#chseqctxt3):
/// one rule, with a coverage table per context position.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainedContextFormat3 {
    /// Backtrack coverages, closest to the input first.
    pub backtrack: Vec<Rc<Coverage>>,
    pub input: Vec<Rc<Coverage>>,
    pub lookahead: Vec<Rc<Coverage>>,
    pub actions: Vec<SequenceLookupRecord>,
}

impl ChainedContextFormat3 {
    pub(crate) fn read(ctx: &mut DecodeCtx, offset: usize) -> Result<Self, ReadError> {
        let data = ctx.data();
        let mut cursor = data.cursor_at(offset + 2);
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_offsets: &[BigEndian<u16>] = cursor.read_array(backtrack_count as usize)?;
        let input_count: u16 = cursor.read()?;
        if input_count == 0 {
            return ctx.malformed("chained context rule with no input glyphs");
        }
        let input_offsets: &[BigEndian<u16>] = cursor.read_array(input_count as usize)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_offsets: &[BigEndian<u16>] = cursor.read_array(lookahead_count as usize)?;
        let action_count: u16 = cursor.read()?;
        let actions = read_action_records(data, cursor.position()?, action_count as usize)?;

        let mut read_coverages = |offsets: &[BigEndian<u16>]| -> Result<Vec<Rc<Coverage>>, ReadError> {
            offsets
                .iter()
                .map(|off| ctx.coverage(offset + off.get() as usize))
                .collect()
        };
        let backtrack = read_coverages(backtrack_offsets)?;
        let input = read_coverages(input_offsets)?;
        let lookahead = read_coverages(lookahead_offsets)?;
        Ok(ChainedContextFormat3 {
            backtrack,
            input,
            lookahead,
            actions,
        })
    }
}
