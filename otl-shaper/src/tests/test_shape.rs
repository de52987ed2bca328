use std::collections::BTreeMap;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use types::{GlyphId, MajorMinor, Tag};

use super::*;
use crate::tables::gdef::Gdef;
use crate::tables::gpos::{Anchor, MarkBasePosFormat1, MarkRecord};
use crate::tables::gsub::{
    Ligature, LigatureSubstFormat1, MultipleSubstFormat1, SingleSubstFormat1,
};
use crate::tables::layout::{
    ChainedContextFormat1, ChainedContextFormat3, ChainedSequenceRule, ClassDef,
    ClassSequenceRule, Coverage, LookupFlag, SequenceContextFormat2, SequenceLookupRecord,
};
use crate::test_helpers::BeBuffer;
use crate::{FontData, FontRead, TableProvider};

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

fn glyph(raw: u16) -> ShapedGlyph {
    ShapedGlyph::new(gid(raw), [])
}

fn coverage(glyphs: impl IntoIterator<Item = u16>) -> Rc<Coverage> {
    Rc::new(Coverage::from_sorted_glyphs(
        glyphs.into_iter().map(GlyphId::new),
    ))
}

fn lookup_list(lookups: Vec<Lookup>, classes: Gdef) -> LookupList {
    let active = (0..lookups.len() as u16).collect();
    LookupList {
        lookups,
        active,
        classes,
    }
}

fn lookup(subtable: LookupSubtable) -> Lookup {
    Lookup {
        lookup_type: 0,
        flags: LookupFlag::empty(),
        mark_filtering_set: None,
        subtables: vec![subtable],
    }
}

/// GDEF classifying glyph 90 as a mark, everything else unclassified.
fn mark_classes() -> Gdef {
    let data = BeBuffer::new()
        .push(MajorMinor::VERSION_1_0)
        .push(12u16)
        .push(0u16)
        .push(0u16)
        .push(0u16)
        .push(1u16)
        .push(90u16)
        .push(1u16)
        .push(3u16);
    Gdef::read(data.font_data()).unwrap()
}

#[test]
fn kern_adapter_adjusts_the_left_advance() {
    let mut pairs = BTreeMap::new();
    pairs.insert((gid(3), gid(5)), -40i16);
    let lookups = kern_as_lookup(pairs);

    let mut glyphs = vec![glyph(3), glyph(5)];
    glyphs[0].advance = 500;
    glyphs[1].advance = 600;
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].advance, 460);
    assert_eq!(glyphs[1].advance, 600);
    // unrelated pairs are untouched
    let mut others = vec![glyph(5), glyph(3)];
    others[0].advance = 600;
    others[1].advance = 500;
    shape(&mut others, &lookups).unwrap();
    assert_eq!(others[0].advance, 600);
    assert_eq!(others[1].advance, 500);
}

#[test]
fn single_substitution_with_delta() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::SingleSubst1(SingleSubstFormat1 {
            coverage: coverage([7, 65530]),
            delta_glyph_id: 10,
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![glyph(7), glyph(8), glyph(65530)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].gid, gid(17));
    assert_eq!(glyphs[1].gid, gid(8));
    // modulo 65536
    assert_eq!(glyphs[2].gid, gid(4));
}

#[test]
fn ligature_consumes_components_and_concatenates_text() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::LigatureSubst(LigatureSubstFormat1 {
            coverage: coverage([1]),
            ligature_sets: vec![vec![Ligature {
                ligature_glyph: gid(100),
                component_glyph_ids: vec![gid(2)],
            }]],
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![
        ShapedGlyph::new(gid(1), ['f']),
        ShapedGlyph::new(gid(2), ['i']),
        ShapedGlyph::new(gid(3), ['x']),
    ];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[0].gid, gid(100));
    assert_eq!(glyphs[0].text, ['f', 'i']);
    assert_eq!(glyphs[1].text, ['x']);
}

#[test]
fn ligature_scan_resumes_after_the_output_glyph() {
    // the output glyph is itself covered; if scanning resumed on it, the
    // rule would fire a second time
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::LigatureSubst(LigatureSubstFormat1 {
            coverage: coverage([1]),
            ligature_sets: vec![vec![Ligature {
                ligature_glyph: gid(1),
                component_glyph_ids: vec![gid(2)],
            }]],
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![glyph(1), glyph(2), glyph(2)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(
        glyphs.iter().map(|g| g.gid).collect::<Vec<_>>(),
        [gid(1), gid(2)]
    );
}

#[test]
fn ligature_skips_marks_and_keeps_them() {
    let mut lig = lookup(LookupSubtable::LigatureSubst(LigatureSubstFormat1 {
        coverage: coverage([1]),
        ligature_sets: vec![vec![Ligature {
            ligature_glyph: gid(100),
            component_glyph_ids: vec![gid(2)],
        }]],
    }));
    lig.flags = LookupFlag::from_bits_truncate(0x0008); // IGNORE_MARKS
    let lookups = lookup_list(vec![lig], mark_classes());
    let mut glyphs = vec![glyph(1), glyph(90), glyph(2)];
    shape(&mut glyphs, &lookups).unwrap();
    // the mark in the middle is skipped by matching but stays in the run
    assert_eq!(
        glyphs.iter().map(|g| g.gid).collect::<Vec<_>>(),
        [gid(100), gid(90)]
    );
}

#[test]
fn multiple_substitution_carries_text_to_the_first_glyph() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::MultipleSubst(MultipleSubstFormat1 {
            coverage: coverage([7]),
            sequences: vec![vec![gid(26), gid(29)]],
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![ShapedGlyph::new(gid(7), ['a'])];
    glyphs[0].advance = 450;
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[0].gid, gid(26));
    assert_eq!(glyphs[0].text, ['a']);
    assert_eq!(glyphs[0].advance, 450);
    assert_eq!(glyphs[1].gid, gid(29));
    assert_eq!(glyphs[1].text, []);
}

#[test]
fn empty_multiple_substitution_deletes_the_glyph() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::MultipleSubst(MultipleSubstFormat1 {
            coverage: coverage([7]),
            sequences: vec![vec![]],
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![ShapedGlyph::new(gid(7), ['a']), glyph(8)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs.len(), 1);
    assert_eq!(glyphs[0].gid, gid(8));
}

#[test]
fn mark_attaches_to_the_preceding_base() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::MarkBasePos(MarkBasePosFormat1 {
            mark_coverage: coverage([20]),
            base_coverage: coverage([4]),
            mark_class_count: 1,
            marks: Rc::new(vec![MarkRecord {
                mark_class: 0,
                anchor: Anchor { x: 30, y: 380 },
            }]),
            base_anchors: vec![vec![Some(Anchor { x: 250, y: 400 })]],
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![glyph(4), glyph(20)];
    glyphs[0].advance = 500;
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[1].x_offset, -500 + 250 - 30);
    assert_eq!(glyphs[1].y_offset, 400 - 380);
    // the mark's advance is left untouched
    assert_eq!(glyphs[1].advance, 0);
}

fn chained3_with_nested_single() -> LookupList {
    // context: [5] [6] followed by [7]; rewrites the 5 to an 8
    let context = lookup(LookupSubtable::ChainedContext3(ChainedContextFormat3 {
        backtrack: vec![],
        input: vec![coverage([5]), coverage([6])],
        lookahead: vec![coverage([7])],
        actions: vec![SequenceLookupRecord {
            sequence_index: 0,
            lookup_list_index: 1,
        }],
    }));
    let nested = lookup(LookupSubtable::SingleSubst1(SingleSubstFormat1 {
        coverage: coverage([5]),
        delta_glyph_id: 3,
    }));
    LookupList {
        lookups: vec![context, nested],
        active: vec![0],
        classes: Gdef::default(),
    }
}

#[test]
fn chained_context_dispatches_nested_lookups() {
    let lookups = chained3_with_nested_single();
    let mut glyphs = vec![glyph(5), glyph(6), glyph(7)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(
        glyphs.iter().map(|g| g.gid).collect::<Vec<_>>(),
        [gid(8), gid(6), gid(7)]
    );
    // missing lookahead: no match
    let mut glyphs = vec![glyph(5), glyph(6), glyph(9)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].gid, gid(5));
}

#[test]
fn class_context_dispatches_nested_lookups() {
    // glyphs 30, 31 in classes 1, 2
    let class_def = ClassDef::read(
        BeBuffer::new()
            .push(1u16)
            .push(30u16)
            .push(2u16)
            .extend([1u16, 2])
            .font_data(),
    )
    .unwrap();
    let context = lookup(LookupSubtable::SequenceContext(SequenceContextFormat2 {
        coverage: coverage([30]),
        class_def: Rc::new(class_def),
        rule_sets: vec![
            None,
            Some(vec![ClassSequenceRule {
                input_classes: vec![2],
                actions: vec![SequenceLookupRecord {
                    sequence_index: 0,
                    lookup_list_index: 1,
                }],
            }]),
        ],
    }));
    let nested = lookup(LookupSubtable::SingleSubst1(SingleSubstFormat1 {
        coverage: coverage([30]),
        delta_glyph_id: 10,
    }));
    let lookups = LookupList {
        lookups: vec![context, nested],
        active: vec![0],
        classes: Gdef::default(),
    };
    let mut glyphs = vec![glyph(30), glyph(31)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].gid, gid(40));
    // a tail glyph of the wrong class does not match
    let mut glyphs = vec![glyph(30), glyph(32)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].gid, gid(30));
}

#[test]
fn chained_rule_requires_its_backtrack() {
    let context = lookup(LookupSubtable::ChainedContext1(ChainedContextFormat1 {
        coverage: coverage([20]),
        rule_sets: vec![Some(vec![ChainedSequenceRule {
            backtrack: vec![gid(10)],
            input: vec![gid(21)],
            lookahead: vec![],
            actions: vec![SequenceLookupRecord {
                sequence_index: 0,
                lookup_list_index: 1,
            }],
        }])],
    }));
    let nested = lookup(LookupSubtable::SingleSubst1(SingleSubstFormat1 {
        coverage: coverage([20]),
        delta_glyph_id: 79,
    }));
    let lookups = LookupList {
        lookups: vec![context, nested],
        active: vec![0],
        classes: Gdef::default(),
    };
    let mut glyphs = vec![glyph(10), glyph(20), glyph(21)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(
        glyphs.iter().map(|g| g.gid).collect::<Vec<_>>(),
        [gid(10), gid(99), gid(21)]
    );
    // without the backtrack glyph, nothing fires
    let mut glyphs = vec![glyph(20), glyph(21)];
    shape(&mut glyphs, &lookups).unwrap();
    assert_eq!(glyphs[0].gid, gid(20));
}

#[test]
fn nested_lookups_must_not_resize_the_sequence() {
    let context = lookup(LookupSubtable::ChainedContext3(ChainedContextFormat3 {
        backtrack: vec![],
        input: vec![coverage([5])],
        lookahead: vec![],
        actions: vec![SequenceLookupRecord {
            sequence_index: 0,
            lookup_list_index: 1,
        }],
    }));
    let nested = lookup(LookupSubtable::MultipleSubst(MultipleSubstFormat1 {
        coverage: coverage([5]),
        sequences: vec![vec![gid(1), gid(2)]],
    }));
    let lookups = LookupList {
        lookups: vec![context, nested],
        active: vec![0],
        classes: Gdef::default(),
    };
    let mut glyphs = vec![glyph(5)];
    assert_eq!(
        shape(&mut glyphs, &lookups),
        Err(ShapeError::NestedLengthChange)
    );
}

#[test]
fn budget_bounds_the_work() {
    let lookups = lookup_list(
        vec![lookup(LookupSubtable::SingleSubst1(SingleSubstFormat1 {
            coverage: coverage([7]),
            delta_glyph_id: 1,
        }))],
        Gdef::default(),
    );
    let mut glyphs = vec![glyph(7), glyph(7), glyph(7)];
    assert_eq!(
        shape_with_budget(&mut glyphs, &lookups, 2),
        Err(ShapeError::BudgetExhausted)
    );
    let mut glyphs = vec![glyph(7), glyph(7), glyph(7)];
    assert_eq!(shape_with_budget(&mut glyphs, &lookups, 3), Ok(()));
}

/// A minimal font served straight from table byte buffers.
struct TestFont<'a> {
    tables: Vec<(Tag, &'a [u8])>,
}

impl<'a> TableProvider<'a> for TestFont<'a> {
    fn data_for_tag(&self, tag: Tag) -> Option<FontData<'a>> {
        self.tables
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, data)| FontData::new(data))
    }
}

#[test]
fn shaper_falls_back_to_legacy_kern() {
    let maxp = BeBuffer::new().push(0x00005000u32).push(41u16);
    // hhea with one long metric entry
    let hhea = BeBuffer::new()
        .push(MajorMinor::VERSION_1_0)
        .extend([0i16; 14])
        .push(0i16) // metric data format
        .push(1u16); // number of h metrics
    // every glyph advances 500
    let hmtx = BeBuffer::new().push(500u16).push(0i16).extend([0i16; 40]);
    let kern = crate::tables::kern::KERN_VER_0_FMT_0_DATA;

    let font = TestFont {
        tables: vec![
            (Tag::new(b"maxp"), &maxp[..]),
            (Tag::new(b"hhea"), &hhea[..]),
            (Tag::new(b"hmtx"), &hmtx[..]),
            (Tag::new(b"kern"), kern),
        ],
    };
    let shaper = Shaper::new(
        &font,
        Tag::new(b"latn"),
        Tag::new(b"dflt"),
        &[Tag::new(b"kern")],
    )
    .unwrap();
    let mut glyphs = vec![shaper.glyph(gid(4), ['A']), shaper.glyph(gid(12), ['V'])];
    assert_eq!(glyphs[0].advance, 500);
    shaper.shape(&mut glyphs).unwrap();
    assert_eq!(glyphs[0].advance, 460);
    assert_eq!(glyphs[1].advance, 500);
}

#[test]
fn missing_tables_shape_to_a_no_op() {
    let font = TestFont { tables: vec![] };
    let shaper = Shaper::new(
        &font,
        Tag::new(b"latn"),
        Tag::new(b"dflt"),
        &[Tag::new(b"liga"), Tag::new(b"kern")],
    )
    .unwrap();
    let mut glyphs = vec![ShapedGlyph::new(gid(3), ['a'])];
    shaper.shape(&mut glyphs).unwrap();
    assert_eq!(glyphs, vec![ShapedGlyph::new(gid(3), ['a'])]);
}
