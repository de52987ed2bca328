use pretty_assertions::assert_eq;
use types::GlyphId;

use super::*;
use crate::tables::layout::{DecodeCtx, LookupSubtable, SequenceLookupRecord};
use crate::test_helpers::BeBuffer;

fn decode(lookup_type: u16, data: &BeBuffer) -> LookupSubtable {
    let mut ctx = DecodeCtx::new(data.font_data(), TAG);
    read_subtable(&mut ctx, lookup_type, 0).unwrap()
}

#[test]
fn single_subst_format_1() {
    // https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#example-2-singlesubstformat1-subtable
    let data = BeBuffer::new()
        .push(1u16) // format
        .push(6u16) // coverage offset
        .push(192i16) // delta
        // coverage format 1
        .push(1u16)
        .push(1u16)
        .push(0x3Cu16);
    let LookupSubtable::SingleSubst1(table) = decode(1, &data) else {
        panic!("expected a single substitution");
    };
    assert_eq!(table.delta_glyph_id, 192);
    assert_eq!(table.coverage.get(GlyphId::new(0x3C)), Some(0));
}

#[test]
fn single_subst_format_2() {
    let data = BeBuffer::new()
        .push(2u16) // format
        .push(14u16) // coverage offset
        .push(4u16) // glyph count
        .extend([305u16, 309, 318, 323])
        // coverage format 1
        .push(1u16)
        .push(4u16)
        .extend([10u16, 11, 12, 13]);
    let LookupSubtable::SingleSubst2(table) = decode(1, &data) else {
        panic!("expected a single substitution");
    };
    assert_eq!(
        table.substitute_glyph_ids,
        [
            GlyphId::new(305),
            GlyphId::new(309),
            GlyphId::new(318),
            GlyphId::new(323)
        ],
    );
}

#[test]
fn single_subst_format_2_rejects_short_substitute_array() {
    // coverage has four glyphs, substitute array only two
    let data = BeBuffer::new()
        .push(2u16)
        .push(10u16)
        .push(2u16)
        .extend([305u16, 309])
        .push(1u16)
        .push(4u16)
        .extend([10u16, 11, 12, 13]);
    let mut ctx = DecodeCtx::new(data.font_data(), TAG);
    assert!(matches!(
        read_subtable(&mut ctx, 1, 0),
        Err(ReadError::MalformedTable(tag, _)) if tag == TAG
    ));
}

#[test]
fn multiple_subst_format_1() {
    let data = BeBuffer::new()
        .push(1u16) // format
        .push(10u16) // coverage offset
        .push(2u16) // sequence count
        .extend([16u16, 24]) // sequence offsets
        // coverage format 1
        .push(1u16)
        .push(2u16)
        .extend([7u16, 8])
        // sequence 0: three glyphs
        .push(3u16)
        .extend([26u16, 26, 29])
        // sequence 1: empty
        .push(0u16);
    let LookupSubtable::MultipleSubst(table) = decode(2, &data) else {
        panic!("expected a multiple substitution");
    };
    assert_eq!(
        table.sequences,
        [
            vec![GlyphId::new(26), GlyphId::new(26), GlyphId::new(29)],
            vec![]
        ]
    );
}

#[test]
fn ligature_subst_format_1() {
    // one set for glyph 0x28: "f i" -> glyph 347 and "f l" -> glyph 348
    let data = ligature_fixture();
    let LookupSubtable::LigatureSubst(table) = decode(4, &data) else {
        panic!("expected a ligature substitution");
    };
    assert_eq!(table.ligature_sets.len(), 1);
    let set = &table.ligature_sets[0];
    assert_eq!(set.len(), 2);
    assert_eq!(set[0].ligature_glyph, GlyphId::new(347));
    assert_eq!(set[0].component_glyph_ids, [GlyphId::new(0x17)]);
    assert_eq!(set[1].ligature_glyph, GlyphId::new(348));
    assert_eq!(set[1].component_glyph_ids, [GlyphId::new(0x1C)]);
}

pub(crate) fn ligature_fixture() -> BeBuffer {
    BeBuffer::new()
        .push(1u16) // format
        .push(8u16) // coverage offset
        .push(1u16) // ligature set count
        .push(14u16) // set offset
        // coverage format 1: first glyph 0x28
        .push(1u16)
        .push(1u16)
        .push(0x28u16)
        // ligature set @ 14: two ligatures
        .push(2u16)
        .extend([6u16, 12])
        // ligature @ 20: glyph 347, components [0x28, 0x17]
        .push(347u16)
        .push(2u16)
        .push(0x17u16)
        // ligature @ 26: glyph 348, components [0x28, 0x1C]
        .push(348u16)
        .push(2u16)
        .push(0x1Cu16)
}

#[test]
fn ligature_with_zero_components_is_malformed() {
    let data = BeBuffer::new()
        .push(1u16)
        .push(8u16)
        .push(1u16)
        .push(14u16)
        .push(1u16)
        .push(1u16)
        .push(0x28u16)
        // ligature set with one ligature whose component count is 0
        .push(1u16)
        .push(4u16)
        .push(347u16)
        .push(0u16)
        .push(0u16);
    let mut ctx = DecodeCtx::new(data.font_data(), TAG);
    assert_eq!(
        read_subtable(&mut ctx, 4, 0).err(),
        Some(ReadError::MalformedTable(
            TAG,
            "ligature with component count of zero"
        ))
    );
}

#[test]
fn sequence_context_format_2() {
    // first glyph 30 (class 1), tail class 2; one nested action
    let data = BeBuffer::new()
        .push(2u16) // format
        .push(12u16) // coverage offset
        .push(18u16) // class def offset
        .push(2u16) // rule set count
        .extend([0u16, 28]) // rule set offsets (class 0 has none)
        // coverage @ 12
        .push(1u16)
        .push(1u16)
        .push(30u16)
        // class def @ 18: glyphs 30, 31 in classes 1, 2
        .push(1u16)
        .push(30u16)
        .push(2u16)
        .extend([1u16, 2])
        // rule set @ 28, one rule @ +4
        .push(1u16)
        .push(4u16)
        // rule @ 32: two glyphs, one action, tail class [2]
        .push(2u16)
        .push(1u16)
        .push(2u16)
        .extend([0u16, 1]); // action: lookup 1 at input position 0
    let LookupSubtable::SequenceContext(table) = decode(5, &data) else {
        panic!("expected a sequence context");
    };
    assert_eq!(table.coverage.get(GlyphId::new(30)), Some(0));
    assert_eq!(table.class_def.get(GlyphId::new(31)), 2);
    assert_eq!(table.rule_sets.len(), 2);
    assert!(table.rule_sets[0].is_none());
    let rules = table.rule_sets[1].as_ref().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].input_classes, [2]);
    assert_eq!(
        rules[0].actions,
        [SequenceLookupRecord {
            sequence_index: 0,
            lookup_list_index: 1
        }]
    );
}

#[test]
fn chained_context_format_3() {
    let data = BeBuffer::new()
        .push(3u16) // format
        .push(0u16) // backtrack count
        .push(1u16) // input count
        .push(18u16) // input coverage offset
        .push(1u16) // lookahead count
        .push(24u16) // lookahead coverage offset
        .push(1u16) // action count
        .extend([0u16, 5]) // action: lookup 5 at input position 0
        // input coverage @ 18
        .push(1u16)
        .push(1u16)
        .push(30u16)
        // lookahead coverage @ 24
        .push(1u16)
        .push(1u16)
        .push(31u16);
    let LookupSubtable::ChainedContext3(table) = decode(6, &data) else {
        panic!("expected a chained context");
    };
    assert!(table.backtrack.is_empty());
    assert_eq!(table.input.len(), 1);
    assert_eq!(table.input[0].get(GlyphId::new(30)), Some(0));
    assert_eq!(table.lookahead.len(), 1);
    assert_eq!(table.lookahead[0].get(GlyphId::new(31)), Some(0));
    assert_eq!(
        table.actions,
        [SequenceLookupRecord {
            sequence_index: 0,
            lookup_list_index: 5
        }]
    );
}

#[test]
fn chained_context_with_no_input_is_malformed() {
    let data = BeBuffer::new()
        .push(3u16)
        .push(0u16)
        .push(0u16) // input count of zero
        .push(0u16)
        .push(0u16);
    let mut ctx = DecodeCtx::new(data.font_data(), TAG);
    assert!(matches!(
        read_subtable(&mut ctx, 6, 0),
        Err(ReadError::MalformedTable(tag, _)) if tag == TAG
    ));
}

#[test]
fn extension_redirects() {
    // extension wrapper around a single substitution at offset 8
    let data = BeBuffer::new()
        .push(1u16) // format
        .push(1u16) // extension lookup type
        .push(8u32) // extension offset
        // the single subst format 1 subtable
        .push(1u16)
        .push(6u16)
        .push(5i16)
        .push(1u16)
        .push(1u16)
        .push(30u16);
    let LookupSubtable::SingleSubst1(table) = decode(7, &data) else {
        panic!("expected the extension to decode its target");
    };
    assert_eq!(table.delta_glyph_id, 5);
}

#[test]
fn extension_to_extension_is_malformed() {
    let data = BeBuffer::new().push(1u16).push(7u16).push(8u32);
    let mut ctx = DecodeCtx::new(data.font_data(), TAG);
    assert!(matches!(
        read_subtable(&mut ctx, 7, 0),
        Err(ReadError::MalformedTable(tag, _)) if tag == TAG
    ));
}

#[test]
fn unimplemented_types_become_placeholders() {
    // alternate substitution (type 3) is outside the supported matrix
    let data = BeBuffer::new().push(1u16).push(6u16).push(0u16);
    let LookupSubtable::Unsupported(placeholder) = decode(3, &data) else {
        panic!("expected a placeholder");
    };
    assert_eq!(placeholder.lookup_type, 3);
    assert_eq!(placeholder.format, 1);
}

#[test]
fn reverse_chained_format_is_a_placeholder_too() {
    let data = BeBuffer::new().push(1u16).push(0u16);
    assert!(matches!(
        decode(8, &data),
        LookupSubtable::Unsupported(_)
    ));
}
