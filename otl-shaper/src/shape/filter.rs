//! The used-glyph predicate built from lookup flags and GDEF classes.

use crate::tables::gdef::{Gdef, BASE_GLYPH, LIGATURE_GLYPH, MARK_GLYPH};
use crate::tables::layout::LookupFlag;

use super::ShapedGlyph;

/// Decides which glyphs one lookup considers; the rest are skipped (not
/// removed) by matching and positioning.
pub(crate) struct GlyphFilter<'a> {
    classes: &'a Gdef,
    skip_mask: u16,
    mark_attach_class: u16,
}

impl<'a> GlyphFilter<'a> {
    pub(crate) fn new(flags: LookupFlag, classes: &'a Gdef) -> Self {
        // skip bits only apply to classes GDEF actually provides
        let mut skip_mask = 0;
        if classes.has_glyph_classes() {
            if flags.ignore_marks() {
                // IGNORE_MARKS wins over the other ignore bits
                skip_mask = MARK_GLYPH;
            } else {
                if flags.ignore_base_glyphs() {
                    skip_mask |= BASE_GLYPH;
                }
                if flags.ignore_ligatures() {
                    skip_mask |= LIGATURE_GLYPH;
                }
            }
        }
        let mark_attach_class = if classes.has_mark_attach_classes() {
            flags.mark_attachment_type_mask().unwrap_or_default()
        } else {
            0
        };
        GlyphFilter {
            classes,
            skip_mask,
            mark_attach_class,
        }
    }

    /// `true` if this lookup considers the glyph.
    pub(crate) fn keep(&self, glyph: &ShapedGlyph) -> bool {
        let class_mask = self.classes.glyph_class_mask(glyph.gid);
        if class_mask & self.skip_mask != 0 {
            return false;
        }
        if self.mark_attach_class != 0
            && class_mask == MARK_GLYPH
            && self.classes.mark_attach_class(glyph.gid) != self.mark_attach_class
        {
            return false;
        }
        true
    }

    /// The first kept position at or after `from`.
    pub(crate) fn next(&self, glyphs: &[ShapedGlyph], from: usize) -> Option<usize> {
        (from..glyphs.len()).find(|&ix| self.keep(&glyphs[ix]))
    }

    /// The last kept position before `from`.
    pub(crate) fn prev(&self, glyphs: &[ShapedGlyph], from: usize) -> Option<usize> {
        (0..from.min(glyphs.len())).rev().find(|&ix| self.keep(&glyphs[ix]))
    }
}

#[cfg(test)]
mod tests {
    use types::{GlyphId, MajorMinor};

    use super::*;
    use crate::test_helpers::BeBuffer;
    use crate::FontRead;

    // glyphs 1..=3 are base, mark, ligature; mark attach class of glyph 2 is 5
    fn classes() -> Gdef {
        let gdef = BeBuffer::new()
            .push(MajorMinor::VERSION_1_0)
            .push(12u16) // glyphClassDefOffset
            .push(0u16)
            .push(0u16)
            .push(24u16) // markAttachClassDefOffset
            // GlyphClassDef, format 1
            .push(1u16)
            .push(1u16)
            .push(3u16)
            .extend([1u16, 3, 2])
            // MarkAttachClassDef, format 1
            .push(1u16)
            .push(2u16)
            .push(1u16)
            .push(5u16);
        Gdef::read(gdef.font_data()).unwrap()
    }

    fn run() -> Vec<ShapedGlyph> {
        [1u16, 2, 3]
            .into_iter()
            .map(|gid| ShapedGlyph::new(GlyphId::new(gid), []))
            .collect()
    }

    #[test]
    fn ignore_marks() {
        let classes = classes();
        let filter = GlyphFilter::new(LookupFlag::from_bits_truncate(0x0008), &classes);
        let glyphs = run();
        assert!(filter.keep(&glyphs[0]));
        assert!(!filter.keep(&glyphs[1]));
        assert_eq!(filter.next(&glyphs, 1), Some(2));
        assert_eq!(filter.prev(&glyphs, 2), Some(0));
    }

    #[test]
    fn ignore_marks_wins_over_other_ignores() {
        let classes = classes();
        // IGNORE_BASE | IGNORE_LIGATURES | IGNORE_MARKS: only marks skip
        let filter = GlyphFilter::new(LookupFlag::from_bits_truncate(0x000E), &classes);
        let glyphs = run();
        assert!(filter.keep(&glyphs[0]));
        assert!(!filter.keep(&glyphs[1]));
        assert!(filter.keep(&glyphs[2]));
    }

    #[test]
    fn mark_attachment_class() {
        let classes = classes();
        // require mark attachment class 5: glyph 2 keeps
        let filter = GlyphFilter::new(LookupFlag::from_bits_truncate(5 << 8), &classes);
        assert!(filter.keep(&ShapedGlyph::new(GlyphId::new(2), [])));
        // require class 6: glyph 2 skips, non-marks unaffected
        let filter = GlyphFilter::new(LookupFlag::from_bits_truncate(6 << 8), &classes);
        assert!(!filter.keep(&ShapedGlyph::new(GlyphId::new(2), [])));
        assert!(filter.keep(&ShapedGlyph::new(GlyphId::new(1), [])));
    }

    #[test]
    fn no_gdef_keeps_everything() {
        let classes = Gdef::default();
        let filter = GlyphFilter::new(LookupFlag::from_bits_truncate(0x000E), &classes);
        assert!(filter.keep(&ShapedGlyph::new(GlyphId::new(2), [])));
    }
}
