//! Applying layout lookups across a glyph sequence.
//!
//! [`load_gsub`]/[`load_gpos`] resolve a (script, language, features)
//! selection over a font into a [`LookupList`] of decoded lookups; [`shape`]
//! drives the selected lookups across a mutable glyph run, honoring lookup
//! flags and GDEF glyph classes. [`Shaper`] bundles the two with hmtx
//! advances for the common substitute-then-position pipeline.

mod apply;
mod filter;
mod plan;
mod shaper;

#[cfg(test)]
#[path = "tests/test_shape.rs"]
mod tests;

pub use plan::{kern_as_lookup, load_gpos, load_gsub};
pub use shaper::Shaper;

pub use crate::tables::layout::{Lookup, LookupList, LookupSubtable};

use types::GlyphId;

/// A positioned glyph in a shaped run.
///
/// Substitution rewrites `gid` (and `text`, which follows the glyphs that
/// produced it); positioning adjusts `advance` and the offsets in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapedGlyph {
    pub gid: GlyphId,
    /// The code points this glyph represents.
    pub text: Vec<char>,
    /// Advance width, in font design units.
    pub advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Baseline displacement. Shaping never touches this; it is carried for
    /// layers that raise or lower glyphs (superscripts, inline rules).
    pub rise: i32,
}

impl ShapedGlyph {
    /// A glyph with the given id and text, with zeroed metrics.
    pub fn new(gid: GlyphId, text: impl IntoIterator<Item = char>) -> Self {
        ShapedGlyph {
            gid,
            text: text.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// An error produced while applying lookups.
///
/// Decode problems surface earlier, from `load_gsub`/`load_gpos`; by the
/// time lookups apply, the only failures are the defined limits of the
/// engine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// A lookup nested in a contextual rule tried to change the length of
    /// the glyph sequence (for instance a ligature inside a context).
    NestedLengthChange,
    /// The operation budget was exhausted; see [`shape_with_budget`].
    BudgetExhausted,
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::NestedLengthChange => {
                write!(f, "a nested lookup changed the sequence length")
            }
            ShapeError::BudgetExhausted => write!(f, "shaping operation budget exhausted"),
        }
    }
}

impl std::error::Error for ShapeError {}

/// The default [`shape_with_budget`] budget: far beyond any reasonable run,
/// small enough to bound hostile contextual chains.
pub(crate) const DEFAULT_BUDGET: usize = 1 << 20;

/// Apply a lookup list to a glyph sequence, in place.
pub fn shape(glyphs: &mut Vec<ShapedGlyph>, lookups: &LookupList) -> Result<(), ShapeError> {
    shape_with_budget(glyphs, lookups, DEFAULT_BUDGET)
}

/// [`shape`], with an explicit ceiling on subtable applications.
pub fn shape_with_budget(
    glyphs: &mut Vec<ShapedGlyph>,
    lookups: &LookupList,
    budget: usize,
) -> Result<(), ShapeError> {
    apply::apply_all(lookups, glyphs, budget)
}
