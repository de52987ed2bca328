//! The [Kerning (kern)](https://docs.microsoft.com/en-us/typography/opentype/spec/kern) table
//!
//! Only version-0 tables with format-0 (sorted pair list) subtables are
//! decoded; everything else is skipped. The decoded pair map is usually
//! consumed through [`kern_as_lookup`](crate::shape::kern_as_lookup), which
//! re-expresses it as a pair-adjustment lookup so the shaping engine needs
//! no special handling for legacy kerning.

use std::collections::BTreeMap;

use types::{BigEndian, FixedSize, GlyphId, MajorMinor, Tag};

use crate::{FontData, FontRead, ReadError};

/// 'kern'
pub const TAG: Tag = Tag::new(b"kern");

/// The kerning table.
#[derive(Clone)]
pub struct Kern<'a> {
    data: FontData<'a>,
    n_tables: u16,
}

impl<'a> FontRead<'a> for Kern<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: u16 = data.read_at(0)?;
        if version != 0 {
            return Err(ReadError::UnsupportedVersion(
                TAG,
                MajorMinor::new(version, 0),
            ));
        }
        let n_tables: u16 = data.read_at(2)?;
        Ok(Kern {
            data: data.split_off(4).ok_or(ReadError::OutOfBounds)?,
            n_tables,
        })
    }
}

impl<'a> Kern<'a> {
    /// Returns an iterator over all of the subtables in this `kern` table.
    pub fn subtables(&self) -> impl Iterator<Item = Result<Subtable<'a>, ReadError>> + 'a {
        Subtables {
            data: self.data,
            n_tables: self.n_tables,
            seen: 0,
        }
    }

    /// Accumulate every horizontal format-0 subtable into a pair map.
    ///
    /// The subtable coverage flags choose how a pair combines with the value
    /// accumulated by earlier subtables: "override" replaces it, "minimum"
    /// keeps the larger value, and the default adds.
    pub fn pair_map(&self) -> Result<BTreeMap<(GlyphId, GlyphId), i16>, ReadError> {
        let mut pairs = BTreeMap::new();
        for subtable in self.subtables() {
            let subtable = subtable?;
            if !subtable.is_horizontal() || subtable.is_cross_stream() {
                continue;
            }
            let Some(format0) = subtable.format0()? else {
                continue;
            };
            for pair in format0.pairs() {
                let key = (pair.left(), pair.right());
                let value = pair.value();
                pairs
                    .entry(key)
                    .and_modify(|current: &mut i16| {
                        if subtable.is_override() {
                            *current = value;
                        } else if subtable.is_minimum() {
                            *current = (*current).max(value);
                        } else {
                            *current = current.saturating_add(value);
                        }
                    })
                    .or_insert(value);
            }
        }
        Ok(pairs)
    }
}

/// Iterator over the subtables of a `kern` table.
struct Subtables<'a> {
    data: FontData<'a>,
    n_tables: u16,
    seen: u16,
}

impl<'a> Iterator for Subtables<'a> {
    type Item = Result<Subtable<'a>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.seen == self.n_tables {
            return None;
        }
        self.seen += 1;
        let len = match self.data.read_at::<u16>(2) {
            Ok(len) => len as usize,
            Err(e) => return Some(Err(e)),
        };
        if len < Subtable::HEADER_LEN {
            return Some(Err(ReadError::MalformedTable(
                TAG,
                "kern subtable length shorter than its header",
            )));
        }
        let data = self.data.take_up_to(len)?;
        Some(Ok(Subtable { data }))
    }
}

/// A subtable in the `kern` table.
#[derive(Clone)]
pub struct Subtable<'a> {
    data: FontData<'a>,
}

impl<'a> Subtable<'a> {
    // version, length and coverage: all u16
    const HEADER_LEN: usize = u16::RAW_BYTE_LEN * 3;

    fn coverage(&self) -> u16 {
        self.data.read_at(4).unwrap_or_default()
    }

    /// True if the table has horizontal kerning values.
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.coverage() & (1 << 0) != 0
    }

    /// True if the table values are minimums rather than adjustments.
    #[inline]
    pub fn is_minimum(&self) -> bool {
        self.coverage() & (1 << 1) != 0
    }

    /// True if the table has cross-stream kerning values.
    #[inline]
    pub fn is_cross_stream(&self) -> bool {
        self.coverage() & (1 << 2) != 0
    }

    /// True if the table values replace accumulated values.
    #[inline]
    pub fn is_override(&self) -> bool {
        self.coverage() & (1 << 3) != 0
    }

    /// The subtable format.
    #[inline]
    pub fn format(&self) -> u8 {
        ((self.coverage() & 0xFF00) >> 8) as u8
    }

    /// The format-0 payload, if this subtable is format 0.
    pub fn format0(&self) -> Result<Option<Subtable0<'a>>, ReadError> {
        if self.format() != 0 {
            return Ok(None);
        }
        let data = self
            .data
            .split_off(Self::HEADER_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        Subtable0::read(data).map(Some)
    }
}

/// A format 0 (sorted pair list) kern subtable.
#[derive(Clone)]
pub struct Subtable0<'a> {
    pairs: &'a [KernPair],
}

impl<'a> FontRead<'a> for Subtable0<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let n_pairs: u16 = data.read_at(0)?;
        // nPairs, searchRange, entrySelector, rangeShift
        let pairs_start = 8;
        let pairs = data
            .read_array(pairs_start..pairs_start + n_pairs as usize * KernPair::RAW_BYTE_LEN)?;
        Ok(Subtable0 { pairs })
    }
}

impl<'a> Subtable0<'a> {
    /// The pair records, sorted by (left, right).
    pub fn pairs(&self) -> &'a [KernPair] {
        self.pairs
    }

    /// Returns the kerning adjustment for the given pair.
    pub fn kerning(&self, left: GlyphId, right: GlyphId) -> Option<i16> {
        self.pairs
            .binary_search_by_key(&(left, right), |pair| (pair.left(), pair.right()))
            .ok()
            .map(|ix| self.pairs[ix].value())
    }
}

/// A glyph pair and its kerning adjustment.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(packed)]
pub struct KernPair {
    left: BigEndian<GlyphId>,
    right: BigEndian<GlyphId>,
    value: BigEndian<i16>,
}

// # SAFETY: all fields are raw big-endian byte arrays with no padding.
unsafe impl bytemuck::Zeroable for KernPair {}
unsafe impl bytemuck::AnyBitPattern for KernPair {}

impl FixedSize for KernPair {
    const RAW_BYTE_LEN: usize = GlyphId::RAW_BYTE_LEN * 2 + i16::RAW_BYTE_LEN;
}

impl KernPair {
    pub fn left(&self) -> GlyphId {
        self.left.get()
    }

    pub fn right(&self) -> GlyphId {
        self.right.get()
    }

    pub fn value(&self) -> i16 {
        self.value.get()
    }
}

// the fonttools kern test table: one horizontal format 0 subtable
#[cfg(test)]
#[rustfmt::skip]
pub(crate) static KERN_VER_0_FMT_0_DATA: &[u8] = &[
    0x00, 0x00, // version=0
    0x00, 0x01, // nTables=1
    0x00, 0x00, // subtable version (unused)
    0x00, 0x20, // length=32
    0x00,       // format=0
    0x01,       // coverage=1 (horizontal)
    0x00, 0x03, // nPairs=3
    0x00, 0x0C, // searchRange=12
    0x00, 0x01, // entrySelector=1
    0x00, 0x06, // rangeShift=6
    0x00, 0x04, 0x00, 0x0C, 0xFF, 0xD8, // l=4, r=12, v=-40
    0x00, 0x04, 0x00, 0x1C, 0x00, 0x28, // l=4, r=28, v=40
    0x00, 0x05, 0x00, 0x28, 0xFF, 0xCE, // l=5, r=40, v=-50
];
