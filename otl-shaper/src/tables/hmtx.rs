//! The [hmtx (Horizontal Metrics)](https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx) table

use types::{BigEndian, FixedSize, GlyphId, Tag};

use crate::{FontData, FontReadWithArgs, ReadArgs, ReadError};

/// 'hmtx'
pub const TAG: Tag = Tag::new(b"hmtx");

/// An advance width and left side bearing for one glyph.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(packed)]
pub struct LongMetric {
    advance: BigEndian<u16>,
    side_bearing: BigEndian<i16>,
}

// # SAFETY: all fields are raw big-endian byte arrays with no padding.
unsafe impl bytemuck::Zeroable for LongMetric {}
unsafe impl bytemuck::AnyBitPattern for LongMetric {}

impl FixedSize for LongMetric {
    const RAW_BYTE_LEN: usize = u16::RAW_BYTE_LEN + i16::RAW_BYTE_LEN;
}

impl LongMetric {
    /// Advance width, in font design units.
    pub fn advance(&self) -> u16 {
        self.advance.get()
    }

    /// Glyph left side bearing, in font design units.
    pub fn side_bearing(&self) -> i16 {
        self.side_bearing.get()
    }
}

/// The horizontal metrics table.
///
/// `number_of_h_metrics` long entries are followed by bare side bearings for
/// the remaining glyphs, which all share the last entry's advance.
#[derive(Clone)]
pub struct Hmtx<'a> {
    long_metrics: &'a [LongMetric],
    bearings: &'a [BigEndian<i16>],
}

impl ReadArgs for Hmtx<'_> {
    /// (number_of_h_metrics from hhea, num_glyphs from maxp)
    type Args = (u16, u16);
}

impl<'a> FontReadWithArgs<'a> for Hmtx<'a> {
    fn read_with_args(data: FontData<'a>, args: &Self::Args) -> Result<Self, ReadError> {
        let (number_of_h_metrics, num_glyphs) = *args;
        let long_len = number_of_h_metrics as usize * LongMetric::RAW_BYTE_LEN;
        let long_metrics = data.read_array(0..long_len)?;
        let bearing_count = num_glyphs.saturating_sub(number_of_h_metrics) as usize;
        let bearings =
            data.read_array(long_len..long_len + bearing_count * i16::RAW_BYTE_LEN)?;
        Ok(Hmtx {
            long_metrics,
            bearings,
        })
    }
}

impl<'a> Hmtx<'a> {
    /// The long metric entries.
    pub fn long_metrics(&self) -> &'a [LongMetric] {
        self.long_metrics
    }

    /// Side bearings for the glyphs past the long metric entries.
    pub fn bearings(&self) -> &'a [BigEndian<i16>] {
        self.bearings
    }

    /// Returns the advance width for the given glyph identifier.
    pub fn advance(&self, glyph_id: GlyphId) -> Option<u16> {
        self.long_metrics
            .get(glyph_id.to_usize())
            .or_else(|| self.long_metrics.last())
            .map(|metric| metric.advance())
    }

    /// Returns the left side bearing for the given glyph identifier.
    pub fn side_bearing(&self, glyph_id: GlyphId) -> Option<i16> {
        let ix = glyph_id.to_usize();
        self.long_metrics
            .get(ix)
            .map(|metric| metric.side_bearing())
            .or_else(|| {
                self.bearings
                    .get(ix.saturating_sub(self.long_metrics.len()))
                    .map(|sb| sb.get())
            })
    }
}
