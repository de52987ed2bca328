//! the [hhea (Horizontal Header)](https://docs.microsoft.com/en-us/typography/opentype/spec/hhea) table

use types::{FWord, MajorMinor, Tag, UfWord};

use crate::{FontData, FontRead, ReadError};

/// 'hhea'
pub const TAG: Tag = Tag::new(b"hhea");

/// The length of the table: a version and thirteen 16-bit fields
/// (four of them reserved).
pub(crate) const TABLE_LEN: usize = 36;

/// The horizontal header table.
#[derive(Clone)]
pub struct Hhea<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for Hhea<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: MajorMinor = data.read_at(0)?;
        if version != MajorMinor::VERSION_1_0 {
            return Err(ReadError::UnsupportedVersion(TAG, version));
        }
        if data.len() < TABLE_LEN {
            return Err(ReadError::OutOfBounds);
        }
        let hhea = Hhea { data };
        if hhea.metric_data_format() != 0 {
            return Err(ReadError::Unsupported("nonzero hhea metric data format"));
        }
        Ok(hhea)
    }
}

impl Hhea<'_> {
    /// Typographic ascent.
    pub fn ascender(&self) -> FWord {
        self.data.read_at(4).unwrap()
    }

    /// Typographic descent.
    pub fn descender(&self) -> FWord {
        self.data.read_at(6).unwrap()
    }

    /// Typographic line gap.
    pub fn line_gap(&self) -> FWord {
        self.data.read_at(8).unwrap()
    }

    /// Maximum advance width.
    pub fn advance_width_max(&self) -> UfWord {
        self.data.read_at(10).unwrap()
    }

    /// Minimum left sidebearing.
    pub fn min_left_side_bearing(&self) -> FWord {
        self.data.read_at(12).unwrap()
    }

    /// Minimum right sidebearing.
    pub fn min_right_side_bearing(&self) -> FWord {
        self.data.read_at(14).unwrap()
    }

    /// `max(lsb + (xMax - xMin))`
    pub fn x_max_extent(&self) -> FWord {
        self.data.read_at(16).unwrap()
    }

    /// Used to calculate the slope of the cursor (rise/run); 1 for vertical
    /// caret, 0 for horizontal.
    pub fn caret_slope_rise(&self) -> i16 {
        self.data.read_at(18).unwrap()
    }

    /// 0 for vertical caret, 1 for horizontal.
    pub fn caret_slope_run(&self) -> i16 {
        self.data.read_at(20).unwrap()
    }

    /// The amount by which a slanted highlight on a glyph needs to be
    /// shifted to produce the best appearance. Set to 0 for non-slanted fonts.
    pub fn caret_offset(&self) -> i16 {
        self.data.read_at(22).unwrap()
    }

    /// 0 for current format.
    pub fn metric_data_format(&self) -> i16 {
        self.data.read_at(32).unwrap()
    }

    /// Number of long metric entries in the hmtx table.
    pub fn number_of_h_metrics(&self) -> u16 {
        self.data.read_at(34).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::BeBuffer;

    pub(crate) fn sample_hhea() -> BeBuffer {
        BeBuffer::new()
            .push(MajorMinor::VERSION_1_0)
            .push(FWord::new(800)) // ascender
            .push(FWord::new(-200)) // descender
            .push(FWord::new(90)) // line gap
            .push(UfWord::new(999)) // advance width max
            .push(FWord::new(-50)) // min lsb
            .push(FWord::new(-69)) // min rsb
            .push(FWord::new(888)) // x max extent
            .push(1i16) // caret slope rise
            .push(0i16) // caret slope run
            .push(12i16) // caret offset
            .extend([0i16; 4]) // reserved
            .push(0i16) // metric data format
            .push(3u16) // number of h metrics
    }

    #[test]
    fn read_fields() {
        let sample = sample_hhea();
        let hhea = Hhea::read(sample.font_data()).unwrap();
        assert_eq!(hhea.ascender(), FWord::new(800));
        assert_eq!(hhea.descender(), FWord::new(-200));
        assert_eq!(hhea.line_gap(), FWord::new(90));
        assert_eq!(hhea.advance_width_max(), UfWord::new(999));
        assert_eq!(hhea.caret_slope_rise(), 1);
        assert_eq!(hhea.caret_slope_run(), 0);
        assert_eq!(hhea.caret_offset(), 12);
        assert_eq!(hhea.number_of_h_metrics(), 3);
    }

    #[test]
    fn reject_version_2() {
        let mut bytes = sample_hhea().to_vec();
        bytes[1] = 2;
        assert!(matches!(
            Hhea::read(FontData::new(&bytes)),
            Err(ReadError::UnsupportedVersion(tag, _)) if tag == TAG
        ));
    }

    #[test]
    fn reject_truncated() {
        let bytes = sample_hhea();
        assert!(matches!(
            Hhea::read(FontData::new(&bytes[..20])),
            Err(ReadError::OutOfBounds)
        ));
    }
}
