//! Decoding and encoding the horizontal metrics of a font.
//!
//! The `hhea` and `hmtx` tables travel together: `hhea` carries the global
//! line metrics, the caret slope, and the number of long entries in `hmtx`.
//! [`decode_hmtx`] folds both into an owned [`HmtxInfo`]; [`HmtxInfo::encode`]
//! produces byte-exact tables, re-running the run-length compression of
//! trailing equal advances and re-deriving the side-bearing extremes from
//! glyph extents.

use std::f64::consts::FRAC_PI_2;

use types::{BoundingBox, FWord, MajorMinor, UfWord};

use crate::tables::{hhea::Hhea, hmtx::Hmtx};
use crate::write::{dump_table, FontWrite, TableWriter};
use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

/// The horizontal metrics of a font, decoded.
///
/// `widths`, `lsbs` and `extents` are parallel arrays indexed by glyph id.
/// `extents` is empty after [`decode_hmtx`] (bounding boxes live in the
/// outline tables); callers that intend to [`encode`](HmtxInfo::encode)
/// should fill it in so the side-bearing extremes can be recomputed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HmtxInfo {
    /// Advance width per glyph, in font design units.
    pub widths: Vec<u16>,
    /// Left side bearing per glyph.
    pub lsbs: Vec<i16>,
    /// Bounding box per glyph; `None` for glyphs with no outline.
    pub extents: Vec<Option<BoundingBox<i16>>>,
    pub ascent: FWord,
    pub descent: FWord,
    pub line_gap: FWord,
    /// Caret angle in radians: 0 is vertical, negative leans the way
    /// italics do.
    pub caret_angle: f64,
    pub caret_offset: i16,
}

/// Decode `hhea` and `hmtx` into an [`HmtxInfo`].
///
/// `num_glyphs` comes from the `maxp` table.
pub fn decode_hmtx(
    hhea_data: &[u8],
    hmtx_data: &[u8],
    num_glyphs: u16,
) -> Result<HmtxInfo, ReadError> {
    let hhea = Hhea::read(FontData::new(hhea_data))?;
    let hmtx = Hmtx::read_with_args(
        FontData::new(hmtx_data),
        &(hhea.number_of_h_metrics(), num_glyphs),
    )?;
    let mut widths = Vec::with_capacity(num_glyphs as usize);
    let mut lsbs = Vec::with_capacity(num_glyphs as usize);
    for gid in 0..num_glyphs {
        let gid = types::GlyphId::new(gid);
        widths.push(hmtx.advance(gid).unwrap_or_default());
        lsbs.push(hmtx.side_bearing(gid).unwrap_or_default());
    }
    Ok(HmtxInfo {
        widths,
        lsbs,
        extents: Vec::new(),
        ascent: hhea.ascender(),
        descent: hhea.descender(),
        line_gap: hhea.line_gap(),
        caret_angle: caret_angle(hhea.caret_slope_rise(), hhea.caret_slope_run()),
        caret_offset: hhea.caret_offset(),
    })
}

impl HmtxInfo {
    /// Encode this info as `(hhea, hmtx)` table bytes.
    ///
    /// The number of long `hmtx` entries starts at the glyph count and
    /// shrinks while the last two advances are equal, so a trailing run of
    /// equal advances is stored once. The advance/side-bearing extremes in
    /// `hhea` are recomputed from the glyphs with a non-empty bounding box.
    pub fn encode(&self) -> (Vec<u8>, Vec<u8>) {
        let mut number_of_h_metrics = self.widths.len();
        while number_of_h_metrics > 1
            && self.widths[number_of_h_metrics - 1] == self.widths[number_of_h_metrics - 2]
        {
            number_of_h_metrics -= 1;
        }

        let mut advance_width_max = 0u16;
        let mut min_left_side_bearing = i16::MAX;
        let mut min_right_side_bearing = i16::MAX;
        let mut x_max_extent = i16::MIN;
        let mut any_extent = false;
        for (gid, extent) in self.extents.iter().enumerate() {
            let Some(extent) = (*extent).filter(|e| !e.is_empty()) else {
                continue;
            };
            any_extent = true;
            let advance = self.widths.get(gid).copied().unwrap_or_default();
            let lsb = self.lsbs.get(gid).copied().unwrap_or_default();
            let glyph_width = extent.x_max.saturating_sub(extent.x_min);
            advance_width_max = advance_width_max.max(advance);
            min_left_side_bearing = min_left_side_bearing.min(lsb);
            min_right_side_bearing = min_right_side_bearing
                .min((advance as i32 - lsb as i32 - glyph_width as i32).clamp(
                    i16::MIN as i32,
                    i16::MAX as i32,
                ) as i16);
            x_max_extent = x_max_extent.max(lsb.saturating_add(glyph_width));
        }
        if !any_extent {
            advance_width_max = self.widths.iter().copied().max().unwrap_or_default();
            min_left_side_bearing = 0;
            min_right_side_bearing = 0;
            x_max_extent = 0;
        }

        let (caret_slope_rise, caret_slope_run) = caret_slope(self.caret_angle);
        let hhea = CompiledHhea {
            ascent: self.ascent,
            descent: self.descent,
            line_gap: self.line_gap,
            advance_width_max: UfWord::new(advance_width_max),
            min_left_side_bearing: FWord::new(min_left_side_bearing),
            min_right_side_bearing: FWord::new(min_right_side_bearing),
            x_max_extent: FWord::new(x_max_extent),
            caret_slope_rise,
            caret_slope_run,
            caret_offset: self.caret_offset,
            number_of_h_metrics: number_of_h_metrics as u16,
        };
        let hmtx = CompiledHmtx {
            widths: &self.widths,
            lsbs: &self.lsbs,
            number_of_h_metrics,
        };
        (dump_table(&hhea), dump_table(&hmtx))
    }
}

struct CompiledHhea {
    ascent: FWord,
    descent: FWord,
    line_gap: FWord,
    advance_width_max: UfWord,
    min_left_side_bearing: FWord,
    min_right_side_bearing: FWord,
    x_max_extent: FWord,
    caret_slope_rise: i16,
    caret_slope_run: i16,
    caret_offset: i16,
    number_of_h_metrics: u16,
}

impl FontWrite for CompiledHhea {
    fn write_into(&self, writer: &mut TableWriter) {
        writer.write(MajorMinor::VERSION_1_0);
        writer.write(self.ascent);
        writer.write(self.descent);
        writer.write(self.line_gap);
        writer.write(self.advance_width_max);
        writer.write(self.min_left_side_bearing);
        writer.write(self.min_right_side_bearing);
        writer.write(self.x_max_extent);
        writer.write(self.caret_slope_rise);
        writer.write(self.caret_slope_run);
        writer.write(self.caret_offset);
        writer.write_slice(&[0u8; 8]); // reserved
        writer.write(0i16); // metric data format
        writer.write(self.number_of_h_metrics);
    }

    fn table_name(&self) -> &'static str {
        "hhea"
    }
}

struct CompiledHmtx<'a> {
    widths: &'a [u16],
    lsbs: &'a [i16],
    number_of_h_metrics: usize,
}

impl FontWrite for CompiledHmtx<'_> {
    fn write_into(&self, writer: &mut TableWriter) {
        for gid in 0..self.widths.len() {
            let lsb = self.lsbs.get(gid).copied().unwrap_or_default();
            if gid < self.number_of_h_metrics {
                writer.write(self.widths[gid]);
            }
            writer.write(lsb);
        }
    }

    fn table_name(&self) -> &'static str {
        "hmtx"
    }
}

/// The caret angle for an `hhea` (rise, run) slope.
///
/// 0 is an upright caret; italic fonts lean negative.
pub fn caret_angle(rise: i16, run: i16) -> f64 {
    // clamp away from i16::MIN so the slope can be negated safely
    let rise = rise.max(-i16::MAX) as f64;
    let run = run.max(-i16::MAX) as f64;
    rise.atan2(run) - FRAC_PI_2
}

/// The `hhea` (rise, run) slope closest to the given caret angle.
pub fn caret_slope(angle: f64) -> (i16, i16) {
    let phi = angle + FRAC_PI_2;
    let (sin, cos) = phi.sin_cos();
    if cos.abs() <= 0.5 / i16::MAX as f64 {
        // an (effectively) horizontal run: the slope is a pure rise
        return (if sin < 0.0 { -1 } else { 1 }, 0);
    }
    let (rise, run) = best_rational_approximation(sin / cos, i16::MAX as i64);
    (rise as i16, run as i16)
}

/// The best rational approximation `p/q` of `x` with `|p|, q <= max_denom`.
///
/// Scans every denominator and keeps the one minimizing `|x - p/q|`; ties go
/// to the smaller denominator.
pub fn best_rational_approximation(x: f64, max_denom: i64) -> (i64, i64) {
    debug_assert!(max_denom >= 1);
    let mut best = (0i64, 1i64);
    let mut best_err = f64::INFINITY;
    for q in 1..=max_denom {
        let p = ((x * q as f64).round() as i64).clamp(-max_denom, max_denom);
        let err = (x - p as f64 / q as f64).abs();
        if err < best_err {
            best = (p, q);
            best_err = err;
            if err == 0.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tables::hhea;

    fn sample_info() -> HmtxInfo {
        HmtxInfo {
            widths: vec![100, 200, 300, 300],
            lsbs: vec![10, -20, 30, 40],
            extents: Vec::new(),
            ascent: FWord::new(700),
            descent: FWord::new(-300),
            line_gap: FWord::new(80),
            caret_angle: 0.0,
            caret_offset: 4,
        }
    }

    #[test]
    fn widths_round_trip() {
        let info = sample_info();
        let (hhea_data, hmtx_data) = info.encode();
        assert_eq!(hhea_data.len(), hhea::TABLE_LEN);
        // trailing equal advances collapse: numLong = 3
        let num_long = 3;
        let num_glyphs = 4;
        assert_eq!(hmtx_data.len(), 4 * num_long + 2 * (num_glyphs - num_long));

        let decoded = decode_hmtx(&hhea_data, &hmtx_data, num_glyphs as u16).unwrap();
        assert_eq!(decoded.widths, info.widths);
        assert_eq!(decoded.lsbs, info.lsbs);
        assert_eq!(decoded.ascent, info.ascent);
        assert_eq!(decoded.descent, info.descent);
        assert_eq!(decoded.line_gap, info.line_gap);
        assert_eq!(decoded.caret_offset, info.caret_offset);
        assert!((decoded.caret_angle - info.caret_angle).abs() <= 1e-4);
    }

    #[test]
    fn italic_round_trip() {
        let mut info = sample_info();
        info.caret_angle = -0.2;
        let (hhea_data, hmtx_data) = info.encode();
        let decoded = decode_hmtx(&hhea_data, &hmtx_data, 4).unwrap();
        assert!((decoded.caret_angle - info.caret_angle).abs() <= 1e-4);
    }

    #[test]
    fn extremes_from_extents() {
        let mut info = sample_info();
        info.extents = vec![
            None,
            Some(BoundingBox {
                x_min: 0,
                y_min: 0,
                x_max: 180,
                y_max: 500,
            }),
            Some(BoundingBox {
                x_min: 10,
                y_min: 10,
                x_max: 10,
                y_max: 10,
            }), // empty, skipped
            None,
        ];
        let (hhea_data, _) = info.encode();
        let hhea = Hhea::read(FontData::new(&hhea_data)).unwrap();
        assert_eq!(hhea.advance_width_max(), UfWord::new(200));
        assert_eq!(hhea.min_left_side_bearing(), FWord::new(-20));
        // glyph 1: advance 200, lsb -20, width 180 -> rsb = 40
        assert_eq!(hhea.min_right_side_bearing(), FWord::new(40));
        // x max extent = lsb + width = 160
        assert_eq!(hhea.x_max_extent(), FWord::new(160));
    }

    #[test]
    fn caret_angle_literals() {
        assert_eq!(caret_angle(1, 0), 0.0);
        assert_eq!(caret_slope(0.0), (1, 0));
        assert_eq!(caret_slope(-PI / 4.0), (1, 1));
        assert_eq!(caret_slope(-PI / 2.0), (0, 1));
    }

    #[test]
    fn rational_approximation_of_pi() {
        assert_eq!(best_rational_approximation(PI, 10000), (355, 113));
    }

    #[test]
    fn rational_approximation_bounds() {
        for x in [0.0, 0.5, -1.75, 3.2, 100.25, -0.0003] {
            for max_denom in [1i64, 7, 100] {
                let (p, q) = best_rational_approximation(x, max_denom);
                assert!(p.abs() <= max_denom && q >= 1 && q <= max_denom);
                let err = (x - p as f64 / q as f64).abs();
                // never strictly worse than the naive round at any denominator
                for naive_q in 1..=max_denom {
                    let naive_p = ((x * naive_q as f64).round() as i64)
                        .clamp(-max_denom, max_denom);
                    let naive_err = (x - naive_p as f64 / naive_q as f64).abs();
                    assert!(
                        err <= naive_err,
                        "x = {x}, ({p}, {q}) vs ({naive_p}, {naive_q})"
                    );
                }
            }
        }
    }

    #[test]
    fn rational_approximation_is_idempotent() {
        for (p, q) in [(1i64, 2i64), (355, 113), (-7, 3), (0, 1)] {
            assert_eq!(
                best_rational_approximation(p as f64 / q as f64, 10000),
                (p, q)
            );
        }
    }
}
