//! The raw-to-display coordinate mapping.
//!
//! The touch panel and the display panel do not agree on coordinates: the
//! panel reports positions in ADC units whose origin, direction and scale
//! depend on how the sensor is mounted and wired. The mapping is an affine
//! transform, solved independently per axis from two reference points, that
//! turns a raw reading into the display pixel under the stylus:
//!
//! `display = scale * raw + offset`
//!
//! The two reference points are the display-space [`anchor_points()`] and
//! the raw samples measured while the user taps them.

use crate::error::CalibrationError;
pub use embedded_graphics::geometry::{Point, Size};
use libm::roundf;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Arm length, in pixels, of the plus markers drawn at the anchor points.
pub const MARKER_ARM_LEN: i32 = 10;

/// Inset of the anchor points from the display corners, chosen so the whole
/// plus marker stays on screen.
pub const ANCHOR_MARGIN: i32 = MARKER_ARM_LEN + 2;

/// A pair of reference points, upper-left and lower-right.
///
/// The same shape carries the fixed display-space anchors and the raw-space
/// samples captured while the user taps them.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPoints {
    pub ul: Point,
    pub lr: Point,
}

/// Per-axis affine coefficients mapping raw touch readings to display
/// pixels.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingParams {
    pub scale_x: f32,
    pub offset_x: f32,
    pub scale_y: f32,
    pub offset_y: f32,
}

impl MappingParams {
    /// The mapping that passes raw readings through unchanged.
    ///
    /// Stands in wherever no usable calibration exists yet.
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        offset_x: 0.0,
        scale_y: 1.0,
        offset_y: 0.0,
    };

    /// Maps a raw touch reading to display pixel coordinates.
    ///
    /// Rounds to the nearest pixel so readings near a pixel boundary do not
    /// jitter between truncation buckets. The result is not clamped to the
    /// display bounds; callers that need clamping do it themselves.
    pub fn map_raw_to_display(&self, raw: Point) -> Point {
        let x = roundf(self.scale_x * raw.x as f32 + self.offset_x);
        let y = roundf(self.scale_y * raw.y as f32 + self.offset_y);
        Point::new(x as i32, y as i32)
    }

    /// Maps a display pixel back to the raw reading expected there.
    ///
    /// The inverse of [`Self::map_raw_to_display()`]. Used to report the
    /// expected raw readings at known display locations after a calibration
    /// run; live touch decoding only ever goes the other way.
    pub fn map_display_to_raw(&self, display: Point) -> Point {
        let x = roundf((display.x as f32 - self.offset_x) / self.scale_x);
        let y = roundf((display.y as f32 - self.offset_y) / self.scale_y);
        Point::new(x as i32, y as i32)
    }
}

/// Returns the display-space anchor points for a display of the given size.
///
/// The anchors sit at the upper-left and lower-right of the active area,
/// inset from the corners by [`ANCHOR_MARGIN`]. Opposite corners put the
/// largest possible span between the two raw samples on both axes.
pub fn anchor_points(display_size: Size) -> AnchorPoints {
    let width = display_size.width as i32;
    let height = display_size.height as i32;
    AnchorPoints {
        ul: Point::new(ANCHOR_MARGIN, ANCHOR_MARGIN),
        lr: Point::new(width - 1 - ANCHOR_MARGIN, height - 1 - ANCHOR_MARGIN),
    }
}

/// Solves the two-point system for both axes.
///
/// `display` holds the anchor points that were drawn, `raw` the sensor
/// readings measured while each one was tapped. The anchor protocol makes
/// equal raw readings rare on a working panel, but the zero denominator
/// still has to be refused here rather than let an unbounded scale through.
pub fn compute_mapping(
    display: &AnchorPoints,
    raw: &AnchorPoints,
) -> Result<MappingParams, CalibrationError> {
    if raw.ul.x == raw.lr.x {
        return Err(CalibrationError::DegenerateX);
    }
    if raw.ul.y == raw.lr.y {
        return Err(CalibrationError::DegenerateY);
    }

    let scale_x = (display.lr.x - display.ul.x) as f32 / (raw.lr.x - raw.ul.x) as f32;
    let offset_x = display.ul.x as f32 - scale_x * raw.ul.x as f32;
    let scale_y = (display.lr.y - display.ul.y) as f32 / (raw.lr.y - raw.ul.y) as f32;
    let offset_y = display.ul.y as f32 - scale_y * raw.ul.y as f32;

    let params = MappingParams {
        scale_x,
        offset_x,
        scale_y,
        offset_y,
    };

    #[cfg(feature = "defmt")]
    defmt::debug!("calculated mapping parameters: {:?}", params);

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(ul: (i32, i32), lr: (i32, i32)) -> AnchorPoints {
        AnchorPoints {
            ul: Point::new(ul.0, ul.1),
            lr: Point::new(lr.0, lr.1),
        }
    }

    #[test]
    fn two_point_solve_hits_both_anchors() {
        let display = anchors((0, 0), (239, 319));
        let raw = anchors((300, 280), (3800, 3820));
        let params = compute_mapping(&display, &raw).unwrap();

        assert!((params.scale_x - 239.0 / 3500.0).abs() < 1e-5);
        assert!((params.scale_y - 319.0 / 3540.0).abs() < 1e-5);
        assert_eq!(params.map_raw_to_display(raw.ul), display.ul);
        assert_eq!(params.map_raw_to_display(raw.lr), display.lr);
    }

    #[test]
    fn inverse_reports_raw_anchors_at_display_anchors() {
        let display = anchors((0, 0), (239, 319));
        let raw = anchors((300, 280), (3800, 3820));
        let params = compute_mapping(&display, &raw).unwrap();

        let back = params.map_display_to_raw(display.ul);
        assert!((back.x - raw.ul.x).abs() <= 1);
        assert!((back.y - raw.ul.y).abs() <= 1);
        let back = params.map_display_to_raw(display.lr);
        assert!((back.x - raw.lr.x).abs() <= 1);
        assert!((back.y - raw.lr.y).abs() <= 1);
    }

    #[test]
    fn round_trip_recovers_display_point_within_one_unit() {
        let display = anchors((12, 12), (227, 307));
        let raw = anchors((350, 410), (3720, 3650));
        let params = compute_mapping(&display, &raw).unwrap();

        for &p in &[
            Point::new(12, 12),
            Point::new(120, 160),
            Point::new(227, 307),
            Point::new(60, 250),
        ] {
            let round_tripped = params.map_raw_to_display(params.map_display_to_raw(p));
            assert!((round_tripped.x - p.x).abs() <= 1, "x for {:?}", p);
            assert!((round_tripped.y - p.y).abs() <= 1, "y for {:?}", p);
        }
    }

    #[test]
    fn inverted_axis_panels_get_negative_scale() {
        // Panel wired so raw X decreases left to right.
        let display = anchors((12, 12), (227, 307));
        let raw = anchors((3800, 300), (290, 3810));
        let params = compute_mapping(&display, &raw).unwrap();

        assert!(params.scale_x < 0.0);
        assert!(params.scale_y > 0.0);
        assert_eq!(params.map_raw_to_display(raw.ul), display.ul);
        assert_eq!(params.map_raw_to_display(raw.lr), display.lr);
    }

    #[test]
    fn equal_raw_x_is_refused() {
        let display = anchors((0, 0), (239, 319));
        let raw = anchors((1000, 280), (1000, 3820));
        assert_eq!(
            compute_mapping(&display, &raw),
            Err(CalibrationError::DegenerateX)
        );
    }

    #[test]
    fn equal_raw_y_is_refused() {
        let display = anchors((0, 0), (239, 319));
        let raw = anchors((300, 2000), (3800, 2000));
        assert_eq!(
            compute_mapping(&display, &raw),
            Err(CalibrationError::DegenerateY)
        );
    }

    #[test]
    fn mapping_rounds_to_nearest() {
        let params = MappingParams {
            scale_x: 0.5,
            offset_x: 0.0,
            scale_y: 0.5,
            offset_y: 0.0,
        };
        // 1.5 and 2.5 both round away from zero, not truncate.
        assert_eq!(params.map_raw_to_display(Point::new(3, 5)), Point::new(2, 3));
        assert_eq!(params.map_raw_to_display(Point::new(2, 4)), Point::new(1, 2));
    }

    #[test]
    fn anchors_are_inset_from_the_corners() {
        let points = anchor_points(Size::new(240, 320));
        assert_eq!(points.ul, Point::new(12, 12));
        assert_eq!(points.lr, Point::new(227, 307));
    }
}
