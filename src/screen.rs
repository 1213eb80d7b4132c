//! Drawing helpers for the calibration screens.
//!
//! Presentation plumbing only: the calibration logic hands these functions
//! pre-computed geometry and pre-formatted strings, and nothing in the
//! procedure depends on what they draw. Prompts are erased by re-drawing
//! them in the background color.

use core::fmt::Write as _;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Point, Size},
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::RgbColor,
    primitives::{Line, Primitive, PrimitiveStyle, Rectangle},
    text::Text,
    Drawable,
};
use heapless::String;

use crate::mapping::MARKER_ARM_LEN;

/// Tap prompt shown next to each anchor marker.
pub const TEXT_TAP_PROMPT: &str = "Tap the +";
/// Prompt shown once both anchors have been captured.
pub const TEXT_TAP_CONFIRM: &str = "Tap to complete calibration";
/// Prompt for the interactive test phase.
pub const TEXT_TAP_TEST: &str = "Tap to test calibration";

/// Readout lines are formatted into a fixed buffer and truncate on
/// overflow; 12-bit readings always fit.
pub(crate) const TEXT_BUF_LEN: usize = 40;

/// Draws a plus marker centered on `point`.
pub fn draw_marker<DT>(
    draw_target: &mut DT,
    point: Point,
    color: DT::Color,
) -> Result<(), DT::Error>
where
    DT: DrawTarget<Color: RgbColor>,
{
    Line::new(
        Point::new(point.x - MARKER_ARM_LEN, point.y),
        Point::new(point.x + MARKER_ARM_LEN, point.y),
    )
    .into_styled(PrimitiveStyle::with_stroke(color, 1))
    .draw(draw_target)?;
    Line::new(
        Point::new(point.x, point.y - MARKER_ARM_LEN),
        Point::new(point.x, point.y + MARKER_ARM_LEN),
    )
    .into_styled(PrimitiveStyle::with_stroke(color, 1))
    .draw(draw_target)?;

    Ok(())
}

/// Prints one line of text with its baseline at `point`.
pub fn draw_text<DT>(
    draw_target: &mut DT,
    point: Point,
    color: DT::Color,
    text: &str,
) -> Result<(), DT::Error>
where
    DT: DrawTarget<Color: RgbColor>,
{
    Text::new(text, point, MonoTextStyle::new(&FONT_6X10, color)).draw(draw_target)?;
    Ok(())
}

/// Prints a raw-coordinate readout line, e.g. `TX = 312,  TY = 285`.
pub fn draw_readout<DT>(
    draw_target: &mut DT,
    point: Point,
    color: DT::Color,
    raw: Point,
) -> Result<(), DT::Error>
where
    DT: DrawTarget<Color: RgbColor>,
{
    let mut line: String<TEXT_BUF_LEN> = String::new();
    let _ = write!(line, "TX = {},  TY = {}", raw.x, raw.y);
    draw_text(draw_target, point, color, &line)
}

/// Fills a rectangular region with `color`.
pub fn clear_region<DT>(
    draw_target: &mut DT,
    top_left: Point,
    size: Size,
    color: DT::Color,
) -> Result<(), DT::Error>
where
    DT: DrawTarget<Color: RgbColor>,
{
    Rectangle::new(top_left, size)
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(draw_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{mock_display::MockDisplay, pixelcolor::Rgb565};

    #[test]
    fn marker_draws_both_arms() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();
        display.set_allow_overdraw(true);

        draw_marker(&mut display, Point::new(20, 20), Rgb565::BLUE).unwrap();

        assert_eq!(display.get_pixel(Point::new(10, 20)), Some(Rgb565::BLUE));
        assert_eq!(display.get_pixel(Point::new(30, 20)), Some(Rgb565::BLUE));
        assert_eq!(display.get_pixel(Point::new(20, 10)), Some(Rgb565::BLUE));
        assert_eq!(display.get_pixel(Point::new(20, 30)), Some(Rgb565::BLUE));
        assert_eq!(display.get_pixel(Point::new(19, 19)), None);
    }

    #[test]
    fn clear_region_fills_exactly_the_rectangle() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();

        clear_region(
            &mut display,
            Point::new(4, 4),
            Size::new(3, 2),
            Rgb565::BLACK,
        )
        .unwrap();

        assert_eq!(display.get_pixel(Point::new(4, 4)), Some(Rgb565::BLACK));
        assert_eq!(display.get_pixel(Point::new(6, 5)), Some(Rgb565::BLACK));
        assert_eq!(display.get_pixel(Point::new(7, 4)), None);
        assert_eq!(display.get_pixel(Point::new(4, 6)), None);
    }
}
