//! Colors shared by the figure panels.

use plotters::style::colors::colormaps::ViridisRGB;
use plotters::style::RGBColor;
use std::ops::Range;

/// Prey series color.
pub const PREY: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
/// Predator series color.
pub const PREDATOR: RGBColor = RGBColor(0xd6, 0x27, 0x28);
/// P99 overlay line.
pub const TAIL: RGBColor = RGBColor(0x11, 0x11, 0x11);
/// Phase trajectory connecting line.
pub const TRAJECTORY: RGBColor = RGBColor(0x55, 0x55, 0x55);
/// First point of the phase trajectory.
pub const START: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);
/// Last point of the phase trajectory.
pub const END: RGBColor = RGBColor(0xff, 0x7f, 0x0e);

/// The ten-color categorical palette used for percentile bands.
pub const TAB10: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

/// Band color by index, wrapping after ten.
pub fn band_color(index: usize) -> RGBColor {
    TAB10[index % TAB10.len()]
}

/// Viridis color for `value` within `range`.
///
/// Values outside the range are clamped; an empty range or a non-finite
/// value maps to the low end.
pub fn viridis_in(value: f64, range: &Range<f64>) -> RGBColor {
    let span = range.end - range.start;
    if !value.is_finite() || !span.is_finite() || span <= 0.0 {
        return ViridisRGB::get_color(0.0);
    }
    ViridisRGB::get_color_normalized(value, range.start, range.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viridis_endpoints() {
        let range = 0.0..10.0;
        assert_eq!(viridis_in(0.0, &range), RGBColor(68, 1, 84));
        assert_eq!(viridis_in(10.0, &range), ViridisRGB::get_color(1.0));
        assert_ne!(viridis_in(0.0, &range), viridis_in(10.0, &range));
    }

    #[test]
    fn test_viridis_clamps_and_degenerate_range() {
        let range = 0.0..10.0;
        assert_eq!(viridis_in(-3.0, &range), viridis_in(0.0, &range));
        assert_eq!(viridis_in(25.0, &range), viridis_in(10.0, &range));
        assert_eq!(viridis_in(f64::NAN, &range), viridis_in(0.0, &range));
        assert_eq!(viridis_in(5.0, &(5.0..5.0)), viridis_in(0.0, &range));
    }

    #[test]
    fn test_band_color_wraps() {
        assert_eq!(band_color(0), TAB10[0]);
        assert_eq!(band_color(10), TAB10[0]);
        assert_eq!(band_color(9), TAB10[9]);
    }
}
