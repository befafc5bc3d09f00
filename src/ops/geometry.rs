// ============================================================================
// GEOMETRY & COLOR SAMPLING
// ============================================================================
//
// Pure functions bridging the three coordinate systems in play:
//
//   1. Detector space — [0, 1000] per axis, fractional position × 1000.
//   2. Overlay space  — [0, 100] percentages of the rendered container.
//   3. Pixel space    — the raster's natural dimensions.
//
// The detector's 0–1000 space doubles as the layer font-size unit (scaled by
// container height). Each conversion is a named function so the unit systems
// stay visibly distinct at call sites.

use image::{Rgba, RgbaImage};

use crate::ops::ai::DetectedRegion;

/// Offset outside each rectangle corner when sampling background color.
const SAMPLE_MARGIN: f32 = 5.0;

/// An axis-aligned rectangle in pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Convert a detected region's normalized [0, 1000] box to pixel space.
///
/// The detector does not enforce `min <= max`; inverted boxes clamp to zero
/// width/height rather than producing a negative rectangle. The origin is
/// clamped into the image bounds.
pub fn to_pixel_rect(region: &DetectedRegion, image_w: u32, image_h: u32) -> PixelRect {
    let iw = image_w as f32;
    let ih = image_h as f32;
    PixelRect {
        x: (region.xmin / 1000.0 * iw).clamp(0.0, iw),
        y: (region.ymin / 1000.0 * ih).clamp(0.0, ih),
        w: ((region.xmax - region.xmin).max(0.0) / 1000.0 * iw),
        h: ((region.ymax - region.ymin).max(0.0) / 1000.0 * ih),
    }
}

/// Detector space → overlay-percent space (1000-unit axis to 100-unit axis).
pub fn norm_to_percent(v: f32) -> f32 {
    v / 10.0
}

/// Overlay-percent space → pixel space along one axis.
pub fn percent_to_px(percent: f32, dimension: f32) -> f32 {
    percent / 100.0 * dimension
}

/// Resolve a layer's stored 0–1000 font-size unit to pixels.
///
/// The same formula serves the live preview (against the displayed height)
/// and the export (against the raster height) so the two always agree.
pub fn font_unit_to_px(font_size: f32, render_height: f32) -> f32 {
    font_size * render_height / 1000.0
}

/// Estimate the local background color around `rect`.
///
/// Samples one pixel just outside each corner (clamped into bounds) and
/// averages the R/G/B channels independently. Corner-outside sampling avoids
/// the glyphs themselves; the plain average is tolerant of flat or gently
/// varying backgrounds but blurs hard edges and texture — a documented
/// limitation of the flat-fill approach.
pub fn estimate_background_color(raster: &RgbaImage, rect: &PixelRect) -> Rgba<u8> {
    let points = [
        (rect.x - SAMPLE_MARGIN, rect.y - SAMPLE_MARGIN),
        (rect.x + rect.w + SAMPLE_MARGIN, rect.y - SAMPLE_MARGIN),
        (rect.x - SAMPLE_MARGIN, rect.y + rect.h + SAMPLE_MARGIN),
        (rect.x + rect.w + SAMPLE_MARGIN, rect.y + rect.h + SAMPLE_MARGIN),
    ];

    let max_x = raster.width().saturating_sub(1);
    let max_y = raster.height().saturating_sub(1);
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    for (px, py) in points {
        let sx = (px.max(0.0) as u32).min(max_x);
        let sy = (py.max(0.0) as u32).min(max_y);
        let p = raster.get_pixel(sx, sy);
        r += p[0] as u32;
        g += p[1] as u32;
        b += p[2] as u32;
    }

    let n = points.len() as f32;
    Rgba([
        (r as f32 / n).round() as u8,
        (g as f32 / n).round() as u8,
        (b as f32 / n).round() as u8,
        255,
    ])
}

/// Format an RGB triple as a 6-digit hex string (`#rrggbb`).
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parse a `#rrggbb` string. Returns None on malformed input.
pub fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let s = hex.strip_prefix('#')?;
    if s.len() != 6 || !s.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> DetectedRegion {
        DetectedRegion { text: String::new(), xmin, ymin, xmax, ymax }
    }

    #[test]
    fn pixel_rect_matches_documented_scenario() {
        // {xmin:100, ymin:200, xmax:300, ymax:260} on 1000×1000
        let r = to_pixel_rect(&region(100.0, 200.0, 300.0, 260.0), 1000, 1000);
        assert_eq!(r, PixelRect { x: 100.0, y: 200.0, w: 200.0, h: 60.0 });
    }

    #[test]
    fn pixel_rect_scales_per_axis() {
        let r = to_pixel_rect(&region(500.0, 500.0, 1000.0, 1000.0), 200, 800);
        assert_eq!(r.x, 100.0);
        assert_eq!(r.y, 400.0);
        assert_eq!(r.w, 100.0);
        assert_eq!(r.h, 400.0);
    }

    #[test]
    fn pixel_rect_stays_in_bounds_for_valid_boxes() {
        for &(xmin, ymin, xmax, ymax) in
            &[(0.0, 0.0, 0.0, 0.0), (0.0, 0.0, 1000.0, 1000.0), (999.0, 1.0, 1000.0, 2.0)]
        {
            let r = to_pixel_rect(&region(xmin, ymin, xmax, ymax), 640, 480);
            assert!(r.x >= 0.0 && r.x <= 640.0);
            assert!(r.y >= 0.0 && r.y <= 480.0);
            assert!(r.w >= 0.0 && r.h >= 0.0);
        }
    }

    #[test]
    fn inverted_box_clamps_to_zero_size() {
        let r = to_pixel_rect(&region(300.0, 260.0, 100.0, 200.0), 1000, 1000);
        assert_eq!(r.w, 0.0);
        assert_eq!(r.h, 0.0);
    }

    #[test]
    fn out_of_range_origin_is_clamped() {
        let r = to_pixel_rect(&region(1500.0, -200.0, 1600.0, -100.0), 100, 100);
        assert_eq!(r.x, 100.0);
        assert_eq!(r.y, 0.0);
    }

    #[test]
    fn uniform_raster_returns_exact_color() {
        let raster = RgbaImage::from_pixel(64, 64, Rgba([17, 130, 201, 255]));
        for rect in [
            PixelRect { x: 10.0, y: 10.0, w: 20.0, h: 8.0 },
            PixelRect { x: 0.0, y: 0.0, w: 64.0, h: 64.0 },
            PixelRect { x: 60.0, y: 60.0, w: 30.0, h: 30.0 },
        ] {
            assert_eq!(estimate_background_color(&raster, &rect), Rgba([17, 130, 201, 255]));
        }
    }

    #[test]
    fn sample_points_average_independently_per_channel() {
        // Left half red, right half blue; a rect spanning the seam averages
        // two red corners with two blue corners.
        let mut raster = RgbaImage::from_pixel(100, 100, Rgba([200, 0, 0, 255]));
        for y in 0..100 {
            for x in 50..100 {
                raster.put_pixel(x, y, Rgba([0, 0, 100, 255]));
            }
        }
        let rect = PixelRect { x: 40.0, y: 40.0, w: 20.0, h: 20.0 };
        let c = estimate_background_color(&raster, &rect);
        assert_eq!(c, Rgba([100, 0, 50, 255]));
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(norm_to_percent(100.0), 10.0);
        assert_eq!(percent_to_px(10.0, 1000.0), 100.0);
        assert_eq!(font_unit_to_px(48.0, 1000.0), 48.0);
        assert_eq!(font_unit_to_px(48.0, 500.0), 24.0);
    }

    #[test]
    fn hex_round_trip_and_malformed_input() {
        assert_eq!(rgb_to_hex([17, 130, 201]), "#1182c9");
        assert_eq!(hex_to_rgb("#1182c9"), Some([17, 130, 201]));
        assert_eq!(hex_to_rgb("1182c9"), None);
        assert_eq!(hex_to_rgb("#12345"), None);
        assert_eq!(hex_to_rgb("#zzzzzz"), None);
    }
}
