// ============================================================================
// TEXT RASTERIZATION & FONT RESOLUTION
// ============================================================================
//
// Glyph layout/rasterization via ab_glyph, blended straight onto the target
// RGBA raster. Font families are the fixed set in `layer::FontFamily`,
// resolved to system fonts through font-kit; CJK families additionally probe
// well-known font file paths because font-kit family matching is unreliable
// for .ttc collections on some platforms.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;

use crate::layer::{FontFamily, FontWeight};

/// Lazily loads and caches one `FontArc` per (family, weight) pair.
/// A `None` entry records a failed lookup so it is not retried every frame.
pub struct FontStore {
    cache: HashMap<(FontFamily, FontWeight), Option<FontArc>>,
}

impl FontStore {
    pub fn new() -> Self {
        Self { cache: HashMap::new() }
    }

    pub fn get(&mut self, family: FontFamily, weight: FontWeight) -> Option<FontArc> {
        self.cache
            .entry((family, weight))
            .or_insert_with(|| load_font(family, weight))
            .clone()
    }

    /// Seed the cache with an already-loaded face, bypassing system lookup
    /// for that (family, weight) pair.
    pub fn preload(&mut self, family: FontFamily, weight: FontWeight, font: FontArc) {
        self.cache.insert((family, weight), Some(font));
    }
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a font for the given family/weight from the system.
fn load_font(family: FontFamily, weight: FontWeight) -> Option<FontArc> {
    if family.is_cjk()
        && let Some(font) = load_cjk_font_from_disk()
    {
        return Some(font);
    }
    load_system_font(family.family_candidates(), weight.numeric())
}

/// font-kit lookup across the family's candidate names, ending in the
/// generic sans-serif so *some* face always renders.
fn load_system_font(candidates: &[&str], weight: u16) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);

    let mut names: Vec<FamilyName> =
        candidates.iter().map(|c| FamilyName::Title(c.to_string())).collect();
    names.push(FamilyName::SansSerif);

    let source = SystemSource::new();
    let handle = source.select_best_match(&names, &props).ok()?;
    let font_data = handle.load().ok()?;
    let font_data_copy = font_data.copy_font_data()?;
    let bytes: Vec<u8> = (*font_data_copy).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Probe common CJK font install paths. Returns the first readable font.
fn load_cjk_font_from_disk() -> Option<FontArc> {
    let candidates: &[&str] = &[
        #[cfg(target_os = "windows")]
        "C:\\Windows\\Fonts\\NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "windows")]
        "C:\\Windows\\Fonts\\msyh.ttc",
        #[cfg(target_os = "windows")]
        "C:\\Windows\\Fonts\\simsun.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        #[cfg(target_os = "linux")]
        "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
        #[cfg(target_os = "macos")]
        "/System/Library/Fonts/HiraginoSans-W3.ttc",
        #[cfg(target_os = "macos")]
        "/Library/Fonts/Arial Unicode.ttf",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path)
            && data.len() > 100
        {
            if let Ok(font) = FontArc::try_from_vec(data) {
                return Some(font);
            }
        }
    }
    None
}

/// Lay out a single line left-aligned at x=0, returning each glyph's
/// horizontal position and the total advance width.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(PxScale::from(font_size));
    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Rasterize `text` onto `raster`, left-aligned at `origin_x` and
/// top-aligned at `origin_y` (the first line's ascender touches `origin_y`).
/// Multiline via '\n'. Coverage is scaled by `opacity` before blending, so a
/// layer's opacity cannot affect anything drawn after it.
pub fn draw_text(
    raster: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    origin_x: f32,
    origin_y: f32,
    color: [u8; 3],
    opacity: f32,
) {
    if font_size <= 0.0 || opacity <= 0.0 {
        return;
    }
    let scaled = font.as_scaled(PxScale::from(font_size));
    let ascent = scaled.ascent();
    let line_height = scaled.height();
    let opacity = opacity.clamp(0.0, 1.0);
    let (canvas_w, canvas_h) = (raster.width() as i32, raster.height() as i32);

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline_y = origin_y + ascent + line_idx as f32 * line_height;
        let (glyphs, _) = layout_line(font, line, font_size);

        for (glyph_id, gx) in glyphs {
            let glyph = glyph_id
                .with_scale_and_position(PxScale::from(font_size), point(origin_x + gx, baseline_y));
            let Some(outlined) = font.outline_glyph(glyph) else { continue };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, cov| {
                let cx = bounds.min.x as i32 + px as i32;
                let cy = bounds.min.y as i32 + py as i32;
                if cx < 0 || cy < 0 || cx >= canvas_w || cy >= canvas_h {
                    return;
                }
                let alpha = cov * opacity;
                if alpha > 0.0 {
                    blend_pixel(raster.get_pixel_mut(cx as u32, cy as u32), color, alpha);
                }
            });
        }
    }
}

/// Source-over blend of an opaque `src` color at coverage `alpha` onto `dst`.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: [u8; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for c in 0..3 {
        let d = dst[c] as f32;
        dst[c] = (src[c] as f32 * a + d * (1.0 - a)).round().min(255.0) as u8;
    }
    let da = dst[3] as f32 / 255.0;
    dst[3] = ((a + da * (1.0 - a)) * 255.0).round().min(255.0) as u8;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Bundled face so rasterization tests do not depend on the host's
    /// installed fonts.
    pub fn embedded_font() -> FontArc {
        FontArc::try_from_slice(include_bytes!("../../assets/DejaVuSans.ttf")).unwrap()
    }

    #[test]
    fn blend_full_alpha_replaces_destination() {
        let mut dst = Rgba([10, 20, 30, 255]);
        blend_pixel(&mut dst, [200, 100, 50], 1.0);
        assert_eq!(dst, Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn blend_zero_alpha_is_identity() {
        let mut dst = Rgba([10, 20, 30, 255]);
        blend_pixel(&mut dst, [200, 100, 50], 0.0);
        assert_eq!(dst, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn blend_half_alpha_mixes_channels() {
        let mut dst = Rgba([0, 0, 0, 255]);
        blend_pixel(&mut dst, [200, 100, 50], 0.5);
        assert_eq!(dst, Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn draw_text_is_clipped_to_the_raster() {
        let font = embedded_font();
        let mut raster = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        // Origin far outside the raster: must not panic, must not write.
        draw_text(&mut raster, &font, "XX", 16.0, 500.0, 500.0, [0, 0, 0], 1.0);
        assert!(raster.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn draw_text_inks_visible_glyphs() {
        let font = embedded_font();
        let mut raster = RgbaImage::from_pixel(60, 40, Rgba([255, 255, 255, 255]));
        draw_text(&mut raster, &font, "M", 24.0, 5.0, 5.0, [0, 0, 0], 1.0);
        assert!(raster.pixels().any(|p| p[0] < 255));
    }

    #[test]
    fn preloaded_face_bypasses_system_lookup() {
        let mut store = FontStore::new();
        store.preload(FontFamily::Inter, FontWeight::Regular, embedded_font());
        assert!(store.get(FontFamily::Inter, FontWeight::Regular).is_some());
    }

    #[test]
    fn layout_advances_monotonically() {
        let font = embedded_font();
        let (glyphs, total) = layout_line(&font, "abc", 24.0);
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs.windows(2).all(|w| w[1].1 >= w[0].1));
        assert!(total >= glyphs.last().unwrap().1);
    }
}
