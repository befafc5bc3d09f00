// ============================================================================
// COMPOSITE RENDERER / EXPORT
// ============================================================================
//
// Flattens the (possibly edited) base image and the current layer list into
// a single raster. The same function backs the live preview texture and the
// export, so what the user sees while editing is exactly what downloads:
// positions resolve via the percent formulas and font sizes via the single
// `height / 1000` scale in `ops::geometry`, in both paths.

use image::{ImageError, RgbaImage};
use std::path::Path;

use crate::layer::TextLayer;
use crate::ops::geometry;
use crate::ops::text::{FontStore, draw_text};
use crate::{io, log_warn};

/// Decode `base` and draw every layer onto it in list order (later layers
/// draw over earlier ones). A layer whose font cannot be resolved is skipped
/// rather than aborting the render.
pub fn render_composite(
    base: &[u8],
    layers: &[TextLayer],
    fonts: &mut FontStore,
) -> Result<RgbaImage, ImageError> {
    let raster = io::decode_image(base)?;
    Ok(composite_onto(raster, layers, fonts))
}

/// Draw `layers` onto an already-decoded raster.
pub fn composite_onto(
    mut raster: RgbaImage,
    layers: &[TextLayer],
    fonts: &mut FontStore,
) -> RgbaImage {
    let width = raster.width() as f32;
    let height = raster.height() as f32;

    for layer in layers {
        let x = geometry::percent_to_px(layer.x, width);
        let y = geometry::percent_to_px(layer.y, height);
        let px_size = geometry::font_unit_to_px(layer.font_size, height);

        let Some(font) = fonts.get(layer.font_family, layer.font_weight) else {
            log_warn!("no font resolved for {:?} {:?}; layer skipped", layer.font_family, layer.font_weight);
            continue;
        };

        // Left-aligned at x, top-aligned at y. Opacity is applied inside
        // draw_text per coverage sample and cannot leak to the next layer.
        draw_text(&mut raster, &font, &layer.text, px_size, x, y, layer.color, layer.opacity);
    }

    raster
}

/// Render and write the lossless PNG export.
pub fn export_composite(
    base: &[u8],
    layers: &[TextLayer],
    fonts: &mut FontStore,
    path: &Path,
) -> Result<(), ImageError> {
    let composed = render_composite(base, layers, fonts)?;
    io::write_png(&composed, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FontFamily, FontWeight};
    use image::Rgba;

    fn white_base(w: u32, h: u32) -> Vec<u8> {
        io::encode_png(&RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))).unwrap()
    }

    /// Store seeded with the bundled face for the default detection style,
    /// so rendering does not depend on the host's installed fonts.
    fn seeded_fonts() -> FontStore {
        let mut fonts = FontStore::new();
        fonts.preload(
            FontFamily::Inter,
            FontWeight::SemiBold,
            crate::ops::text::tests::embedded_font(),
        );
        fonts
    }

    fn test_layer(text: &str) -> TextLayer {
        TextLayer::from_detection(text.to_string(), 10.0, 20.0, 300.0)
    }

    /// Scan the box the layer should occupy for any pixel of its fill color.
    fn find_fill(raster: &RgbaImage, layer: &TextLayer) -> bool {
        let w = raster.width() as f32;
        let h = raster.height() as f32;
        let x0 = geometry::percent_to_px(layer.x, w) as u32;
        let y0 = geometry::percent_to_px(layer.y, h) as u32;
        let size = geometry::font_unit_to_px(layer.font_size, h).ceil() as u32;
        for y in y0..(y0 + size * 2).min(raster.height()) {
            for x in x0..(x0 + size * 4).min(raster.width()) {
                let p = raster.get_pixel(x, y);
                if p[0] == layer.color[0] && p[1] == layer.color[1] && p[2] == layer.color[2] {
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn empty_layer_list_is_identity() {
        let base = white_base(40, 40);
        let mut fonts = FontStore::new();
        let composed = render_composite(&base, &[], &mut fonts).unwrap();
        assert_eq!(composed, io::decode_image(&base).unwrap());
    }

    #[test]
    fn render_propagates_decode_failure() {
        let mut fonts = FontStore::new();
        assert!(render_composite(&[1, 2, 3], &[], &mut fonts).is_err());
    }

    #[test]
    fn opaque_layer_ink_lands_at_its_anchor_region() {
        let mut fonts = seeded_fonts();
        let base = white_base(200, 200);
        let mut layer = test_layer("MMM");
        layer.color = [180, 0, 90];
        let composed = render_composite(&base, &[layer.clone()], &mut fonts).unwrap();
        assert!(find_fill(&composed, &layer), "expected layer fill color near its anchor");
    }

    #[test]
    fn opacity_does_not_leak_between_layers() {
        let mut fonts = seeded_fonts();
        let base = white_base(200, 200);

        // Layer 1 nearly invisible, layer 2 fully opaque in a different spot.
        let mut faint = test_layer("MMM");
        faint.opacity = 0.05;
        let mut solid = test_layer("MMM");
        solid.y = 60.0;
        solid.color = [0, 120, 60];

        let composed =
            render_composite(&base, &[faint, solid.clone()], &mut fonts).unwrap();
        assert!(find_fill(&composed, &solid), "opaque layer must render at full strength");
    }
}
