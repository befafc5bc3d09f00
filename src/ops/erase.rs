// ============================================================================
// ERASE-AND-LAYERIZE PIPELINE
// ============================================================================
//
// Consumes the original upload plus the detector's region list and produces
// a destructively cleaned base image together with one editable text layer
// per region. The overpaint happens in place on a single raster threaded
// through the ordered region list: a later region whose sample points land
// inside an earlier region's fill reads the already-cleaned pixels. That
// order dependence is intentional and deterministic (input list order).
//
// After the swap there is no way to recover the original pixels under the
// erased regions — erasure is permanent within the session.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::layer::TextLayer;
use crate::ops::ai::DetectedRegion;
use crate::ops::geometry::{self, PixelRect};
use crate::{io, log_warn};

/// Extra margin painted around each region so glyph edges (antialiasing,
/// slight box under-estimation) are fully covered.
const BLEED_PX: f32 = 4.0;

/// Result of one pipeline run. `cleaned` is JPEG-encoded at high quality;
/// `layers` is ordered by detection order.
pub struct EraseOutcome {
    pub cleaned: Vec<u8>,
    pub layers: Vec<TextLayer>,
}

/// Erase every detected region from `original` and build the replacement
/// layer list.
///
/// Best-effort by contract: decode or re-encode failure falls back to the
/// unmodified original bytes with an empty layer list instead of erroring.
/// An empty region list short-circuits to the same fallback (the caller is
/// expected to skip the pipeline in that case; this keeps the function total
/// anyway).
pub fn erase_and_layerize(original: &[u8], regions: &[DetectedRegion]) -> EraseOutcome {
    if regions.is_empty() {
        return EraseOutcome { cleaned: original.to_vec(), layers: Vec::new() };
    }

    let mut raster = match io::decode_image(original) {
        Ok(raster) => raster,
        Err(e) => {
            log_warn!("erase pipeline: decode failed, keeping original image: {}", e);
            return EraseOutcome { cleaned: original.to_vec(), layers: Vec::new() };
        }
    };

    let layers: Vec<TextLayer> = regions
        .iter()
        .map(|region| {
            let rect = geometry::to_pixel_rect(region, raster.width(), raster.height());

            // Sample before painting: the corners look at whatever is on the
            // shared raster right now, including earlier regions' fills.
            let background = geometry::estimate_background_color(&raster, &rect);
            overpaint(&mut raster, &rect, background);

            TextLayer::from_detection(
                region.text.clone(),
                geometry::norm_to_percent(region.xmin).clamp(0.0, 100.0),
                geometry::norm_to_percent(region.ymin).clamp(0.0, 100.0),
                ((region.ymax - region.ymin) * 0.8).round().max(0.0),
            )
        })
        .collect();

    match io::encode_jpeg(&raster, io::CLEANED_JPEG_QUALITY) {
        Ok(cleaned) => EraseOutcome { cleaned, layers },
        Err(e) => {
            log_warn!("erase pipeline: re-encode failed, keeping original image: {}", e);
            EraseOutcome { cleaned: original.to_vec(), layers: Vec::new() }
        }
    }
}

/// Fill `rect` expanded by the bleed margin with a flat color, clamped to
/// the raster bounds. Rows are filled in parallel.
fn overpaint(raster: &mut RgbaImage, rect: &PixelRect, color: Rgba<u8>) {
    let w = raster.width() as i64;
    let h = raster.height() as i64;
    let x0 = ((rect.x - BLEED_PX).floor() as i64).clamp(0, w) as usize;
    let y0 = ((rect.y - BLEED_PX).floor() as i64).clamp(0, h) as usize;
    let x1 = ((rect.x + rect.w + BLEED_PX).ceil() as i64).clamp(0, w) as usize;
    let y1 = ((rect.y + rect.h + BLEED_PX).ceil() as i64).clamp(0, h) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let stride = w as usize * 4;
    let buf: &mut [u8] = raster;
    buf[y0 * stride..y1 * stride]
        .par_chunks_exact_mut(stride)
        .for_each(|row| {
            for x in x0..x1 {
                row[x * 4..x * 4 + 4].copy_from_slice(&color.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(text: &str, xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> DetectedRegion {
        DetectedRegion { text: text.to_string(), xmin, ymin, xmax, ymax }
    }

    fn png_bytes(raster: &RgbaImage) -> Vec<u8> {
        io::encode_png(raster).unwrap()
    }

    #[test]
    fn sale_scenario_layer_geometry() {
        let original = png_bytes(&RgbaImage::from_pixel(1000, 1000, Rgba([255, 255, 255, 255])));
        let outcome =
            erase_and_layerize(&original, &[region("SALE", 100.0, 200.0, 300.0, 260.0)]);
        assert_eq!(outcome.layers.len(), 1);
        let layer = &outcome.layers[0];
        assert_eq!(layer.text, "SALE");
        assert_eq!(layer.x, 10.0);
        assert_eq!(layer.y, 20.0);
        assert_eq!(layer.font_size, 48.0);
    }

    #[test]
    fn empty_region_list_keeps_image_byte_identical() {
        let original = png_bytes(&RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255])));
        let outcome = erase_and_layerize(&original, &[]);
        assert_eq!(outcome.cleaned, original);
        assert!(outcome.layers.is_empty());
    }

    #[test]
    fn undecodable_image_falls_back_without_layers() {
        let garbage = vec![0xde, 0xad, 0xbe, 0xef];
        let outcome = erase_and_layerize(&garbage, &[region("x", 0.0, 0.0, 100.0, 100.0)]);
        assert_eq!(outcome.cleaned, garbage);
        assert!(outcome.layers.is_empty());
    }

    #[test]
    fn uniform_background_is_overpainted_with_itself() {
        let color = Rgba([40, 90, 160, 255]);
        let original = png_bytes(&RgbaImage::from_pixel(128, 128, color));
        let outcome =
            erase_and_layerize(&original, &[region("txt", 250.0, 250.0, 750.0, 750.0)]);
        let cleaned = io::decode_image(&outcome.cleaned).unwrap();
        let p = cleaned.get_pixel(64, 64);
        for c in 0..3 {
            assert!((p[c] as i32 - color[c] as i32).abs() <= 4, "channel {} drifted", c);
        }
    }

    #[test]
    fn pipeline_is_deterministic() {
        let mut raster = RgbaImage::from_pixel(200, 160, Rgba([230, 230, 230, 255]));
        for y in 40..60 {
            for x in 30..120 {
                raster.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let original = png_bytes(&raster);
        let regions =
            vec![region("HELLO", 150.0, 250.0, 600.0, 375.0), region("WORLD", 100.0, 500.0, 400.0, 620.0)];

        let a = erase_and_layerize(&original, &regions);
        let b = erase_and_layerize(&original, &regions);
        assert_eq!(a.cleaned, b.cleaned);
        assert_eq!(a.layers.len(), b.layers.len());
        for (la, lb) in a.layers.iter().zip(&b.layers) {
            // Ids are freshly generated per run; everything else must match.
            assert_eq!(la.text, lb.text);
            assert_eq!((la.x, la.y, la.font_size), (lb.x, lb.y, lb.font_size));
        }
    }

    #[test]
    fn inverted_box_does_not_panic_or_grow() {
        let original = png_bytes(&RgbaImage::from_pixel(50, 50, Rgba([1, 2, 3, 255])));
        let outcome = erase_and_layerize(&original, &[region("x", 800.0, 900.0, 100.0, 200.0)]);
        assert_eq!(outcome.layers.len(), 1);
        assert_eq!(outcome.layers[0].font_size, 0.0);
    }

    #[test]
    fn later_region_samples_earlier_fill() {
        // White raster with a black block in the top-left corner. Region A's
        // top-left sample reads black, so A fills with ~191 gray. Region B's
        // top corners land inside A's fill and pull B's estimate down from
        // pure white.
        let mut raster = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        for y in 0..20 {
            for x in 0..20 {
                raster.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let original = png_bytes(&raster);
        let regions = vec![
            region("A", 0.0, 0.0, 400.0, 400.0),     // px rect (0,0,40,40)
            region("B", 300.0, 300.0, 700.0, 700.0), // px rect (30,30,40,40)
        ];
        let outcome = erase_and_layerize(&original, &regions);
        let cleaned = io::decode_image(&outcome.cleaned).unwrap();

        // B's estimate: top-left sample at A's gray fill (191), the other
        // three at white (255) → 239. Center of B must carry that mix, not
        // the 255 it would get if B sampled the pristine raster.
        let p = cleaned.get_pixel(50, 50);
        assert!((p[0] as i32 - 239).abs() <= 5, "got {:?}", p);
    }
}
