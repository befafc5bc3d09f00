// ============================================================================
// IMAGE I/O — decode, encode, and file dialogs
// ============================================================================
//
// Standalone functions (no `&mut self`) so they can run on background
// threads. The erase pipeline re-encodes its cleaned raster as
// high-quality JPEG; the export path is always lossless PNG so the final
// download carries no recompression artifacts.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use rfd::FileDialog;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::PathBuf;

/// Fixed, deterministic export filename offered by the save dialog.
pub const EXPORT_FILE_NAME: &str = "cleaned-and-edited.png";

/// JPEG quality used when the erase pipeline re-encodes the cleaned raster.
pub const CLEANED_JPEG_QUALITY: u8 = 98;

/// Decode any supported raster format into RGBA at natural dimensions.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode to JPEG at the given quality (alpha flattened to RGB).
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode(
        rgb_image.as_raw(),
        rgb_image.width(),
        rgb_image.height(),
        image::ColorType::Rgb8,
    )?;
    Ok(out.into_inner())
}

/// Encode to lossless PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut out);
    #[allow(deprecated)]
    encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
    Ok(out.into_inner())
}

/// Write a lossless PNG to disk.
pub fn write_png(image: &RgbaImage, path: &std::path::Path) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
    Ok(())
}

/// Open-file dialog filtered to common raster formats. No further
/// validation is applied beyond the picker's type filter.
pub fn pick_image_file() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
        .pick_file()
}

/// Save dialog for the exported composite, pre-filled with the fixed
/// export filename.
pub fn pick_export_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name(EXPORT_FILE_NAME)
        .save_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_is_lossless() {
        let mut img = RgbaImage::from_pixel(8, 6, Rgba([10, 200, 30, 255]));
        img.put_pixel(3, 2, Rgba([255, 0, 0, 128]));
        let bytes = encode_png(&img).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn jpeg_preserves_flat_color_closely() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([120, 80, 40, 255]));
        let bytes = encode_jpeg(&img, CLEANED_JPEG_QUALITY).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        let center = decoded.get_pixel(16, 16);
        for c in 0..3 {
            assert!((center[c] as i32 - img.get_pixel(16, 16)[c] as i32).abs() <= 4);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(&[0x00, 0x01, 0x02, 0x03]).is_err());
    }
}
