// ============================================================================
// EDITING SESSION STATE
// ============================================================================
//
// One `EditorSession` per opened image. It exclusively owns the layer list
// and the base image; the two are edited independently after the initial
// pipeline run (layer geometry is never re-derived from pixels). The base
// is swapped exactly once, when detection succeeds and the erase pipeline
// delivers the cleaned raster — an intentionally irreversible step.

use image::{ImageError, RgbaImage};
use uuid::Uuid;

use crate::io;
use crate::layer::TextLayer;
use crate::{log_info, log_warn};

pub struct EditorSession {
    /// Encoded current base image (original upload until the cleaned swap).
    pub image_bytes: Vec<u8>,
    /// Decoded base at natural dimensions, kept for preview compositing.
    pub raster: RgbaImage,
    pub layers: Vec<TextLayer>,
    pub selected: Option<Uuid>,
    /// True after the one-time cleaned-image swap.
    cleaned: bool,
}

impl EditorSession {
    /// Start a session from uploaded file bytes. Fails only if the bytes do
    /// not decode as an image.
    pub fn open(image_bytes: Vec<u8>) -> Result<Self, ImageError> {
        let raster = io::decode_image(&image_bytes)?;
        Ok(Self { image_bytes, raster, layers: Vec::new(), selected: None, cleaned: false })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// True after the one-time cleaned-image swap has happened.
    pub fn is_cleaned(&self) -> bool {
        self.cleaned
    }

    /// Swap in the destructively cleaned base and its replacement layers.
    /// Applies at most once per session; a second call (or a cleaned image
    /// that no longer decodes) leaves the session untouched.
    pub fn apply_detection(&mut self, cleaned: Vec<u8>, layers: Vec<TextLayer>) {
        if self.cleaned {
            log_warn!("ignoring repeated cleaned-image swap for this session");
            return;
        }
        match io::decode_image(&cleaned) {
            Ok(raster) => {
                log_info!("base image swapped: {} erased region(s) layerized", layers.len());
                self.image_bytes = cleaned;
                self.raster = raster;
                self.layers = layers;
                self.selected = None;
                self.cleaned = true;
            }
            Err(e) => {
                log_warn!("cleaned image failed to decode, keeping original: {}", e);
            }
        }
    }

    /// Add a user-created layer with default text/position; selects it.
    pub fn add_manual_layer(&mut self) -> Uuid {
        let layer = TextLayer::new_manual();
        let id = layer.id;
        self.layers.push(layer);
        self.selected = Some(id);
        id
    }

    pub fn remove_layer(&mut self, id: Uuid) {
        self.layers.retain(|l| l.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    pub fn layer_mut(&mut self, id: Uuid) -> Option<&mut TextLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn selected_layer_mut(&mut self) -> Option<&mut TextLayer> {
        let id = self.selected?;
        self.layer_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn session() -> EditorSession {
        let bytes =
            io::encode_png(&RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]))).unwrap();
        EditorSession::open(bytes).unwrap()
    }

    #[test]
    fn open_rejects_non_image_bytes() {
        assert!(EditorSession::open(vec![0, 1, 2, 3]).is_err());
    }

    #[test]
    fn cleaned_swap_applies_exactly_once() {
        let mut s = session();
        let first =
            io::encode_png(&RgbaImage::from_pixel(10, 10, Rgba([1, 1, 1, 255]))).unwrap();
        let second =
            io::encode_png(&RgbaImage::from_pixel(10, 10, Rgba([2, 2, 2, 255]))).unwrap();

        s.apply_detection(first.clone(), vec![TextLayer::new_manual()]);
        assert_eq!(s.image_bytes, first);
        assert_eq!(s.layers.len(), 1);

        s.apply_detection(second, Vec::new());
        assert_eq!(s.image_bytes, first, "second swap must be ignored");
        assert_eq!(s.layers.len(), 1);
    }

    #[test]
    fn undecodable_cleaned_image_is_rejected() {
        let mut s = session();
        let original = s.image_bytes.clone();
        s.apply_detection(vec![0xff, 0x00], vec![TextLayer::new_manual()]);
        assert_eq!(s.image_bytes, original);
        assert!(s.layers.is_empty());
    }

    #[test]
    fn removing_selected_layer_clears_selection() {
        let mut s = session();
        let id = s.add_manual_layer();
        assert_eq!(s.selected, Some(id));
        s.remove_layer(id);
        assert!(s.selected.is_none());
        assert!(s.layers.is_empty());
    }

    #[test]
    fn layer_edits_mutate_in_place() {
        let mut s = session();
        let id = s.add_manual_layer();
        s.layer_mut(id).unwrap().text = "edited".to_string();
        assert_eq!(s.layers[0].text, "edited");
    }
}
