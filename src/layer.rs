// ============================================================================
// TEXT LAYER DATA MODEL
// ============================================================================
//
// A `TextLayer` is an independently editable text element floated over the
// base image. Layers are created automatically by the erase pipeline (one per
// detected region) or manually by the user, mutated in place by edits, and
// destroyed by explicit removal. They hold no reference to pixel data — the
// layer list and the base raster are edited independently after the initial
// pipeline run.

use uuid::Uuid;

/// Position coordinates are percentages [0, 100] of the rendered container.
/// `font_size` is in the detector's height-normalized unit (0–1000); the
/// renderer resolves the actual pixel size via `geometry::font_unit_to_px`.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLayer {
    pub id: Uuid,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// Fill color, opaque RGB.
    pub color: [u8; 3],
    /// Reserved for a non-destructive masking mode; never consulted by the
    /// renderer (the physical background is already baked into the base
    /// raster). `None` = fully transparent.
    pub background_color: Option<[u8; 3]>,
    pub font_family: FontFamily,
    pub font_weight: FontWeight,
    /// [0, 1]. Applied per layer during compositing and never leaks into the
    /// next layer.
    pub opacity: f32,
}

impl TextLayer {
    /// Layer as created by the erase pipeline for a detected region.
    pub fn from_detection(text: String, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            x,
            y,
            font_size,
            color: [0, 0, 0],
            background_color: None,
            font_family: FontFamily::Inter,
            font_weight: FontWeight::SemiBold,
            opacity: 1.0,
        }
    }

    /// Layer as created by the "New Text" button.
    pub fn new_manual() -> Self {
        Self::from_detection("New Text".to_string(), 40.0, 45.0, 50.0)
    }
}

/// Supported typefaces. A fixed set rather than free-form family strings so
/// every entry is known to resolve to *something* on each platform (see
/// `ops::text::FontStore`) and the CJK entries are guaranteed to cover
/// Chinese glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Inter,
    PlayfairDisplay,
    RobotoMono,
    Montserrat,
    Oswald,
    Anton,
    NotoSansCjk,
    NotoSerifCjk,
}

impl FontFamily {
    pub const ALL: [FontFamily; 8] = [
        FontFamily::Inter,
        FontFamily::PlayfairDisplay,
        FontFamily::RobotoMono,
        FontFamily::Montserrat,
        FontFamily::Oswald,
        FontFamily::Anton,
        FontFamily::NotoSansCjk,
        FontFamily::NotoSerifCjk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FontFamily::Inter => "Inter",
            FontFamily::PlayfairDisplay => "Playfair Display",
            FontFamily::RobotoMono => "Roboto Mono",
            FontFamily::Montserrat => "Montserrat",
            FontFamily::Oswald => "Oswald",
            FontFamily::Anton => "Anton",
            FontFamily::NotoSansCjk => "Noto Sans CJK",
            FontFamily::NotoSerifCjk => "Noto Serif CJK",
        }
    }

    /// System family names to try, best match first. The final entries are
    /// broad fallbacks so a missing designer font degrades to a same-class
    /// face instead of failing to render.
    pub fn family_candidates(&self) -> &'static [&'static str] {
        match self {
            FontFamily::Inter => &["Inter", "Noto Sans", "DejaVu Sans", "Arial", "Liberation Sans"],
            FontFamily::PlayfairDisplay => {
                &["Playfair Display", "Georgia", "Times New Roman", "Liberation Serif", "DejaVu Serif"]
            }
            FontFamily::RobotoMono => {
                &["Roboto Mono", "Courier New", "Liberation Mono", "DejaVu Sans Mono"]
            }
            FontFamily::Montserrat => &["Montserrat", "Verdana", "DejaVu Sans", "Liberation Sans"],
            FontFamily::Oswald => &["Oswald", "Arial Narrow", "DejaVu Sans", "Liberation Sans"],
            FontFamily::Anton => &["Anton", "Impact", "Arial Black", "DejaVu Sans"],
            FontFamily::NotoSansCjk => {
                &["Noto Sans CJK SC", "Noto Sans CJK TC", "Microsoft YaHei", "WenQuanYi Micro Hei"]
            }
            FontFamily::NotoSerifCjk => {
                &["Noto Serif CJK SC", "Noto Serif CJK TC", "SimSun", "Noto Sans CJK SC"]
            }
        }
    }

    pub fn is_cjk(&self) -> bool {
        matches!(self, FontFamily::NotoSansCjk | FontFamily::NotoSerifCjk)
    }
}

/// CSS-style weight classes, stored as their numeric values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Light,
    Regular,
    SemiBold,
    Bold,
    Black,
}

impl FontWeight {
    pub const ALL: [FontWeight; 5] = [
        FontWeight::Light,
        FontWeight::Regular,
        FontWeight::SemiBold,
        FontWeight::Bold,
        FontWeight::Black,
    ];

    pub fn numeric(&self) -> u16 {
        match self {
            FontWeight::Light => 300,
            FontWeight::Regular => 400,
            FontWeight::SemiBold => 600,
            FontWeight::Bold => 700,
            FontWeight::Black => 900,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FontWeight::Light => "Light",
            FontWeight::Regular => "Regular",
            FontWeight::SemiBold => "SemiBold",
            FontWeight::Bold => "Bold",
            FontWeight::Black => "Black",
        }
    }
}
