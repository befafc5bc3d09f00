// ============================================================================
// AI OPERATIONS — vision model collaborator (text detection + captions)
// ============================================================================
//
// The editor consumes the model as two opaque operations: image → list of
// text bounding boxes, and image → list of caption suggestions. Both are
// behind the `VisionClient` trait so the pipeline can be driven by a
// deterministic fake in tests, instead of a hidden global client.
//
// Failure policy (both operations): one attempt per trigger, no retry.
// Transport errors, non-2xx responses, and schema-violating payloads all
// degrade to the empty/default result and are logged — never surfaced as a
// blocking error. The user can always keep editing existing layers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::log_warn;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Returned when the caption call fails for any reason.
pub const FALLBACK_CAPTIONS: [&str; 3] = ["Inspire", "Create", "Design"];

const DETECT_PROMPT: &str = "Find all text in this image. For each text element, provide the \
     string and its bounding box in normalized coordinates [ymin, xmin, ymax, xmax] (0-1000). \
     Return ONLY a JSON array of objects with keys 'text', 'ymin', 'xmin', 'ymax', 'xmax'.";

const CAPTION_PROMPT: &str =
    "Suggest 3 creative slogans for this image. Return as a JSON array of strings.";

/// A text element found by the detector. Coordinates live in the normalized
/// [0, 1000] space (fractional position × 1000 relative to image width and
/// height). `min <= max` is *not* guaranteed; consumers clamp.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DetectedRegion {
    pub text: String,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// The two model operations the editor depends on.
pub trait VisionClient: Send + Sync {
    /// Detected text regions in input order, or empty on any failure.
    fn detect_text(&self, image: &[u8]) -> Vec<DetectedRegion>;

    /// Up to 3 caption suggestions, or [`FALLBACK_CAPTIONS`] on any failure.
    fn suggest_captions(&self, image: &[u8]) -> Vec<String>;
}

/// Errors inside a single model call. Internal only — public methods degrade
/// instead of propagating.
#[derive(Debug)]
pub enum AiError {
    Transport(String),
    Status(u16),
    Malformed(String),
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::Transport(e) => write!(f, "request failed: {}", e),
            AiError::Status(code) => write!(f, "model returned HTTP {}", code),
            AiError::Malformed(e) => write!(f, "malformed model response: {}", e),
        }
    }
}

/// REST client for the generative-language endpoint.
pub struct GeminiClient {
    key: String,
    model: String,
    http: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            http: reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Reads the key from `GEMINI_API_KEY`. None when unset/empty — the
    /// editor then runs with AI features disabled rather than failing.
    pub fn from_env() -> Option<Self> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    /// One `generateContent` round trip: inline image + prompt in, the
    /// model's JSON text part out.
    fn generate(&self, image: &[u8], prompt: &str) -> Result<String, AiError> {
        let url = format!("{}/{}:generateContent?key={}", BASE_URL, self.model, self.key);
        let body = json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": sniff_mime(image),
                            "data": BASE64.encode(image),
                        }
                    },
                    { "text": prompt },
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        let payload: Value = response.json().map_err(|e| AiError::Malformed(e.to_string()))?;
        extract_text_part(&payload)
    }
}

impl VisionClient for GeminiClient {
    fn detect_text(&self, image: &[u8]) -> Vec<DetectedRegion> {
        match self.generate(image, DETECT_PROMPT).and_then(|text| parse_regions(&text)) {
            Ok(regions) => regions,
            Err(e) => {
                log_warn!("text detection degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    fn suggest_captions(&self, image: &[u8]) -> Vec<String> {
        match self.generate(image, CAPTION_PROMPT).and_then(|text| parse_captions(&text)) {
            Ok(captions) => captions,
            Err(e) => {
                log_warn!("caption suggestion fell back to defaults: {}", e);
                FALLBACK_CAPTIONS.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a generateContent
/// response.
fn extract_text_part(payload: &Value) -> Result<String, AiError> {
    payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AiError::Malformed("no text part in candidate".to_string()))
}

/// Parse the model's JSON text into regions. Any schema violation is a
/// failure for the whole payload (treated identically to a transport error).
fn parse_regions(text: &str) -> Result<Vec<DetectedRegion>, AiError> {
    serde_json::from_str(text).map_err(|e| AiError::Malformed(e.to_string()))
}

fn parse_captions(text: &str) -> Result<Vec<String>, AiError> {
    let mut captions: Vec<String> =
        serde_json::from_str(text).map_err(|e| AiError::Malformed(e.to_string()))?;
    captions.truncate(3);
    Ok(captions)
}

/// Best-effort MIME sniff for the inline-data part. The upload surface does
/// not validate file types, so unknown bytes default to JPEG.
fn sniff_mime(image: &[u8]) -> &'static str {
    match image::guess_format(image) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        _ => "image/jpeg",
    }
}
