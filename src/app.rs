// ============================================================================
// VISUALTYPE APP — eframe shell wiring session, pipeline, and panels
// ============================================================================
//
// Control flow: upload → background detection + erase pipeline → cleaned
// image + initial layers swapped into the session → interactive layer edits
// (pure state mutation, no pixel changes) → export on demand.
//
// The detection call runs on a spawned thread and reports back over an mpsc
// channel drained in `update()`. Every upload bumps `analysis_token`; a slow
// result carrying an older token is discarded instead of clobbering the
// newer session (there is no cancellation of in-flight calls).

use eframe::egui;
use std::sync::Arc;
use std::sync::mpsc;
use uuid::Uuid;

use crate::components::sidebar::{SidebarAction, SidebarPanel};
use crate::layer::TextLayer;
use crate::ops::ai::{GeminiClient, VisionClient};
use crate::ops::erase::{self, EraseOutcome};
use crate::ops::render;
use crate::ops::text::FontStore;
use crate::ops::geometry;
use crate::session::EditorSession;
use crate::{io, log_err, log_info, log_warn};

/// Message from the background analysis thread.
struct AnalysisResult {
    token: u64,
    /// None when the detector returned no regions (pipeline skipped).
    outcome: Option<EraseOutcome>,
    suggestions: Vec<String>,
}

pub struct VisualTypeApp {
    session: Option<EditorSession>,
    sidebar: SidebarPanel,
    fonts: FontStore,
    /// None when no API key is configured; the editor still works, minus AI.
    client: Option<Arc<dyn VisionClient>>,

    ai_sender: mpsc::Sender<AnalysisResult>,
    ai_receiver: mpsc::Receiver<AnalysisResult>,
    /// Monotonically-increasing token; analysis results carrying an older
    /// token are discarded on receipt.
    analysis_token: u64,
    analyzing: bool,
    suggestions: Vec<String>,

    // Preview cache: re-composited only when the base or the layers change.
    preview_texture: Option<egui::TextureHandle>,
    last_layers: Vec<TextLayer>,
    last_swapped: bool,
}

impl VisualTypeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let client: Option<Arc<dyn VisionClient>> = match GeminiClient::from_env() {
            Some(c) => Some(Arc::new(c)),
            None => {
                log_warn!("GEMINI_API_KEY not set — text detection and captions disabled");
                None
            }
        };

        let (ai_sender, ai_receiver) = mpsc::channel();

        Self {
            session: None,
            sidebar: SidebarPanel::default(),
            fonts: FontStore::new(),
            client,
            ai_sender,
            ai_receiver,
            analysis_token: 0,
            analyzing: false,
            suggestions: Vec::new(),
            preview_texture: None,
            last_layers: Vec::new(),
            last_swapped: false,
        }
    }

    /// Start a fresh session from uploaded bytes and kick off the detection
    /// call. A failed decode leaves the previous session in place.
    fn open_image(&mut self, ctx: &egui::Context, bytes: Vec<u8>) {
        let session = match EditorSession::open(bytes.clone()) {
            Ok(s) => s,
            Err(e) => {
                log_err!("uploaded file failed to decode: {}", e);
                return;
            }
        };
        let (w, h) = session.dimensions();
        log_info!("opened image {}×{}", w, h);

        self.session = Some(session);
        self.suggestions.clear();
        self.preview_texture = None;
        self.last_layers.clear();
        self.last_swapped = false;
        self.analysis_token += 1;

        let Some(client) = &self.client else {
            self.analyzing = false;
            return;
        };

        self.analyzing = true;
        let client = Arc::clone(client);
        let sender = self.ai_sender.clone();
        let token = self.analysis_token;
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let (outcome, suggestions) = analyze(client.as_ref(), &bytes);
            let _ = sender.send(AnalysisResult { token, outcome, suggestions });
            ctx.request_repaint();
        });
    }

    fn drain_analysis_results(&mut self) {
        while let Ok(result) = self.ai_receiver.try_recv() {
            if result.token != self.analysis_token {
                log_info!("discarding stale analysis result (token {})", result.token);
                continue;
            }
            self.analyzing = false;
            self.suggestions = result.suggestions;
            if let (Some(session), Some(outcome)) = (&mut self.session, result.outcome) {
                session.apply_detection(outcome.cleaned, outcome.layers);
            }
        }
    }

    fn handle_sidebar_action(&mut self, ctx: &egui::Context, action: SidebarAction) {
        match action {
            SidebarAction::UploadImage => {
                if let Some(path) = io::pick_image_file() {
                    match std::fs::read(&path) {
                        Ok(bytes) => self.open_image(ctx, bytes),
                        Err(e) => log_err!("could not read {}: {}", path.display(), e),
                    }
                }
            }
            SidebarAction::Export => {
                let Some(session) = &self.session else { return };
                let Some(path) = io::pick_export_path() else { return };
                match render::export_composite(
                    &session.image_bytes,
                    &session.layers,
                    &mut self.fonts,
                    &path,
                ) {
                    Ok(()) => log_info!("exported composite to {}", path.display()),
                    Err(e) => log_err!("export failed: {}", e),
                }
            }
        }
    }

    /// Rebuild the preview texture when the base image or layer list changed.
    /// The preview is the real composite at native resolution, so it matches
    /// the export pixel for pixel.
    fn refresh_preview(&mut self, ctx: &egui::Context) {
        let Some(session) = &self.session else { return };
        let swapped = session.is_cleaned();
        let dirty = self.preview_texture.is_none()
            || self.last_layers != session.layers
            || self.last_swapped != swapped;
        if !dirty {
            return;
        }

        let composed =
            render::composite_onto(session.raster.clone(), &session.layers, &mut self.fonts);
        let (w, h) = composed.dimensions();
        let image = egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], composed.as_raw());
        self.preview_texture =
            Some(ctx.load_texture("composite_preview", image, egui::TextureOptions::LINEAR));
        self.last_layers = session.layers.clone();
        self.last_swapped = swapped;
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        let Some(session) = &mut self.session else { return };
        let Some(texture) = &self.preview_texture else { return };

        // Fit the image into the available space preserving its aspect
        // ratio (the overlay percent space assumes this).
        let avail = ui.available_rect_before_wrap();
        let (iw, ih) = session.dimensions();
        let scale = (avail.width() / iw as f32).min(avail.height() / ih as f32);
        let size = egui::vec2(iw as f32 * scale, ih as f32 * scale);
        let rect = egui::Rect::from_center_size(avail.center(), size);

        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        // Click to select the topmost layer under the pointer.
        if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            session.selected = hit_test(&session.layers, pos, rect);
        }

        // Drag moves the selected layer; percent deltas keep the math
        // identical at every zoom level.
        if response.dragged() && session.selected.is_some() {
            let delta = response.drag_delta();
            if let Some(layer) = session.selected_layer_mut() {
                layer.x = (layer.x + delta.x / rect.width() * 100.0).clamp(0.0, 100.0);
                layer.y = (layer.y + delta.y / rect.height() * 100.0).clamp(0.0, 100.0);
            }
        }

        // Selection outline
        if let Some(id) = session.selected
            && let Some(layer) = session.layers.iter().find(|l| l.id == id)
        {
            let bounds = layer_bounds(layer, rect);
            ui.painter().rect_stroke(bounds, 2.0, egui::Stroke::new(1.5, egui::Color32::from_rgb(99, 102, 241)));
        }

        if self.analyzing {
            ui.painter().rect_filled(
                rect,
                0.0,
                egui::Color32::from_rgba_unmultiplied(255, 255, 255, 190),
            );
            ui.put(
                egui::Rect::from_center_size(rect.center(), egui::vec2(160.0, 60.0)),
                egui::Spinner::new().size(28.0),
            );
            ui.painter().text(
                rect.center() + egui::vec2(0.0, 44.0),
                egui::Align2::CENTER_CENTER,
                "Scanning pixels…",
                egui::FontId::proportional(13.0),
                egui::Color32::from_rgb(67, 56, 202),
            );
        }
    }
}

/// One full analysis pass: detect, erase, caption. `detect_text` degrades
/// to empty internally, so the caption call still runs when detection fails
/// outright; in that case the image stays untouched and no layers appear.
fn analyze(client: &dyn VisionClient, bytes: &[u8]) -> (Option<EraseOutcome>, Vec<String>) {
    let regions = client.detect_text(bytes);
    let outcome = if regions.is_empty() {
        None
    } else {
        Some(erase::erase_and_layerize(bytes, &regions))
    };
    let suggestions = client.suggest_captions(bytes);
    (outcome, suggestions)
}

/// Approximate on-screen bounds of a layer within the displayed image rect.
/// Used only for hit testing and the selection outline; the renderer does
/// exact glyph layout.
fn layer_bounds(layer: &TextLayer, image_rect: egui::Rect) -> egui::Rect {
    let x = image_rect.min.x + geometry::percent_to_px(layer.x, image_rect.width());
    let y = image_rect.min.y + geometry::percent_to_px(layer.y, image_rect.height());
    let font_px = geometry::font_unit_to_px(layer.font_size, image_rect.height());
    let widest = layer.text.lines().map(|l| l.chars().count()).max().unwrap_or(1).max(1);
    let lines = layer.text.lines().count().max(1);
    let w = font_px * 0.6 * widest as f32;
    let h = font_px * 1.2 * lines as f32;
    egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(w.max(12.0), h.max(12.0)))
}

/// Topmost layer (later layers draw over earlier ones) whose bounds contain
/// the pointer.
fn hit_test(layers: &[TextLayer], pos: egui::Pos2, image_rect: egui::Rect) -> Option<Uuid> {
    layers
        .iter()
        .rev()
        .find(|layer| layer_bounds(layer, image_rect).contains(pos))
        .map(|layer| layer.id)
}


impl eframe::App for VisualTypeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_analysis_results();
        self.refresh_preview(ctx);

        egui::SidePanel::left("sidebar").exact_width(300.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.sidebar.show(ui, self.session.as_mut(), &self.suggestions, self.analyzing);
            });
        });

        if let Some(action) = self.sidebar.pending_action.take() {
            self.handle_sidebar_action(ctx, action);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_some() {
                self.show_preview(ui);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("Clear Original Text\n\nUpload an image to begin.")
                            .size(16.0),
                    );
                });
            }
        });

        if self.analyzing {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
