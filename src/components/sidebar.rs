// ============================================================================
// SIDEBAR — upload, caption suggestions, layer list, style editor, export
// ============================================================================

use eframe::egui;
use uuid::Uuid;

use crate::layer::{FontFamily, FontWeight};
use crate::ops::geometry;
use crate::session::EditorSession;

/// Actions that need app-level handling (file dialogs, background jobs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarAction {
    UploadImage,
    Export,
}

#[derive(Default)]
pub struct SidebarPanel {
    pub pending_action: Option<SidebarAction>,
}

impl SidebarPanel {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        session: Option<&mut EditorSession>,
        suggestions: &[String],
        analyzing: bool,
    ) {
        ui.heading("VisualType");
        ui.label(egui::RichText::new("AUTOMATIC TEXT ERASER").weak().small());
        ui.add_space(8.0);

        let upload_label = if session.is_some() { "Upload New Image" } else { "Upload Image to Erase" };
        if ui
            .add_enabled(!analyzing, egui::Button::new(upload_label).min_size(egui::vec2(ui.available_width(), 32.0)))
            .clicked()
        {
            self.pending_action = Some(SidebarAction::UploadImage);
        }

        let Some(session) = session else {
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new(
                    "Upload any image and detected text is swapped for editable layers automatically.",
                )
                .weak(),
            );
            return;
        };

        ui.add_space(8.0);
        if ui
            .add(egui::Button::new("＋ New Text Layer").min_size(egui::vec2(ui.available_width(), 28.0)))
            .clicked()
        {
            session.add_manual_layer();
        }

        if !suggestions.is_empty() {
            ui.add_space(10.0);
            ui.label(egui::RichText::new("Caption ideas").strong());
            ui.horizontal_wrapped(|ui| {
                for suggestion in suggestions {
                    if ui.small_button(suggestion).clicked() {
                        // Apply to the selected layer, or spawn a new layer
                        // carrying the suggestion.
                        match session.selected_layer_mut() {
                            Some(layer) => layer.text = suggestion.clone(),
                            None => {
                                let id = session.add_manual_layer();
                                if let Some(layer) = session.layer_mut(id) {
                                    layer.text = suggestion.clone();
                                }
                            }
                        }
                    }
                }
            });
        }

        ui.add_space(10.0);
        ui.separator();
        self.show_layer_list(ui, session);

        if session.selected.is_some() {
            ui.add_space(6.0);
            ui.separator();
            self.show_style_editor(ui, session);
        }

        ui.add_space(12.0);
        if ui
            .add(egui::Button::new("Export PNG").min_size(egui::vec2(ui.available_width(), 32.0)))
            .clicked()
        {
            self.pending_action = Some(SidebarAction::Export);
        }
    }

    fn show_layer_list(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        ui.label(egui::RichText::new(format!("Layers ({})", session.layers.len())).strong());
        if session.layers.is_empty() {
            ui.label(egui::RichText::new("No text layers yet").weak());
            return;
        }

        let mut remove_id: Option<Uuid> = None;
        egui::ScrollArea::vertical().max_height(180.0).show(ui, |ui| {
            for layer in &session.layers {
                let selected = session.selected == Some(layer.id);
                ui.horizontal(|ui| {
                    let title = if layer.text.trim().is_empty() {
                        "(empty)".to_string()
                    } else {
                        // Single-line preview of the layer text
                        let first = layer.text.lines().next().unwrap_or("");
                        first.chars().take(24).collect()
                    };
                    if ui.selectable_label(selected, title).clicked() {
                        session.selected = Some(layer.id);
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").on_hover_text("Remove layer").clicked() {
                            remove_id = Some(layer.id);
                        }
                    });
                });
            }
        });

        if let Some(id) = remove_id {
            session.remove_layer(id);
        }
    }

    fn show_style_editor(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        let Some(layer) = session.selected_layer_mut() else { return };

        ui.label(egui::RichText::new("Edit layer").strong());
        ui.add(egui::TextEdit::multiline(&mut layer.text).desired_rows(2).desired_width(f32::INFINITY));

        egui::ComboBox::from_label("Font")
            .selected_text(layer.font_family.label())
            .show_ui(ui, |ui| {
                for family in FontFamily::ALL {
                    ui.selectable_value(&mut layer.font_family, family, family.label());
                }
            });

        egui::ComboBox::from_label("Weight")
            .selected_text(layer.font_weight.label())
            .show_ui(ui, |ui| {
                for weight in FontWeight::ALL {
                    ui.selectable_value(&mut layer.font_weight, weight, weight.label());
                }
            });

        // Size stays in the 0–1000 normalized unit; the renderer rescales.
        ui.add(egui::Slider::new(&mut layer.font_size, 8.0..=400.0).text("Size"));
        ui.add(egui::Slider::new(&mut layer.opacity, 0.0..=1.0).text("Opacity"));

        ui.horizontal(|ui| {
            ui.label("Color");
            ui.color_edit_button_srgb(&mut layer.color);
            // Hex readout, editable; only a full #rrggbb value commits.
            let mut hex = geometry::rgb_to_hex(layer.color);
            if ui.add(egui::TextEdit::singleline(&mut hex).desired_width(70.0)).changed()
                && let Some(rgb) = geometry::hex_to_rgb(&hex)
            {
                layer.color = rgb;
            }
        });

        ui.horizontal(|ui| {
            ui.label("X %");
            ui.add(egui::DragValue::new(&mut layer.x).clamp_range(0.0..=100.0).speed(0.2));
            ui.label("Y %");
            ui.add(egui::DragValue::new(&mut layer.y).clamp_range(0.0..=100.0).speed(0.2));
        });
    }
}
