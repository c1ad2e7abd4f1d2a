//! Settings view - credentials, model, grounding and rendering

use egui::RichText;
use std::cell::Cell;

use crate::dashboard::state::{Session, SettingsViewState, UserAction};
use crate::dashboard::theme::ThemeColors;
use crate::grounding::Scorer;

/// Render the settings view
pub fn render_settings_view(
    ui: &mut egui::Ui,
    view_state: &mut SettingsViewState,
    session: &mut Session,
) {
    ui.heading(RichText::new("Settings").size(24.0).strong());
    ui.add_space(8.0);
    ui.label(
        RichText::new(format!("Saved to {}", session.config_path.display()))
            .size(14.0)
            .color(ThemeColors::TEXT_SECONDARY)
    );
    ui.add_space(24.0);

    let changed = Cell::new(false);
    let busy = session.is_busy();

    egui::ScrollArea::vertical().show(ui, |ui| {
        section(ui, "Credentials", |ui| {
            ui.label(
                RichText::new("Used for this session only, never written to the config file")
                    .size(12.0)
                    .color(ThemeColors::TEXT_MUTED)
            );
            ui.add_space(8.0);

            let hidden = !view_state.show_secrets;
            egui::Grid::new("credentials").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                ui.label("Model API key:");
                ui.add(
                    egui::TextEdit::singleline(&mut view_state.api_key)
                        .password(hidden)
                        .hint_text("GOOGLE_API_KEY")
                        .desired_width(320.0),
                );
                ui.end_row();

                ui.label("OCR credentials file:");
                ui.add(
                    egui::TextEdit::singleline(&mut view_state.credentials_path)
                        .hint_text("service account JSON")
                        .desired_width(320.0),
                );
                ui.end_row();

                ui.label("Vision API key:");
                ui.add(
                    egui::TextEdit::singleline(&mut view_state.vision_api_key)
                        .password(hidden)
                        .hint_text("optional")
                        .desired_width(320.0),
                );
                ui.end_row();
            });
            ui.checkbox(&mut view_state.show_secrets, "Show keys");

            ui.add_space(8.0);
            let effective = session.config.with_overrides(&view_state.overrides());
            match effective.validate() {
                Err(e) => {
                    ui.label(RichText::new(e.to_string()).size(12.0).color(ThemeColors::ACCENT_ERROR));
                }
                Ok(warnings) if warnings.is_empty() => {
                    ui.label(RichText::new("Ready").size(12.0).color(ThemeColors::ACCENT_SUCCESS));
                }
                Ok(warnings) => {
                    for warning in warnings {
                        ui.label(
                            RichText::new(warning.to_string())
                                .size(12.0)
                                .color(ThemeColors::ACCENT_WARNING)
                        );
                    }
                }
            }
        });

        ui.add_space(16.0);

        let config = &mut session.config;

        section(ui, "Model", |ui| {
            ui.horizontal(|ui| {
                ui.label("Model:");
                ui.add_space(8.0);
                if ui.text_edit_singleline(&mut config.llm.model).changed() {
                    changed.set(true);
                }
            });
            ui.horizontal(|ui| {
                ui.label("Timeout:");
                ui.add_space(8.0);
                if ui.add(egui::Slider::new(&mut config.llm.timeout_secs, 5..=300).suffix(" s")).changed() {
                    config.ocr.timeout_secs = config.llm.timeout_secs;
                    changed.set(true);
                }
            });
        });

        ui.add_space(16.0);

        section(ui, "Grounding", |ui| {
            ui.horizontal(|ui| {
                ui.label("Match threshold:");
                ui.add_space(8.0);
                if ui.add(egui::Slider::new(&mut config.grounding.threshold, 0..=100)).changed() {
                    changed.set(true);
                }
            });
            ui.label(
                RichText::new("Minimum similarity for a fuzzy match; exact substring matches always win")
                    .size(11.0)
                    .color(ThemeColors::TEXT_MUTED)
            );

            ui.add_space(8.0);
            egui::ComboBox::from_label("Scorer")
                .selected_text(config.grounding.scorer.name())
                .show_ui(ui, |ui| {
                    for scorer in Scorer::all() {
                        if ui
                            .selectable_value(&mut config.grounding.scorer, scorer, scorer.name())
                            .changed()
                        {
                            changed.set(true);
                        }
                    }
                });
        });

        ui.add_space(16.0);

        section(ui, "Rendering", |ui| {
            ui.horizontal(|ui| {
                ui.label("Outline colour:");
                ui.add_space(8.0);
                if ui.color_edit_button_srgb(&mut config.render.color).changed() {
                    changed.set(true);
                }
            });
            ui.horizontal(|ui| {
                ui.label("Stroke width:");
                ui.add_space(8.0);
                if ui.add(egui::Slider::new(&mut config.render.stroke_width, 1..=12).suffix(" px")).changed() {
                    changed.set(true);
                }
            });
            if ui.checkbox(&mut config.render.draw_labels, "Draw label tags").changed() {
                changed.set(true);
            }
        });

        ui.add_space(24.0);

        ui.add_enabled_ui(!busy, |ui| {
            ui.horizontal(|ui| {
                if ui.add(egui::Button::new("Save").min_size(egui::vec2(100.0, 36.0))).clicked() {
                    session.pending_action = Some(UserAction::SaveConfig);
                }
                if ui.add(egui::Button::new("Reset to Defaults").min_size(egui::vec2(120.0, 36.0))).clicked() {
                    session.pending_action = Some(UserAction::ResetConfig);
                }
                ui.add_space(16.0);
                if view_state.has_unsaved_changes || changed.get() {
                    ui.label(RichText::new("Unsaved changes").size(12.0).color(ThemeColors::ACCENT_WARNING));
                }
            });
        });
    });

    if changed.get() {
        view_state.has_unsaved_changes = true;
    }
}

fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ThemeColors::BG_MEDIUM)
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(16.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading(RichText::new(title).size(16.0));
            ui.add_space(12.0);
            add_contents(ui);
        });
}
