//! Document view - open, rotate, extract and preview

use egui::{Color32, RichText};
use std::path::{Path, PathBuf};

use crate::dashboard::state::{DocumentViewState, Session, StatusLevel, UserAction};
use crate::dashboard::theme::{rgb_to_color32, ThemeColors};

/// Render the document view
pub fn render_document_view(
    ui: &mut egui::Ui,
    view_state: &mut DocumentViewState,
    session: &mut Session,
) {
    ui.heading(RichText::new("Document").size(24.0).strong());
    ui.add_space(8.0);
    ui.label(
        RichText::new("Open a receipt image or PDF, straighten it, then extract")
            .size(14.0)
            .color(ThemeColors::TEXT_SECONDARY)
    );
    ui.add_space(16.0);

    render_toolbar(ui, view_state, session);
    ui.add_space(8.0);
    render_status(ui, session);
    ui.add_space(12.0);
    render_preview(ui, view_state, session);
}

fn render_toolbar(ui: &mut egui::Ui, view_state: &mut DocumentViewState, session: &mut Session) {
    let busy = session.is_busy();
    let has_document = session.document.is_some();

    egui::Frame::none()
        .fill(ThemeColors::BG_MEDIUM)
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.add_enabled_ui(!busy, |ui| {
                ui.horizontal(|ui| {
                    ui.label("File:");
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut view_state.path_input)
                            .hint_text("Path to .png, .jpg or .pdf (or drop a file)")
                            .desired_width(360.0),
                    );
                    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    let path = view_state.path_input.trim();
                    if (ui.button("Open").clicked() || submitted) && !path.is_empty() {
                        session.request(UserAction::Open(PathBuf::from(path)));
                    }
                });

                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.add_enabled_ui(has_document, |ui| {
                        if ui.button("Rotate left").clicked() {
                            session.request(UserAction::RotateCounterClockwise);
                        }
                        if ui.button("Rotate right").clicked() {
                            session.request(UserAction::RotateClockwise);
                        }

                        ui.add_space(16.0);

                        let extract = egui::Button::new(RichText::new("Extract").color(Color32::WHITE))
                            .fill(ThemeColors::ACCENT_PRIMARY)
                            .min_size(egui::vec2(100.0, 0.0));
                        if ui.add(extract).clicked() {
                            session.request(UserAction::Extract);
                        }
                    });

                    let savable = session.output.is_some();
                    if let (true, Some(source)) = (savable, session.source_path.clone()) {
                        ui.add_space(16.0);
                        if ui.button("Save annotated image").clicked() {
                            session.request(UserAction::SaveImage(grounded_output_path(&source)));
                        }
                    }

                    ui.add_space(16.0);
                    ui.checkbox(&mut view_state.show_labels, "Show labels");
                });
            });
        });
}

fn render_status(ui: &mut egui::Ui, session: &Session) {
    if let Some(job) = session.busy {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new(job.label()).color(ThemeColors::TEXT_SECONDARY));
        });
        return;
    }
    if let Some(status) = &session.status {
        let color = match status.level {
            StatusLevel::Info => ThemeColors::ACCENT_SUCCESS,
            StatusLevel::Warning => ThemeColors::ACCENT_WARNING,
            StatusLevel::Error => ThemeColors::ACCENT_ERROR,
        };
        ui.label(RichText::new(&status.text).size(13.0).color(color));
    }
}

fn render_preview(ui: &mut egui::Ui, view_state: &mut DocumentViewState, session: &Session) {
    let Some(document) = &session.document else {
        view_state.texture = None;
        view_state.texture_revision = None;
        ui.centered_and_justified(|ui| {
            ui.label(
                RichText::new("No document loaded")
                    .size(13.0)
                    .color(ThemeColors::TEXT_MUTED)
            );
        });
        return;
    };

    // Rebuild the texture when the page or its annotations change
    if view_state.texture_revision != Some(session.image_revision) || view_state.texture.is_none() {
        let rgba = match &session.output {
            Some(output) => output.grounded_image.clone(),
            None => document.image().to_rgba8(),
        };
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [rgba.width() as usize, rgba.height() as usize],
            rgba.as_raw(),
        );
        view_state.texture = Some(ui.ctx().load_texture(
            "document_preview",
            color_image,
            egui::TextureOptions::LINEAR,
        ));
        view_state.texture_revision = Some(session.image_revision);
    }

    let Some(texture) = &view_state.texture else {
        return;
    };

    egui::Frame::none()
        .fill(ThemeColors::CANVAS)
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(8.0)
        .show(ui, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                let tex_size = texture.size_vec2();
                let available = ui.available_size();
                let scale = (available.x / tex_size.x).clamp(0.1, 1.0);
                let response = ui.image((texture.id(), tex_size * scale));

                if !view_state.show_labels {
                    return;
                }
                let Some(output) = &session.output else {
                    return;
                };
                let color = rgb_to_color32(session.config.render.color);
                let painter = ui.painter_at(response.rect);
                for annotation in &output.annotations {
                    let Some((min_x, min_y, _, _)) = annotation.polygon.bounds() else {
                        continue;
                    };
                    let anchor = response.rect.min + egui::vec2(min_x as f32, min_y as f32) * scale;
                    painter.text(
                        anchor - egui::vec2(0.0, 2.0),
                        egui::Align2::LEFT_BOTTOM,
                        &annotation.label,
                        egui::FontId::proportional(13.0),
                        color,
                    );
                }
            });
        });
}

/// `<stem>_grounded.png` next to the source file
pub fn grounded_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{stem}_grounded.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_output_path() {
        assert_eq!(
            grounded_output_path(Path::new("/scans/receipt.pdf")),
            PathBuf::from("/scans/receipt_grounded.png")
        );
        assert_eq!(
            grounded_output_path(Path::new("photo.jpg")),
            PathBuf::from("photo_grounded.png")
        );
    }
}
