//! Results view - classification, fields, line items and OCR tokens

use egui::RichText;
use egui_extras::{Column, TableBuilder};

use crate::app::PipelineOutput;
use crate::dashboard::components::{CardStatus, StatusCard};
use crate::dashboard::state::{filter_tokens, ResultsViewState, Session};
use crate::dashboard::theme::ThemeColors;
use crate::extraction::{format_amount, LineItem};

/// Render the results view
pub fn render_results_view(ui: &mut egui::Ui, view_state: &mut ResultsViewState, session: &Session) {
    ui.heading(RichText::new("Results").size(24.0).strong());
    ui.add_space(8.0);

    let Some(output) = &session.output else {
        ui.label(
            RichText::new("Run an extraction from the Document view")
                .size(14.0)
                .color(ThemeColors::TEXT_SECONDARY)
        );
        return;
    };

    egui::ScrollArea::vertical().show(ui, |ui| {
        render_summary(ui, output);
        ui.add_space(16.0);
        render_fields(ui, output);

        if let Some(receipt) = &output.data.receipt {
            if !receipt.items.is_empty() {
                ui.add_space(16.0);
                section(ui, "Line items", |ui| render_line_items(ui, &receipt.items));
            }
        }

        if let Some(text) = &output.data.raw_text {
            ui.add_space(16.0);
            section(ui, "Transcription", |ui| {
                ui.label(RichText::new(text).monospace());
            });
        }

        ui.add_space(16.0);
        render_tokens(ui, view_state, output);
    });
}

fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ThemeColors::BG_MEDIUM)
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(16.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading(RichText::new(title).size(16.0));
            ui.add_space(8.0);
            add_contents(ui);
        });
}

fn render_summary(ui: &mut egui::Ui, output: &PipelineOutput) {
    let fields = output.data.fields().len();
    let grounded = output.annotations.len();

    ui.horizontal_wrapped(|ui| {
        let mut kind = StatusCard::new(
            "Document type",
            output.classification.document_type.display_name(),
            CardStatus::Neutral,
        );
        if !output.classification.reasoning.is_empty() {
            kind = kind.with_detail(truncate(&output.classification.reasoning, 60));
        }
        kind.show(ui);

        ui.add_space(16.0);
        StatusCard::new(
            "Fields grounded",
            format!("{grounded} / {fields}"),
            CardStatus::for_ratio(grounded, fields),
        )
        .show(ui);

        ui.add_space(16.0);
        let ocr_status = if output.ocr.is_empty() {
            CardStatus::Warning
        } else {
            CardStatus::Good
        };
        StatusCard::new("OCR tokens", output.ocr.tokens.len().to_string(), ocr_status).show(ui);
    });
}

fn render_fields(ui: &mut egui::Ui, output: &PipelineOutput) {
    let fields = output.data.fields();
    section(ui, "Extracted fields", |ui| {
        if fields.is_empty() {
            ui.label(RichText::new("No structured fields for this document type").color(ThemeColors::TEXT_MUTED));
            return;
        }
        egui::Grid::new("extracted_fields")
            .num_columns(3)
            .spacing([24.0, 6.0])
            .striped(true)
            .show(ui, |ui| {
                for field in &fields {
                    ui.label(RichText::new(&field.name).color(ThemeColors::TEXT_SECONDARY));
                    ui.label(&field.value);
                    let located = output.annotations.iter().any(|a| a.label == field.name);
                    if located {
                        ui.label(RichText::new("located").color(ThemeColors::ACCENT_SUCCESS));
                    } else {
                        ui.label(RichText::new("not found").color(ThemeColors::TEXT_MUTED));
                    }
                    ui.end_row();
                }
            });

        if let Some(receipt) = &output.data.receipt {
            ui.add_space(8.0);
            ui.label(
                RichText::new(format!("Currency: {}", receipt.currency))
                    .size(12.0)
                    .color(ThemeColors::TEXT_MUTED)
            );
        }
    });
}

fn render_line_items(ui: &mut egui::Ui, items: &[LineItem]) {
    let number = |value: Option<f64>| value.map(format_amount).unwrap_or_default();

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::remainder().at_least(160.0))
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto().at_least(70.0))
        .header(22.0, |mut header| {
            for title in ["Description", "Qty", "Price", "Total"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for item in items {
                body.row(20.0, |mut row| {
                    row.col(|ui| {
                        ui.label(&item.description);
                    });
                    for value in [item.quantity, item.price, item.total] {
                        row.col(|ui| {
                            ui.label(number(value));
                        });
                    }
                });
            }
        });
}

fn render_tokens(ui: &mut egui::Ui, view_state: &mut ResultsViewState, output: &PipelineOutput) {
    section(ui, "OCR tokens", |ui| {
        ui.horizontal(|ui| {
            ui.checkbox(&mut view_state.show_tokens, "Show");
            ui.add_space(8.0);
            ui.add(
                egui::TextEdit::singleline(&mut view_state.token_query)
                    .hint_text("Search")
                    .desired_width(200.0),
            );
        });

        if !view_state.show_tokens {
            return;
        }
        ui.add_space(8.0);
        let matches = filter_tokens(&output.ocr.tokens, &view_state.token_query);
        egui::Grid::new("ocr_tokens").num_columns(2).striped(true).show(ui, |ui| {
            for token in matches {
                ui.label(RichText::new(&token.text).monospace());
                let bounds = token
                    .polygon
                    .bounds()
                    .map(|(x0, y0, x1, y1)| format!("({x0}, {y0}) - ({x1}, {y1})"))
                    .unwrap_or_default();
                ui.label(RichText::new(bounds).size(12.0).color(ThemeColors::TEXT_MUTED));
                ui.end_row();
            }
        });
    });
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a fairly long reasoning", 10), "a fairl...");
    }
}
