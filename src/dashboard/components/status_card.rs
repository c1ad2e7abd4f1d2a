//! Summary card for a single result value

use egui::{Color32, RichText, Rounding, Vec2};
use crate::dashboard::theme::ThemeColors;

/// A card showing one headline value with a status dot
pub struct StatusCard {
    pub title: String,
    pub value: String,
    pub status: CardStatus,
    pub detail: Option<String>,
}

/// How the card's value should be read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardStatus {
    Good,
    Neutral,
    Warning,
    Error,
}

impl CardStatus {
    pub fn color(&self) -> Color32 {
        match self {
            CardStatus::Good => ThemeColors::ACCENT_SUCCESS,
            CardStatus::Neutral => ThemeColors::TEXT_SECONDARY,
            CardStatus::Warning => ThemeColors::ACCENT_WARNING,
            CardStatus::Error => ThemeColors::ACCENT_ERROR,
        }
    }

    /// Status for "found / total" style counts
    pub fn for_ratio(found: usize, total: usize) -> Self {
        match (found, total) {
            (_, 0) => CardStatus::Neutral,
            (f, t) if f == t => CardStatus::Good,
            (0, _) => CardStatus::Error,
            _ => CardStatus::Warning,
        }
    }
}

impl StatusCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, status: CardStatus) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(ThemeColors::BG_MEDIUM)
            .rounding(Rounding::same(8.0))
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.set_min_width(180.0);

                ui.horizontal(|ui| {
                    let dot_center = ui.cursor().left_top() + Vec2::new(6.0, 10.0);
                    ui.painter().circle_filled(dot_center, 4.0, self.status.color());
                    ui.add_space(16.0);

                    ui.vertical(|ui| {
                        ui.label(
                            RichText::new(&self.title)
                                .size(12.0)
                                .color(ThemeColors::TEXT_MUTED)
                        );
                        ui.add_space(4.0);
                        ui.label(
                            RichText::new(&self.value)
                                .size(18.0)
                                .color(ThemeColors::TEXT_PRIMARY)
                                .strong()
                        );
                        if let Some(detail) = &self.detail {
                            ui.add_space(4.0);
                            ui.label(
                                RichText::new(detail)
                                    .size(11.0)
                                    .color(self.status.color())
                            );
                        }
                    });
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_ratio() {
        assert_eq!(CardStatus::for_ratio(0, 0), CardStatus::Neutral);
        assert_eq!(CardStatus::for_ratio(2, 2), CardStatus::Good);
        assert_eq!(CardStatus::for_ratio(1, 2), CardStatus::Warning);
        assert_eq!(CardStatus::for_ratio(0, 3), CardStatus::Error);
    }
}
