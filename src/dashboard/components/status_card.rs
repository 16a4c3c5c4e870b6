//! Model status card

use egui::{Color32, RichText, Rounding, Sense, Vec2};

use crate::dashboard::theme::ThemeColors;
use crate::shared::ModelStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardStatus {
    Ready,
    Busy,
    Failed,
}

impl CardStatus {
    pub fn color(&self) -> Color32 {
        match self {
            CardStatus::Ready => ThemeColors::ACCENT_SUCCESS,
            CardStatus::Busy => ThemeColors::ACCENT_WARNING,
            CardStatus::Failed => ThemeColors::ACCENT_ERROR,
        }
    }
}

/// A titled value with a coloured status dot
pub struct StatusCard {
    pub title: String,
    pub value: String,
    pub status: CardStatus,
}

impl StatusCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, status: CardStatus) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            status,
        }
    }

    pub fn for_model(status: &ModelStatus) -> Self {
        match status {
            ModelStatus::Loading => Self::new("Model", "Loading...", CardStatus::Busy),
            ModelStatus::Ready { classes } => Self::new("Model", format!("{} classes", classes), CardStatus::Ready),
            ModelStatus::Failed(_) => Self::new("Model", "Unavailable", CardStatus::Failed),
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(ThemeColors::BG_MEDIUM)
            .stroke(egui::Stroke::new(1.0, ThemeColors::BORDER))
            .rounding(Rounding::same(6.0))
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.set_min_width(200.0);
                ui.horizontal(|ui| {
                    let (dot, _) = ui.allocate_exact_size(Vec2::splat(10.0), Sense::hover());
                    ui.painter().circle_filled(dot.center(), 5.0, self.status.color());

                    ui.label(RichText::new(&self.title).size(12.0).color(ThemeColors::TEXT_MUTED));
                    ui.label(RichText::new(&self.value).size(16.0).strong().color(ThemeColors::TEXT_PRIMARY));
                });
            });
    }
}
