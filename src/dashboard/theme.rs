//! Dashboard theme and styling

use egui::style::WidgetVisuals;
use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

/// Light palette built around the white drawing surface
pub struct ThemeColors;

impl ThemeColors {
    pub const BG_DARK: Color32 = Color32::from_rgb(236, 238, 242);
    pub const BG_MEDIUM: Color32 = Color32::from_rgb(246, 247, 250);
    pub const BG_LIGHT: Color32 = Color32::from_rgb(226, 229, 236);
    pub const BG_HOVER: Color32 = Color32::from_rgb(212, 217, 228);

    pub const ACCENT_PRIMARY: Color32 = Color32::from_rgb(54, 162, 235);
    pub const ACCENT_SUCCESS: Color32 = Color32::from_rgb(39, 174, 96);
    pub const ACCENT_WARNING: Color32 = Color32::from_rgb(214, 160, 20);
    pub const ACCENT_ERROR: Color32 = Color32::from_rgb(214, 69, 80);

    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(30, 32, 40);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(74, 78, 92);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 124, 138);

    pub const BORDER: Color32 = Color32::from_rgb(200, 204, 214);

    // Canvas
    pub const PAPER: Color32 = Color32::WHITE;
    pub const INK: Color32 = Color32::BLACK;
}

fn style_widget(widget: &mut WidgetVisuals, fill: Color32, text: Color32) {
    widget.bg_fill = fill;
    widget.weak_bg_fill = fill;
    widget.fg_stroke = Stroke::new(1.0, text);
    widget.rounding = Rounding::same(4.0);
}

/// Apply the theme to egui
pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::light();
    visuals.panel_fill = ThemeColors::BG_DARK;
    visuals.window_fill = ThemeColors::BG_MEDIUM;
    visuals.extreme_bg_color = ThemeColors::PAPER;
    visuals.window_stroke = Stroke::new(1.0, ThemeColors::BORDER);

    style_widget(&mut visuals.widgets.noninteractive, ThemeColors::BG_MEDIUM, ThemeColors::TEXT_SECONDARY);
    style_widget(&mut visuals.widgets.inactive, ThemeColors::BG_LIGHT, ThemeColors::TEXT_PRIMARY);
    style_widget(&mut visuals.widgets.hovered, ThemeColors::BG_HOVER, ThemeColors::TEXT_PRIMARY);
    style_widget(&mut visuals.widgets.active, ThemeColors::ACCENT_PRIMARY, ThemeColors::PAPER);

    visuals.selection.bg_fill = color_with_alpha(ThemeColors::ACCENT_PRIMARY, 60);
    visuals.selection.stroke = Stroke::new(1.0, ThemeColors::ACCENT_PRIMARY);

    let mut style = (*ctx.style()).clone();
    style.visuals = visuals;
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(14.0, 6.0);
    style.text_styles = [
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(22.0, FontFamily::Proportional)),
    ]
    .into();

    ctx.set_style(style);
}

/// Helper to create a color with modified alpha
pub fn color_with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

/// Chart palette entry to an egui colour
pub fn rgb([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}
