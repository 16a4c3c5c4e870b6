//! Pie chart of the top predictions

use egui::epaint::Mesh;
use egui::{Align2, FontId, Pos2, RichText, Rounding, Sense, Shape, Vec2};
use std::f32::consts::TAU;

use crate::analysis::PieChart;
use crate::dashboard::theme::{rgb, ThemeColors};

/// Arc segments used for a full circle
const SEGMENTS: usize = 96;

pub fn render_pie_chart(ui: &mut egui::Ui, chart: &PieChart, diameter: f32) {
    ui.vertical(|ui| {
        ui.label(RichText::new(&chart.title).size(16.0).strong().color(ThemeColors::TEXT_PRIMARY));
        ui.add_space(8.0);

        let (response, painter) = ui.allocate_painter(Vec2::splat(diameter), Sense::hover());
        let center = response.rect.center();
        let radius = diameter / 2.0;

        let mut mesh = Mesh::default();
        let mut start = -TAU / 4.0;
        for (slice, fraction) in chart.slices.iter().zip(chart.fractions()) {
            let sweep = fraction as f32 * TAU;
            if sweep > 0.0 {
                add_wedge(&mut mesh, center, radius, start, sweep, rgb(slice.color));
            }
            start += sweep;
        }
        painter.add(Shape::mesh(mesh));

        // Legend
        ui.add_space(8.0);
        for slice in &chart.slices {
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                ui.painter().rect_filled(swatch, Rounding::same(2.0), rgb(slice.color));
                ui.label(RichText::new(&slice.label).color(ThemeColors::TEXT_SECONDARY));
            });
        }
    });
}

/// Placeholder shown before the first prediction
pub fn render_empty_chart(ui: &mut egui::Ui, diameter: f32) {
    let (response, painter) = ui.allocate_painter(Vec2::splat(diameter), Sense::hover());
    painter.circle_stroke(
        response.rect.center(),
        diameter / 2.0 - 1.0,
        egui::Stroke::new(1.0, ThemeColors::BORDER),
    );
    painter.text(
        response.rect.center(),
        Align2::CENTER_CENTER,
        "Draw, then Predict",
        FontId::proportional(14.0),
        ThemeColors::TEXT_MUTED,
    );
}

fn add_wedge(mesh: &mut Mesh, center: Pos2, radius: f32, start: f32, sweep: f32, color: egui::Color32) {
    let steps = ((sweep / TAU) * SEGMENTS as f32).ceil().max(1.0) as usize;
    let base = mesh.vertices.len() as u32;
    mesh.colored_vertex(center, color);
    for i in 0..=steps {
        let angle = start + sweep * i as f32 / steps as f32;
        mesh.colored_vertex(center + radius * Vec2::angled(angle), color);
    }
    for i in 0..steps as u32 {
        mesh.add_triangle(base, base + 1 + i, base + 2 + i);
    }
}
