//! Freehand drawing canvas
//!
//! Feeds pointer input into a [`StrokeRecorder`] and paints the drawing,
//! including the stroke in progress.

use egui::{Pos2, Rect, Rounding, Sense, Shape, Stroke as PenStroke, Vec2};

use crate::dashboard::theme::ThemeColors;
use crate::sketch::{Drawing, Point, StrokeRecorder};

pub struct SketchCanvas<'a> {
    drawing: &'a mut Drawing,
    recorder: &'a mut StrokeRecorder,
    stroke_weight: f32,
}

impl<'a> SketchCanvas<'a> {
    pub fn new(drawing: &'a mut Drawing, recorder: &'a mut StrokeRecorder, stroke_weight: f32) -> Self {
        Self {
            drawing,
            recorder,
            stroke_weight,
        }
    }

    /// Show the canvas. Returns `true` when a stroke was committed this frame.
    pub fn show(self, ui: &mut egui::Ui) -> bool {
        let bounds = self.recorder.bounds();
        let size = Vec2::new(bounds.width as f32, bounds.height as f32);
        let (response, painter) = ui.allocate_painter(size, Sense::drag());
        let rect = response.rect;

        let mut committed = false;
        if response.is_pointer_button_down_on() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - rect.min;
                if self.recorder.is_pressed() {
                    self.recorder.pointer_move(local.x, local.y);
                } else {
                    self.recorder.pointer_down(local.x, local.y);
                }
            }
        } else if self.recorder.is_pressed() {
            committed = self.recorder.pointer_up(self.drawing);
        }

        painter.rect_filled(rect, Rounding::ZERO, ThemeColors::PAPER);

        let pen = PenStroke::new(self.stroke_weight, ThemeColors::INK);
        for stroke in self.drawing.strokes() {
            paint_polyline(&painter, rect, stroke.points(), pen);
        }
        paint_polyline(&painter, rect, self.recorder.current(), pen);

        committed
    }
}

fn paint_polyline(painter: &egui::Painter, rect: Rect, points: &[Point], pen: PenStroke) {
    match points {
        [] => {}
        [only] => {
            painter.circle_filled(to_screen(*only, rect), pen.width / 2.0, pen.color);
        }
        _ => {
            let line: Vec<Pos2> = points.iter().map(|p| to_screen(*p, rect)).collect();
            painter.add(Shape::line(line, pen));
        }
    }
}

/// Canvas pixel to screen position (pixel centre)
pub fn to_screen(point: Point, rect: Rect) -> Pos2 {
    rect.min + Vec2::new(point.x as f32 + 0.5, point.y as f32 + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_screen_offsets_by_canvas_origin() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(500.0, 500.0));
        let pos = to_screen(Point::new(10, 20), rect);
        assert_eq!(pos, Pos2::new(110.5, 70.5));
    }
}
