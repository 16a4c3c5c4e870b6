//! Sketch data model
//!
//! Strokes captured from the canvas, the drawing that collects them, and the
//! recorder that turns raw pointer samples into strokes.

pub mod normalize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use normalize::{CropBox, NormalizedSketch, StrokeNormalizer};

/// Errors raised while building strokes from wire data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrokeError {
    #[error("stroke has no points")]
    Empty,
    #[error("stroke coordinate arrays differ in length ({xs} x values, {ys} y values)")]
    LengthMismatch { xs: usize, ys: usize },
    #[error("point ({x}, {y}) lies outside the {width}x{height} canvas")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

/// Integer canvas pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Pixel extent of the drawing canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
        }
    }
}

impl CanvasBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Map a pointer position to a canvas pixel.
    ///
    /// Fractional positions are floored. Returns `None` outside `[0, width) x [0, height)`.
    pub fn pixel_at(&self, x: f32, y: f32) -> Option<Point> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (fx, fy) = (x.floor(), y.floor());
        if fx < 0.0 || fy < 0.0 || fx >= self.width as f32 || fy >= self.height as f32 {
            return None;
        }
        Some(Point::new(fx as u32, fy as u32))
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }
}

/// One continuous pointer drag.
///
/// Serialized as two parallel arrays: `[[x1, ..., xn], [y1, ..., yn]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(Vec<u32>, Vec<u32>)", into = "(Vec<u32>, Vec<u32>)")]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Build a stroke from its points. Empty point lists are rejected.
    pub fn new(points: Vec<Point>) -> Result<Self, StrokeError> {
        if points.is_empty() {
            return Err(StrokeError::Empty);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Return a copy with every point mapped through `f`
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }
}

impl TryFrom<(Vec<u32>, Vec<u32>)> for Stroke {
    type Error = StrokeError;

    fn try_from((xs, ys): (Vec<u32>, Vec<u32>)) -> Result<Self, Self::Error> {
        if xs.len() != ys.len() {
            return Err(StrokeError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        let points = xs.into_iter().zip(ys).map(|(x, y)| Point::new(x, y)).collect();
        Stroke::new(points)
    }
}

impl From<Stroke> for (Vec<u32>, Vec<u32>) {
    fn from(stroke: Stroke) -> Self {
        stroke.points.iter().map(|p| (p.x, p.y)).unzip()
    }
}

/// The full sketch: every completed stroke, in drawing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Drawing {
    strokes: Vec<Stroke>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    /// Append a finished stroke. Returns `false` if it was empty and therefore dropped.
    pub fn push(&mut self, stroke: Stroke) -> bool {
        if stroke.points.is_empty() {
            return false;
        }
        self.strokes.push(stroke);
        true
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }

    /// Iterate over every point of every stroke
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.strokes.iter().flat_map(|s| s.points.iter().copied())
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Check that every point lies on the canvas, as pointer capture guarantees.
    /// Drawings loaded from elsewhere must pass this before normalization.
    pub fn check_bounds(&self, bounds: CanvasBounds) -> Result<(), StrokeError> {
        match self.points().find(|p| !bounds.contains(*p)) {
            Some(p) => Err(StrokeError::OutOfBounds {
                x: p.x,
                y: p.y,
                width: bounds.width,
                height: bounds.height,
            }),
            None => Ok(()),
        }
    }
}

/// Records pointer samples into strokes
///
/// A stroke starts when the pointer is pressed, grows with every in-bounds move
/// while pressed, and is committed to the drawing on release.
#[derive(Debug, Clone, Default)]
pub struct StrokeRecorder {
    bounds: CanvasBounds,
    pressed: bool,
    current: Vec<Point>,
}

impl StrokeRecorder {
    pub fn new(bounds: CanvasBounds) -> Self {
        Self {
            bounds,
            pressed: false,
            current: Vec::new(),
        }
    }

    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Points of the stroke currently being drawn
    pub fn current(&self) -> &[Point] {
        &self.current
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.pressed = true;
        self.current.clear();
        self.sample(x, y);
    }

    /// Record a move. Ignored unless pressed and within bounds.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<Point> {
        if !self.pressed {
            return None;
        }
        self.sample(x, y)
    }

    /// Finish the current stroke, appending it to `drawing` when it has points
    pub fn pointer_up(&mut self, drawing: &mut Drawing) -> bool {
        self.pressed = false;
        let points = std::mem::take(&mut self.current);
        match Stroke::new(points) {
            Ok(stroke) => drawing.push(stroke),
            Err(_) => false,
        }
    }

    /// Drop any in-progress stroke
    pub fn reset(&mut self) {
        self.pressed = false;
        self.current.clear();
    }

    fn sample(&mut self, x: f32, y: f32) -> Option<Point> {
        let point = self.bounds.pixel_at(x, y)?;
        self.current.push(point);
        Some(point)
    }
}
