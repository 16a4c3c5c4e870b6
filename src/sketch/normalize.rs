//! Stroke normalization
//!
//! Turns raw canvas strokes into a model-ready crop: the drawing is shifted so
//! its top-left corner sits at a small padding offset, then a padded, roughly
//! square crop window is computed around it and clamped to the canvas.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CanvasBounds, Drawing, Point};

/// Crop window `[min_x, min_y, max_x, max_y]` in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct CropBox {
    pub min: Point,
    pub max: Point,
}

impl CropBox {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn width(&self) -> u32 {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> u32 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// True when the box encloses a positive area
    pub fn has_area(&self) -> bool {
        self.max.x > self.min.x && self.max.y > self.min.y
    }
}

impl From<[u32; 4]> for CropBox {
    fn from([min_x, min_y, max_x, max_y]: [u32; 4]) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

impl From<CropBox> for [u32; 4] {
    fn from(b: CropBox) -> Self {
        [b.min.x, b.min.y, b.max.x, b.max.y]
    }
}

/// Result of normalizing a drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSketch {
    /// Minimum corner of the original drawing
    pub origin: Point,
    /// Strokes translated so their minimum corner equals the reposition padding
    pub strokes: Drawing,
    /// Crop window over the translated strokes
    pub crop: CropBox,
}

/// Computes repositioned strokes and crop boxes for a canvas
#[derive(Debug, Clone, Copy)]
pub struct StrokeNormalizer {
    pub canvas: CanvasBounds,
    /// Margin added around the drawing when computing the crop box
    pub crop_padding: u32,
    /// Offset of the drawing's top-left corner after repositioning
    pub reposition_padding: u32,
}

impl Default for StrokeNormalizer {
    fn default() -> Self {
        Self {
            canvas: CanvasBounds::default(),
            crop_padding: 2,
            reposition_padding: 2,
        }
    }
}

impl StrokeNormalizer {
    pub fn new(canvas: CanvasBounds, crop_padding: u32, reposition_padding: u32) -> Self {
        Self {
            canvas,
            crop_padding,
            reposition_padding,
        }
    }

    /// Run the full normalization. `None` for an empty drawing.
    pub fn normalize(&self, drawing: &Drawing) -> Option<NormalizedSketch> {
        let origin = minimum_corner(drawing)?;
        let strokes = self.reposition(drawing);
        let crop = self.bounding_box(&strokes)?;

        debug!(
            "Normalized {} strokes: origin=({}, {}), crop={:?}",
            drawing.stroke_count(),
            origin.x,
            origin.y,
            <[u32; 4]>::from(crop)
        );

        Some(NormalizedSketch {
            origin,
            strokes,
            crop,
        })
    }

    /// Translate every point so the drawing's minimum corner lands on the padding offset
    pub fn reposition(&self, drawing: &Drawing) -> Drawing {
        let Some(min) = minimum_corner(drawing) else {
            return Drawing::new();
        };
        let pad = self.reposition_padding;

        let strokes = drawing
            .strokes()
            .iter()
            .map(|stroke| {
                stroke.map_points(|p| Point::new((p.x - min.x).saturating_add(pad), (p.y - min.y).saturating_add(pad)))
            })
            .collect();

        Drawing::from_strokes(strokes)
    }

    /// Padded, squared crop window around all points, clamped to the canvas.
    ///
    /// The longer side decides the box: a wide drawing keeps its horizontal
    /// extent and grows downward from the top edge by its width, a tall (or
    /// square) one keeps its vertical extent and grows rightward by its height.
    pub fn bounding_box(&self, drawing: &Drawing) -> Option<CropBox> {
        let (min, max) = extent(drawing)?;
        let pad = self.crop_padding;
        let (canvas_w, canvas_h) = (self.canvas.width, self.canvas.height);

        let width = max.x - min.x;
        let height = max.y - min.y;

        let min_x = min.x.saturating_sub(pad).min(canvas_w);
        let min_y = min.y.saturating_sub(pad).min(canvas_h);

        let (max_x, max_y) = if width > height {
            (
                max.x.saturating_add(pad).min(canvas_w),
                min.y.saturating_add(pad).saturating_add(width).min(canvas_h),
            )
        } else {
            (
                min.x.saturating_add(pad).saturating_add(height).min(canvas_w),
                max.y.saturating_add(pad).min(canvas_h),
            )
        };

        Some(CropBox::new(min_x, min_y, max_x.max(min_x), max_y.max(min_y)))
    }
}

/// Minimum `(x, y)` across all points of all strokes
pub fn minimum_corner(drawing: &Drawing) -> Option<Point> {
    extent(drawing).map(|(min, _)| min)
}

/// Minimum and maximum corners across all points
fn extent(drawing: &Drawing) -> Option<(Point, Point)> {
    drawing.points().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((min, max)) => Some((
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )),
    })
}
