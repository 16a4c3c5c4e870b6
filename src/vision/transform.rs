//! Stroke rasterization
//!
//! Renders the strokes inside a crop box onto a white canvas and shrinks the
//! result to the model's input size. This is the work behind `POST /transform`.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::sketch::{CropBox, NormalizedSketch, Point, Stroke};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// Errors produced by the transform step
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("crop box {0:?} has no area")]
    EmptyBox([u32; 4]),
    #[error("crop box is {width}x{height}, larger than the {limit} pixel limit")]
    BoxTooLarge { width: u32, height: u32, limit: u32 },
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Body of a transform request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub strokes: Vec<Stroke>,
    #[serde(rename = "box")]
    pub crop: CropBox,
}

impl From<&NormalizedSketch> for TransformRequest {
    fn from(sketch: &NormalizedSketch) -> Self {
        Self {
            strokes: sketch.strokes.strokes().to_vec(),
            crop: sketch.crop,
        }
    }
}

/// Rasterization settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Line thickness in canvas pixels
    pub stroke_weight: u32,
    /// Side length of the square output image
    pub output_size: u32,
    /// Largest accepted crop box side
    pub max_box_side: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            stroke_weight: 3,
            output_size: 28,
            max_box_side: 4096,
        }
    }
}

/// Draw the request's strokes at crop resolution, without resizing
pub fn render_crop(request: &TransformRequest, options: &TransformOptions) -> Result<GrayImage, TransformError> {
    let crop = request.crop;
    if !crop.has_area() {
        return Err(TransformError::EmptyBox(crop.into()));
    }
    if crop.width() > options.max_box_side || crop.height() > options.max_box_side {
        return Err(TransformError::BoxTooLarge {
            width: crop.width(),
            height: crop.height(),
            limit: options.max_box_side,
        });
    }
    let stroke_weight = options.stroke_weight;

    let mut canvas = GrayImage::from_pixel(crop.width(), crop.height(), PAPER);
    let to_local = |p: Point| (p.x as f32 - crop.min.x as f32, p.y as f32 - crop.min.y as f32);

    for stroke in &request.strokes {
        let points: Vec<(f32, f32)> = stroke.points().iter().copied().map(to_local).collect();
        match points.as_slice() {
            [only] => stamp(&mut canvas, *only, stroke_weight),
            _ => {
                for pair in points.windows(2) {
                    draw_thick_segment(&mut canvas, pair[0], pair[1], stroke_weight);
                }
            }
        }
    }

    Ok(canvas)
}

/// Render and resize to the model input size
pub fn rasterize(request: &TransformRequest, options: &TransformOptions) -> Result<GrayImage, TransformError> {
    let crop = render_crop(request, options)?;
    debug!(
        "Rendered {} strokes at {}x{}, resizing to {}",
        request.strokes.len(),
        crop.width(),
        crop.height(),
        options.output_size
    );
    Ok(imageops::resize(
        &crop,
        options.output_size,
        options.output_size,
        FilterType::CatmullRom,
    ))
}

/// Full transform: rasterize and encode as PNG
pub fn transform_to_png(request: &TransformRequest, options: &TransformOptions) -> Result<Vec<u8>, TransformError> {
    let image = rasterize(request, options)?;
    encode_png(&image)
}

pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, TransformError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn decode_png(bytes: &[u8]) -> Result<GrayImage> {
    let image = image::load_from_memory(bytes).context("Failed to decode transformed image")?;
    Ok(image.to_luma8())
}

fn draw_thick_segment(canvas: &mut GrayImage, from: (f32, f32), to: (f32, f32), weight: u32) {
    // Only the part of the segment that can leave ink on the canvas
    let margin = (weight / 2) as f32 + 1.0;
    let lo = (-margin, -margin);
    let hi = (canvas.width() as f32 - 1.0 + margin, canvas.height() as f32 - 1.0 + margin);
    let Some((from, to)) = clip_segment(from, to, lo, hi) else {
        return;
    };

    if weight <= 1 {
        draw_line_segment_mut(canvas, from, to, INK);
        return;
    }

    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(canvas, (from.0 + dx * t, from.1 + dy * t), weight);
    }
}

fn stamp(canvas: &mut GrayImage, center: (f32, f32), weight: u32) {
    let radius = (weight / 2) as i32;
    let reach = radius as f32 + 1.0;
    if center.0 < -reach
        || center.1 < -reach
        || center.0 > canvas.width() as f32 + reach
        || center.1 > canvas.height() as f32 + reach
    {
        return;
    }
    let center = (center.0.round() as i32, center.1.round() as i32);
    if radius == 0 {
        if center.0 >= 0 && center.1 >= 0 {
            let (x, y) = (center.0 as u32, center.1 as u32);
            if x < canvas.width() && y < canvas.height() {
                canvas.put_pixel(x, y, INK);
            }
        }
        return;
    }
    draw_filled_circle_mut(canvas, center, radius, INK);
}

/// Liang-Barsky clip of a segment to the rectangle `lo..=hi`
fn clip_segment(from: (f32, f32), to: (f32, f32), lo: (f32, f32), hi: (f32, f32)) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);

    for (p, q) in [
        (-dx, from.0 - lo.0),
        (dx, hi.0 - from.0),
        (-dy, from.1 - lo.1),
        (dy, hi.1 - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (from.0 + dx * t0, from.1 + dy * t0),
        (from.0 + dx * t1, from.1 + dy * t1),
    ))
}

/// Where the transform step runs
#[derive(Debug, Clone)]
pub enum TransformClient {
    /// Rasterize in-process
    Local(TransformOptions),
    /// POST to a running `/transform` endpoint
    Remote { url: String, client: reqwest::Client },
}

impl TransformClient {
    pub fn local(options: TransformOptions) -> Self {
        TransformClient::Local(options)
    }

    pub fn remote(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(TransformClient::Remote {
            url: url.into(),
            client,
        })
    }

    /// Produce the model-sized grayscale image for a request
    pub async fn transform(&self, request: &TransformRequest) -> Result<GrayImage> {
        match self {
            TransformClient::Local(options) => Ok(rasterize(request, options)?),
            TransformClient::Remote { url, client } => {
                let response = client
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    .context("Failed to send transform request")?;

                if !response.status().is_success() {
                    anyhow::bail!("Transform failed with status {}: {}", response.status(), url);
                }

                let bytes = response.bytes().await.context("Failed to read transform response")?;
                decode_png(&bytes)
            }
        }
    }
}
