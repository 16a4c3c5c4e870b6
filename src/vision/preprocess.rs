//! Image preprocessing for the classification model
//!
//! Converts the transformed grayscale image into the NHWC float tensor the
//! model expects.

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::{Array2, Array4};

/// Preprocessing configuration
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Side length of the square model input
    pub input_size: u32,
    /// Multiplier applied to raw 0-255 pixel values
    pub scale: f32,
    /// Flip to white-on-black before scaling
    pub invert: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: 28,
            // The model was trained on raw pixel values
            scale: 1.0,
            invert: false,
        }
    }
}

/// Convert a grayscale image to an `(height, width)` f32 array
pub fn gray_to_f32(image: &GrayImage, config: &PreprocessConfig) -> Array2<f32> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let value = image.get_pixel(x as u32, y as u32)[0];
        let value = if config.invert { 255 - value } else { value };
        value as f32 * config.scale
    })
}

/// Add batch and channel axes: `(h, w)` -> `(1, h, w, 1)`
pub fn hw_to_nhwc(image: &Array2<f32>) -> Array4<f32> {
    let (h, w) = image.dim();
    Array4::from_shape_fn((1, h, w, 1), |(_, y, x, _)| image[[y, x]])
}

/// Full preprocessing pipeline
///
/// Images that are not already at the input size are resized first.
pub fn preprocess_for_classification(image: &GrayImage, config: &PreprocessConfig) -> Array4<f32> {
    let size = config.input_size;
    let gray = if image.dimensions() == (size, size) {
        gray_to_f32(image, config)
    } else {
        let resized = imageops::resize(image, size, size, FilterType::CatmullRom);
        gray_to_f32(&resized, config)
    };
    hw_to_nhwc(&gray)
}

/// All-zero input used to warm up a freshly loaded session
pub fn warmup_tensor(config: &PreprocessConfig) -> Array4<f32> {
    let size = config.input_size as usize;
    Array4::zeros((1, size, size, 1))
}
