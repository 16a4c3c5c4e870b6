//! Vision Layer
//!
//! Turns a drawing into ranked class predictions:
//! normalize strokes, transform to a model-sized image, preprocess, run the
//! model, rank the scores.

pub mod models;
pub mod preprocess;
pub mod transform;

use anyhow::{Context, Result};
use image::GrayImage;
use ndarray::Array4;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::{top_k, Prediction};
use crate::config::AppConfig;
use crate::sketch::{CropBox, Drawing, StrokeNormalizer};

pub use models::{ModelManager, OnnxSession};
pub use preprocess::PreprocessConfig;
pub use transform::{TransformClient, TransformOptions, TransformRequest};

/// Classification failures that are not I/O or runtime errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("No labels found!")]
    NoLabels,
    #[error("model produced no scores")]
    EmptyOutput,
}

/// Anything that maps an input tensor to class scores
pub trait ScoreModel: Send {
    fn scores(&mut self, input: Array4<f32>) -> Result<Vec<f32>>;
}

impl ScoreModel for OnnxSession {
    fn scores(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        self.run(input)
    }
}

/// Result of classifying one drawing
#[derive(Debug, Clone)]
pub struct Classification {
    pub predictions: Vec<Prediction>,
    /// The image the model saw
    pub image: GrayImage,
    /// Crop window sent to the transform step
    pub crop: CropBox,
}

/// The full drawing-to-predictions pipeline
pub struct Classifier {
    model: Box<dyn ScoreModel>,
    labels: Vec<String>,
    normalizer: StrokeNormalizer,
    transform: TransformClient,
    preprocess: PreprocessConfig,
    top_k: usize,
}

impl Classifier {
    pub fn new(
        model: Box<dyn ScoreModel>,
        labels: Vec<String>,
        normalizer: StrokeNormalizer,
        transform: TransformClient,
        preprocess: PreprocessConfig,
        top_k: usize,
    ) -> Self {
        Self {
            model,
            labels,
            normalizer,
            transform,
            preprocess,
            top_k,
        }
    }

    /// Locate (or download) the artifacts, load and warm up the model
    pub fn load(config: &AppConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Model loading...");

        let manager = ModelManager::new(config.model.clone())?;
        if !manager.are_artifacts_ready() {
            info!("Model artifacts missing, fetching from configured sources");
        }
        let (model_path, labels_path) = manager.ensure_all()?;

        let preprocess = config.preprocess_config();
        let mut session = OnnxSession::new(&model_path)?;
        let outputs = session
            .warmup(preprocess::warmup_tensor(&preprocess))
            .context("Model warmup failed")?;

        let labels = models::load_labels(&labels_path)?;
        if outputs != labels.len() {
            warn!("Model produces {} scores but {} labels were loaded", outputs, labels.len());
        }

        let transform = match &config.transform.remote_url {
            Some(url) => TransformClient::remote(url.clone())?,
            None => TransformClient::local(config.transform_options()),
        };

        info!("Model loaded! ({} classes) in {:?}", labels.len(), start.elapsed());

        Ok(Self::new(
            Box::new(session),
            labels,
            config.normalizer(),
            transform,
            preprocess,
            config.model.top_k,
        ))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Score an already transformed image
    pub fn classify_image(&mut self, image: &GrayImage) -> Result<Vec<Prediction>> {
        if self.labels.is_empty() {
            return Err(ClassifierError::NoLabels.into());
        }

        let tensor = preprocess::preprocess_for_classification(image, &self.preprocess);
        let scores = self.model.scores(tensor)?;
        if scores.is_empty() {
            return Err(ClassifierError::EmptyOutput.into());
        }

        Ok(top_k(&scores, &self.labels, self.top_k))
    }

    /// Classify a drawing. `Ok(None)` when there is nothing drawn.
    pub async fn predict_drawing(&mut self, drawing: &Drawing) -> Result<Option<Classification>> {
        if drawing.is_empty() {
            return Ok(None);
        }
        if self.labels.is_empty() {
            return Err(ClassifierError::NoLabels.into());
        }

        let start = Instant::now();
        let Some(sketch) = self.normalizer.normalize(drawing) else {
            return Ok(None);
        };

        let request = TransformRequest::from(&sketch);
        let image = self.transform.transform(&request).await?;
        let predictions = self.classify_image(&image)?;

        debug!("Prediction took {:?}: {:?}", start.elapsed(), predictions);

        Ok(Some(Classification {
            predictions,
            image,
            crop: sketch.crop,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::{Point, Stroke};

    /// Scores each class by how much ink falls in its third of the image
    struct InkByColumn;

    impl ScoreModel for InkByColumn {
        fn scores(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
            let (_, h, w, _) = input.dim();
            let mut ink = [0.0f32; 3];
            for y in 0..h {
                for x in 0..w {
                    ink[(x * 3 / w).min(2)] += 255.0 - input[[0, y, x, 0]];
                }
            }
            let total: f32 = ink.iter().sum::<f32>().max(1.0);
            Ok(ink.iter().map(|v| v / total).collect())
        }
    }

    fn classifier(labels: &[&str]) -> Classifier {
        Classifier::new(
            Box::new(InkByColumn),
            labels.iter().map(|s| s.to_string()).collect(),
            StrokeNormalizer::default(),
            TransformClient::local(TransformOptions::default()),
            PreprocessConfig::default(),
            3,
        )
    }

    fn stroke(points: &[(u32, u32)]) -> Stroke {
        Stroke::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_drawing_is_noop() {
        let mut classifier = classifier(&["left", "middle", "right"]);
        let result = classifier.predict_drawing(&Drawing::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_labels_error() {
        let mut classifier = classifier(&[]);
        let drawing = Drawing::from_strokes(vec![stroke(&[(10, 10), (20, 20)])]);

        let err = classifier.predict_drawing(&drawing).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ClassifierError>(), Some(&ClassifierError::NoLabels));
        assert_eq!(err.to_string(), "No labels found!");
    }

    #[tokio::test]
    async fn test_predict_drawing_ranks_classes() {
        let mut classifier = classifier(&["left", "middle", "right"]);
        // A tall vertical bar: after squaring the crop it sits in the left third
        let drawing = Drawing::from_strokes(vec![stroke(&[(200, 100), (200, 400)])]);

        let result = classifier.predict_drawing(&drawing).await.unwrap().unwrap();

        assert_eq!(result.image.dimensions(), (28, 28));
        assert_eq!(result.crop, CropBox::new(0, 0, 304, 304));
        assert_eq!(result.predictions.len(), 3);
        assert_eq!(result.predictions[0].class_name, "left");
        assert!(result.predictions[0].probability > 0.9);
    }
}
