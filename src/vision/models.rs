//! Model management for ONNX Runtime
//!
//! Locates, optionally downloads, and loads the classification model and its
//! label list.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::ModelSettings;

/// Environment variable that disables artifact downloads
pub const OFFLINE_ENV: &str = "SKETCH_CLASSIFIER_OFFLINE";

/// Files making up a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// ONNX classification model
    Model,
    /// Class names, one per line
    Labels,
}

impl ArtifactKind {
    /// Display name for progress reporting
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "Classification Model",
            ArtifactKind::Labels => "Label List",
        }
    }
}

/// Model manifest tracking downloaded artifacts
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub source_url: String,
}

/// Resolves and fetches model artifacts
pub struct ModelManager {
    models_dir: PathBuf,
    settings: ModelSettings,
}

impl ModelManager {
    /// Create a model manager, using the platform data directory unless the
    /// settings name one
    pub fn new(settings: ModelSettings) -> Result<Self> {
        let models_dir = match &settings.models_dir {
            Some(dir) => dir.clone(),
            None => crate::storage::get_data_dir()?.join("models"),
        };
        Self::with_dir(models_dir, settings)
    }

    /// Create model manager with custom directory
    pub fn with_dir(models_dir: PathBuf, settings: ModelSettings) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)
            .with_context(|| format!("Failed to create models directory {:?}", models_dir))?;
        Ok(Self { models_dir, settings })
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Model => self.models_dir.join(&self.settings.model_file),
            ArtifactKind::Labels => self.models_dir.join(&self.settings.labels_file),
        }
    }

    fn artifact_url(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Model => self.settings.model_url.as_deref(),
            ArtifactKind::Labels => self.settings.labels_url.as_deref(),
        }
    }

    fn expected_sha256(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Model => self.settings.model_sha256.as_deref(),
            ArtifactKind::Labels => None,
        }
    }

    /// Check if an artifact is present and non-empty
    pub fn is_available(&self, kind: ArtifactKind) -> bool {
        std::fs::metadata(self.artifact_path(kind))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    pub fn are_artifacts_ready(&self) -> bool {
        self.is_available(ArtifactKind::Model) && self.is_available(ArtifactKind::Labels)
    }

    /// Return the artifact path, downloading it first if missing and a URL is configured
    pub fn ensure(&self, kind: ArtifactKind) -> Result<PathBuf> {
        let path = self.artifact_path(kind);

        if self.is_available(kind) {
            debug!("{} available at {:?}", kind.display_name(), path);
            return Ok(path);
        }

        let Some(url) = self.artifact_url(kind) else {
            anyhow::bail!("{} not found at {:?} and no download URL configured", kind.display_name(), path);
        };

        if std::env::var(OFFLINE_ENV).is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download {}. Download it from {} and place it at {:?}",
                kind.display_name(),
                url,
                path
            );
        }

        info!("Downloading {} from {}", kind.display_name(), url);
        let rt = Runtime::new().context("Failed to create tokio runtime")?;
        let hash = rt.block_on(download_file(url, &path, self.expected_sha256(kind)))?;

        self.record_download(&path, url, hash)?;
        info!("Successfully downloaded {}", kind.display_name());
        Ok(path)
    }

    /// Make sure both the model and the labels are present
    pub fn ensure_all(&self) -> Result<(PathBuf, PathBuf)> {
        let model = self.ensure(ArtifactKind::Model)?;
        let labels = self.ensure(ArtifactKind::Labels)?;
        Ok((model, labels))
    }

    fn record_download(&self, path: &Path, url: &str, sha256: String) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let info = ArtifactInfo {
            size_bytes: std::fs::metadata(path)?.len(),
            filename,
            sha256,
            source_url: url.to_string(),
        };

        if let Some(existing) = manifest.artifacts.iter_mut().find(|a| a.filename == info.filename) {
            *existing = info;
        } else {
            manifest.artifacts.push(info);
        }

        self.save_manifest(&manifest)
    }

    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(ModelManifest::default())
        }
    }

    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        std::fs::write(manifest_path, serde_json::to_string_pretty(manifest)?)?;
        Ok(())
    }
}

/// Stream a file to disk, verifying its checksum when one is given.
/// Returns the hex SHA-256 of the downloaded bytes.
async fn download_file(url: &str, path: &Path, expected_sha256: Option<&str>) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send download request")?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    debug!("Download size: {:?} bytes", response.content_length());

    let temp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Error reading download stream")?;
        file.write_all(&chunk).context("Failed to write to temp file")?;
        hasher.update(&chunk);
    }

    file.flush().context("Failed to flush temp file")?;
    drop(file);

    let hash = format!("{:x}", hasher.finalize());
    if let Some(expected) = expected_sha256 {
        if !hash.eq_ignore_ascii_case(expected) {
            std::fs::remove_file(&temp_path).ok();
            anyhow::bail!("Checksum mismatch for {:?}: expected {}, got {}", path, expected, hash);
        }
        info!("Checksum verified for {:?}", path);
    }

    std::fs::rename(&temp_path, path).context("Failed to move downloaded file to final location")?;
    Ok(hash)
}

/// Read a label file: one class per line, surrounding whitespace and blank lines ignored
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read labels from {:?}", path))?;
    Ok(parse_labels(&content))
}

pub fn parse_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// ONNX Runtime session wrapper
pub struct OnnxSession {
    session: Session,
    input_names: Vec<String>,
}

impl OnnxSession {
    /// Create a new ONNX session from a model file
    pub fn new(model_path: &Path) -> Result<Self> {
        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(model_path)
            .context("Failed to load ONNX model")?;

        let input_names: Vec<String> = session.inputs.iter().map(|input| input.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|output| output.name.clone()).collect();

        info!("Model loaded. Inputs: {:?}, Outputs: {:?}", input_names, output_names);

        Ok(Self { session, input_names })
    }

    /// Run the model on one input tensor and return the flattened first output
    pub fn run(&mut self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_name = self
            .input_names
            .first()
            .cloned()
            .context("Model has no inputs")?;

        let tensor = Tensor::from_array(input).context("Failed to build input tensor")?;
        let outputs = self
            .session
            .run(ort::inputs![input_name => tensor])
            .context("Inference failed")?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Model output is not a float tensor")?;

        Ok(scores.to_vec())
    }

    /// Run once on `input` so the first real prediction doesn't pay setup costs
    pub fn warmup(&mut self, input: Array4<f32>) -> Result<usize> {
        let scores = self.run(input)?;
        if scores.is_empty() {
            warn!("Warmup produced an empty output");
        }
        Ok(scores.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("zero\n one \n\ntwo\r\n");
        assert_eq!(labels, vec!["zero", "one", "two"]);
    }

    #[test]
    fn test_load_labels_missing_file() {
        assert!(load_labels(Path::new("/nonexistent/labels.txt")).is_err());
    }

    #[test]
    fn test_artifact_paths_and_availability() {
        let dir = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf(), ModelSettings::default()).unwrap();

        assert_eq!(manager.artifact_path(ArtifactKind::Model), dir.path().join("model.onnx"));
        assert!(!manager.are_artifacts_ready());

        std::fs::write(manager.artifact_path(ArtifactKind::Labels), "a\nb\n").unwrap();
        assert!(manager.is_available(ArtifactKind::Labels));
        assert!(!manager.is_available(ArtifactKind::Model));

        // Empty files don't count
        std::fs::write(manager.artifact_path(ArtifactKind::Model), b"").unwrap();
        assert!(!manager.is_available(ArtifactKind::Model));
    }

    #[test]
    fn test_ensure_without_url_fails() {
        let dir = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf(), ModelSettings::default()).unwrap();

        let err = manager.ensure(ArtifactKind::Model).unwrap_err();
        assert!(err.to_string().contains("no download URL"));
    }

    #[test]
    fn test_ensure_returns_existing_path() {
        let dir = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf(), ModelSettings::default()).unwrap();
        std::fs::write(manager.artifact_path(ArtifactKind::Labels), "cat\n").unwrap();

        let path = manager.ensure(ArtifactKind::Labels).unwrap();
        assert_eq!(path, dir.path().join("labels.txt"));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(dir.path().to_path_buf(), ModelSettings::default()).unwrap();
        assert!(manager.load_manifest().unwrap().artifacts.is_empty());

        let manifest = ModelManifest {
            artifacts: vec![ArtifactInfo {
                filename: "model.onnx".to_string(),
                size_bytes: 42,
                sha256: "abc".to_string(),
                source_url: "http://localhost/model.onnx".to_string(),
            }],
        };
        manager.save_manifest(&manifest).unwrap();

        let loaded = manager.load_manifest().unwrap();
        assert_eq!(loaded.artifacts.len(), 1);
        assert_eq!(loaded.artifacts[0].size_bytes, 42);
    }
}
