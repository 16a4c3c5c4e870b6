//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::sketch::{CanvasBounds, StrokeNormalizer};
use crate::vision::preprocess::PreprocessConfig;
use crate::vision::transform::TransformOptions;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drawing canvas settings
    pub canvas: CanvasSettings,
    /// Model and label artifacts
    pub model: ModelSettings,
    /// Transform endpoint server
    pub server: ServerSettings,
    /// Where the dashboard sends transform requests
    pub transform: TransformSettings,
}

impl AppConfig {
    pub fn canvas_bounds(&self) -> CanvasBounds {
        CanvasBounds::new(self.canvas.width, self.canvas.height)
    }

    pub fn normalizer(&self) -> StrokeNormalizer {
        StrokeNormalizer::new(
            self.canvas_bounds(),
            self.canvas.crop_padding,
            self.canvas.reposition_padding,
        )
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            stroke_weight: self.canvas.stroke_weight,
            output_size: self.model.input_size,
            // Crop boxes never extend past the canvas
            max_box_side: self.canvas.width.max(self.canvas.height),
        }
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            input_size: self.model.input_size,
            ..PreprocessConfig::default()
        }
    }
}

/// Canvas geometry and stroke normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    /// Pen thickness in pixels
    pub stroke_weight: u32,
    /// Margin around the drawing in the crop box
    pub crop_padding: u32,
    /// Offset of the drawing's top-left corner after repositioning
    pub reposition_padding: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            stroke_weight: 3,
            crop_padding: 2,
            reposition_padding: 2,
        }
    }
}

/// Classification model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Directory holding the artifacts (platform data dir when unset)
    pub models_dir: Option<PathBuf>,
    pub model_file: String,
    pub labels_file: String,
    /// Download sources used when the artifacts are missing
    pub model_url: Option<String>,
    pub labels_url: Option<String>,
    pub model_sha256: Option<String>,
    /// Side length of the square model input
    pub input_size: u32,
    /// Number of predictions shown
    pub top_k: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            models_dir: None,
            model_file: "model.onnx".to_string(),
            labels_file: "labels.txt".to_string(),
            model_url: None,
            labels_url: None,
            model_sha256: None,
            input_size: 28,
            top_k: 3,
        }
    }
}

/// Transform endpoint server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Serve `/transform` alongside the dashboard
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Transform client settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Full URL of a remote `/transform` endpoint; rasterize locally when unset
    pub remote_url: Option<String>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the configuration at `path` (or the default location), falling back to defaults
pub fn load_or_default(path: Option<&Path>) -> AppConfig {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::storage::get_config_dir()
            .ok()
            .map(|dir| dir.join("config.toml")),
    };

    if let Some(path) = path {
        if path.exists() {
            match load_config(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    return config;
                }
                Err(e) => warn!("Ignoring configuration: {:#}", e),
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.canvas.width, 500);
        assert_eq!(config.canvas.height, 500);
        assert_eq!(config.canvas.stroke_weight, 3);
        assert_eq!(config.canvas.crop_padding, 2);
        assert_eq!(config.canvas.reposition_padding, 2);

        assert_eq!(config.model.model_file, "model.onnx");
        assert_eq!(config.model.input_size, 28);
        assert_eq!(config.model.top_k, 3);

        assert!(!config.server.enabled);
        assert!(config.transform.remote_url.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.model.models_dir = Some(PathBuf::from("/opt/models"));
        config.transform.remote_url = Some("http://localhost:8000/transform".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[canvas]\nwidth = 300\n").unwrap();

        assert_eq!(parsed.canvas.width, 300);
        assert_eq!(parsed.canvas.height, 500);
        assert_eq!(parsed.model.top_k, 3);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = AppConfig::default();
        config.canvas.width = 320;
        config.canvas.crop_padding = 5;
        config.model.input_size = 32;

        let normalizer = config.normalizer();
        assert_eq!(normalizer.canvas.width, 320);
        assert_eq!(normalizer.crop_padding, 5);
        assert_eq!(config.transform_options().output_size, 32);
        assert_eq!(config.transform_options().max_box_side, 500);
        assert_eq!(config.preprocess_config().input_size, 32);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        assert!(load_config(temp_file.path()).is_err());
        assert_eq!(load_or_default(Some(temp_file.path())), AppConfig::default());
    }
}
