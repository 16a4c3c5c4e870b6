//! Sketch Classifier - draw a sketch, get the model's top guesses
//!
//! Strokes drawn on the canvas are cropped and normalized into a 28x28 image,
//! classified on-device with an ONNX model, and the top predictions are shown
//! as a pie chart.

mod analysis;
mod app;
mod config;
mod dashboard;
mod server;
mod shared;
mod sketch;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::InferenceWorker;
use crate::config::AppConfig;
use crate::server::TransformServer;
use crate::shared::SharedAppState;
use crate::sketch::Drawing;
use crate::vision::Classifier;

/// Sketch Classifier - freehand sketch recognition
#[derive(Parser, Debug)]
#[command(name = "sketch-classifier")]
#[command(about = "Draw a sketch and classify it with an on-device model")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run the /transform HTTP endpoint
    #[arg(long)]
    serve: bool,

    /// Also run the /transform endpoint alongside the window
    #[arg(long)]
    embed_server: bool,

    /// Address for the /transform endpoint (overrides the config)
    #[arg(long)]
    bind: Option<String>,

    /// Classify a JSON stroke list and print the top predictions, without a window
    #[arg(long, value_name = "STROKES_JSON")]
    classify: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = config::load_or_default(args.config.as_deref());
    if let Some(bind) = &args.bind {
        config.server.bind_address = bind.clone();
    }
    if args.embed_server {
        config.server.enabled = true;
    }

    if args.write_config {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => storage::get_config_dir()?.join("config.toml"),
        };
        config::save_config(&config, &path)?;
        info!("Configuration written to {:?}", path);
        return Ok(());
    }

    if args.serve {
        return run_server_only(&config);
    }

    if let Some(path) = &args.classify {
        return run_classify(&config, path);
    }

    run_with_dashboard(config)
}

/// Serve the transform endpoint until the process is stopped
fn run_server_only(config: &AppConfig) -> Result<()> {
    let server = TransformServer::bind(&config.server.bind_address, config.transform_options())?;
    server.serve();
    Ok(())
}

/// Classify a drawing stored as JSON (`[[[x...], [y...]], ...]`) and print the result
fn run_classify(config: &AppConfig, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let drawing: Drawing = serde_json::from_str(&content).with_context(|| format!("Invalid stroke file {:?}", path))?;
    drawing
        .check_bounds(config.canvas_bounds())
        .with_context(|| format!("Invalid stroke file {:?}", path))?;

    let mut classifier = Classifier::load(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match runtime.block_on(classifier.predict_drawing(&drawing))? {
        None => println!("Nothing drawn"),
        Some(result) => {
            let crop: [u32; 4] = result.crop.into();
            println!("Crop box: {:?}", crop);
            for prediction in &result.predictions {
                println!("  {:<24} {:.4}", prediction.class_name, prediction.probability);
            }
        }
    }

    Ok(())
}

/// Run the drawing window, with the worker and optionally the embedded server
fn run_with_dashboard(config: AppConfig) -> Result<()> {
    info!("Sketch Classifier starting...");

    let server = if config.server.enabled {
        match TransformServer::bind(&config.server.bind_address, config.transform_options()).and_then(|s| s.spawn()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Transform endpoint disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let worker = InferenceWorker::spawn(config.clone())?;

    let shared_state = Arc::new(RwLock::new(SharedAppState::new(config)));
    shared_state.write().runtime.server_address = server
        .as_ref()
        .and_then(|s| s.address())
        .map(|addr| addr.to_string());

    if let Err(e) = dashboard::run_dashboard(shared_state, Some(worker), server) {
        error!("Dashboard error: {}", e);
    }

    info!("Sketch Classifier shutdown complete");
    Ok(())
}
