//! Message types for communication between dashboard and inference worker

use crate::sketch::Drawing;
use crate::vision::Classification;

/// Messages sent from dashboard to the worker
#[derive(Debug, Clone)]
pub enum DashboardToWorker {
    /// Classify a snapshot of the drawing
    Predict(Drawing),
    /// Stop the worker loop
    Shutdown,
}

/// Messages sent from the worker to the dashboard
#[derive(Debug, Clone)]
pub enum WorkerToDashboard {
    /// Model and labels are loaded and warmed up
    ModelLoaded { classes: usize },
    /// Model could not be loaded; predictions are unavailable
    ModelFailed(String),
    /// Finished prediction; `None` when the drawing was empty
    Prediction(Option<Classification>),
    /// Prediction failed
    Error(String),
}
