//! Shared state and messaging between the dashboard and the inference worker
//!
//! This module provides thread-safe shared state and message passing
//! for communication between the UI thread and the worker thread.

pub mod messages;
pub mod state;

pub use messages::{DashboardToWorker, WorkerToDashboard};
pub use state::{ModelStatus, SharedAppState};
