//! Dashboard UI Module
//!
//! The sketch window: drawing canvas, Predict / Clear controls, the image the
//! model saw, and the pie chart of the top predictions.

pub mod app;
pub mod components;
pub mod theme;

pub use app::{run_dashboard, DashboardApp};
