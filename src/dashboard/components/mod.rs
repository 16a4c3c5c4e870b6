//! Reusable UI components for the dashboard

pub mod pie_chart;
pub mod sketch_canvas;
pub mod status_card;

pub use pie_chart::{render_empty_chart, render_pie_chart};
pub use sketch_canvas::SketchCanvas;
pub use status_card::{CardStatus, StatusCard};
