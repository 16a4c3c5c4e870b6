//! Dashboard application entry point

use eframe::egui;
use egui::{ColorImage, RichText, TextureHandle, TextureOptions};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analysis::PieChart;
use crate::app::InferenceWorker;
use crate::dashboard::components::{render_empty_chart, render_pie_chart, SketchCanvas, StatusCard};
use crate::dashboard::theme::{self, ThemeColors};
use crate::server::ServerHandle;
use crate::shared::{DashboardToWorker, ModelStatus, SharedAppState, WorkerToDashboard};
use crate::sketch::{Drawing, StrokeRecorder};
use crate::vision::Classification;

const CHART_DIAMETER: f32 = 220.0;
const PREVIEW_SIZE: f32 = 112.0;

/// The main dashboard application
pub struct DashboardApp {
    /// Shared application state
    shared_state: Arc<RwLock<SharedAppState>>,
    /// Background inference thread
    worker: Option<InferenceWorker>,
    /// Embedded transform endpoint, kept alive for the app's lifetime
    _server: Option<ServerHandle>,
    drawing: Drawing,
    recorder: StrokeRecorder,
    chart: Option<PieChart>,
    /// 28x28 image from the last prediction
    preview: Option<TextureHandle>,
    /// Result of a request issued before the last clear should be dropped
    discard_pending: bool,
    theme_applied: bool,
}

impl DashboardApp {
    pub fn new(
        shared_state: Arc<RwLock<SharedAppState>>,
        worker: Option<InferenceWorker>,
        server: Option<ServerHandle>,
    ) -> Self {
        let bounds = shared_state.read().config.canvas_bounds();

        Self {
            shared_state,
            worker,
            _server: server,
            drawing: Drawing::new(),
            recorder: StrokeRecorder::new(bounds),
            chart: None,
            preview: None,
            discard_pending: false,
            theme_applied: false,
        }
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    /// Send the current drawing to the worker. No-op when nothing is drawn.
    pub fn predict(&mut self) {
        if self.drawing.is_empty() {
            return;
        }

        let mut state = self.shared_state.write();
        if state.runtime.is_predicting {
            return;
        }

        match &self.worker {
            Some(worker) if worker.send(DashboardToWorker::Predict(self.drawing.clone())) => {
                debug!("Prediction requested for {} strokes", self.drawing.stroke_count());
                state.runtime.is_predicting = true;
                state.runtime.clear_error();
                self.discard_pending = false;
            }
            _ => state.runtime.set_error("Inference worker is not running"),
        }
    }

    /// Reset the canvas, the chart and the preview
    pub fn clear(&mut self) {
        self.drawing.clear();
        self.recorder.reset();
        self.chart = None;
        self.preview = None;

        let mut state = self.shared_state.write();
        self.discard_pending = state.runtime.is_predicting;
        state.runtime.clear_error();
    }

    /// Apply results from the worker
    fn process_worker_messages(&mut self, ctx: &egui::Context) {
        let Some(worker) = &self.worker else {
            return;
        };

        let mut messages = Vec::new();
        while let Some(message) = worker.try_recv() {
            messages.push(message);
        }

        for message in messages {
            match message {
                WorkerToDashboard::ModelLoaded { classes } => {
                    info!("Model ready with {} classes", classes);
                    self.shared_state.write().runtime.model_status = ModelStatus::Ready { classes };
                }
                WorkerToDashboard::ModelFailed(reason) => {
                    let mut state = self.shared_state.write();
                    state.runtime.set_error(reason.clone());
                    state.runtime.model_status = ModelStatus::Failed(reason);
                }
                WorkerToDashboard::Prediction(result) => {
                    self.finish_request(true);
                    if !std::mem::take(&mut self.discard_pending) {
                        if let Some(result) = result {
                            self.show_result(ctx, result);
                        }
                    }
                }
                WorkerToDashboard::Error(reason) => {
                    self.finish_request(false);
                    self.discard_pending = false;
                    self.shared_state.write().runtime.set_error(reason);
                }
            }
        }
    }

    fn finish_request(&mut self, succeeded: bool) {
        let mut state = self.shared_state.write();
        state.runtime.is_predicting = false;
        if succeeded {
            state.runtime.predictions_made += 1;
        }
    }

    fn show_result(&mut self, ctx: &egui::Context, result: Classification) {
        info!("Top predictions: {:?}", result.predictions);
        self.chart = Some(PieChart::from_predictions(&result.predictions));

        let (w, h) = result.image.dimensions();
        let image = ColorImage::from_gray([w as usize, h as usize], result.image.as_raw());
        self.preview = Some(ctx.load_texture("transformed-sketch", image, TextureOptions::NEAREST));
    }

    /// Create eframe options for the window
    pub fn options(canvas_width: f32, canvas_height: f32) -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([canvas_width + 360.0, canvas_height + 140.0])
                .with_min_inner_size([canvas_width + 320.0, canvas_height + 120.0])
                .with_title("Sketch Classifier"),
            ..Default::default()
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let (model_ready, predicting) = {
            let state = self.shared_state.read();
            (state.runtime.model_status.is_ready(), state.runtime.is_predicting)
        };

        ui.horizontal(|ui| {
            let predict = ui.add_enabled(
                model_ready && !predicting && !self.drawing.is_empty(),
                egui::Button::new("Predict"),
            );
            if predict.clicked() {
                self.predict();
            }
            if ui.button("Clear").clicked() {
                self.clear();
            }
            if predicting {
                ui.spinner();
            }
            ui.label(
                RichText::new(format!(
                    "{} strokes, {} points",
                    self.drawing.stroke_count(),
                    self.drawing.point_count()
                ))
                .color(ThemeColors::TEXT_MUTED),
            );
        });
    }

    fn render_side_panel(&self, ui: &mut egui::Ui) {
        let state = self.shared_state.read();

        StatusCard::for_model(&state.runtime.model_status).show(ui);
        if state.runtime.predictions_made > 0 {
            ui.add_space(4.0);
            ui.label(
                RichText::new(format!("{} predictions this session", state.runtime.predictions_made))
                    .size(12.0)
                    .color(ThemeColors::TEXT_MUTED),
            );
        }
        if let Some(address) = &state.runtime.server_address {
            ui.add_space(4.0);
            ui.label(
                RichText::new(format!("POST http://{}/transform", address))
                    .size(12.0)
                    .color(ThemeColors::TEXT_MUTED),
            );
        }

        ui.add_space(16.0);
        match &self.chart {
            Some(chart) => render_pie_chart(ui, chart, CHART_DIAMETER),
            None => render_empty_chart(ui, CHART_DIAMETER),
        }

        if let Some(preview) = &self.preview {
            ui.add_space(16.0);
            ui.label(RichText::new("Model input").size(12.0).color(ThemeColors::TEXT_MUTED));
            ui.add(egui::Image::new(preview).fit_to_exact_size(egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE)));
        }

        if let Some(error) = &state.runtime.last_error {
            ui.add_space(16.0);
            ui.label(RichText::new(error).color(ThemeColors::ACCENT_ERROR));
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.process_worker_messages(ctx);

        // Keep polling while the worker is busy or still loading
        let waiting = {
            let state = self.shared_state.read();
            state.runtime.is_predicting || state.runtime.model_status == ModelStatus::Loading
        };
        if waiting {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }

        egui::SidePanel::right("results")
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::Frame::none().inner_margin(16.0).show(ui, |ui| {
                    self.render_side_panel(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(16.0).show(ui, |ui| {
                ui.heading(RichText::new("Sketch Classifier").strong());
                ui.add_space(8.0);
                self.render_controls(ui);
                ui.add_space(8.0);

                let weight = self.shared_state.read().config.canvas.stroke_weight as f32;
                if SketchCanvas::new(&mut self.drawing, &mut self.recorder, weight).show(ui) {
                    debug!("Stroke committed ({} total)", self.drawing.stroke_count());
                }
            });
        });
    }
}

/// Run the dashboard application
pub fn run_dashboard(
    shared_state: Arc<RwLock<SharedAppState>>,
    worker: Option<InferenceWorker>,
    server: Option<ServerHandle>,
) -> Result<(), eframe::Error> {
    let (width, height) = {
        let state = shared_state.read();
        (state.config.canvas.width as f32, state.config.canvas.height as f32)
    };
    let app = DashboardApp::new(shared_state, worker, server);

    eframe::run_native(
        "Sketch Classifier",
        DashboardApp::options(width, height),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::sketch::{Point, Stroke};

    fn app() -> DashboardApp {
        let state = Arc::new(RwLock::new(SharedAppState::new(AppConfig::default())));
        DashboardApp::new(state, None, None)
    }

    #[test]
    fn test_clear_resets_drawing_and_chart() {
        let mut app = app();
        app.drawing.push(Stroke::new(vec![Point::new(3, 4)]).unwrap());
        app.chart = Some(PieChart::from_predictions(&[]));

        app.clear();

        assert!(app.drawing().is_empty());
        assert!(app.chart.is_none());
        assert!(app.preview.is_none());
    }

    #[test]
    fn test_predict_on_empty_drawing_is_noop() {
        let mut app = app();
        app.predict();

        let state = app.shared_state.read();
        assert!(!state.runtime.is_predicting);
        assert!(state.runtime.last_error.is_none());
    }

    #[test]
    fn test_worker_results_update_chart_and_count() {
        use crate::sketch::StrokeNormalizer;
        use crate::vision::{Classifier, PreprocessConfig, ScoreModel, TransformClient, TransformOptions};
        use ndarray::Array4;
        use std::time::{Duration, Instant};

        struct Fixed;
        impl ScoreModel for Fixed {
            fn scores(&mut self, _input: Array4<f32>) -> anyhow::Result<Vec<f32>> {
                Ok(vec![0.2, 0.8])
            }
        }

        let worker = InferenceWorker::spawn_with(|| {
            Ok(Classifier::new(
                Box::new(Fixed),
                vec!["circle".into(), "line".into()],
                StrokeNormalizer::default(),
                TransformClient::local(TransformOptions::default()),
                PreprocessConfig::default(),
                3,
            ))
        })
        .unwrap();
        let state = Arc::new(RwLock::new(SharedAppState::new(AppConfig::default())));
        let mut app = DashboardApp::new(state, Some(worker), None);
        let ctx = egui::Context::default();

        let pump = |app: &mut DashboardApp, done: &dyn Fn(&DashboardApp) -> bool| {
            let deadline = Instant::now() + Duration::from_secs(10);
            while !done(app) && Instant::now() < deadline {
                app.process_worker_messages(&ctx);
                std::thread::sleep(Duration::from_millis(5));
            }
        };

        pump(&mut app, &|app| app.shared_state.read().runtime.model_status.is_ready());
        app.drawing.push(Stroke::new(vec![Point::new(10, 10), Point::new(60, 40)]).unwrap());
        app.predict();
        assert!(app.shared_state.read().runtime.is_predicting);

        pump(&mut app, &|app| !app.shared_state.read().runtime.is_predicting);

        assert_eq!(app.shared_state.read().runtime.predictions_made, 1);
        let chart = app.chart.as_ref().unwrap();
        assert_eq!(chart.slices[0].label, "line (0.8)");
        assert!(app.preview.is_some());
    }

    #[test]
    fn test_predict_without_worker_reports_error() {
        let mut app = app();
        app.drawing.push(Stroke::new(vec![Point::new(3, 4)]).unwrap());

        app.predict();

        let state = app.shared_state.read();
        assert!(!state.runtime.is_predicting);
        assert!(state.runtime.last_error.is_some());
    }
}
