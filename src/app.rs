//! Inference worker
//!
//! Owns the classifier on a background thread so model loading and
//! prediction never block the UI. The dashboard talks to it over channels.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::shared::{DashboardToWorker, WorkerToDashboard};
use crate::vision::Classifier;

/// Handle to the background inference thread
pub struct InferenceWorker {
    /// Channel to send requests to the worker
    to_worker: Sender<DashboardToWorker>,
    /// Channel to receive results from the worker
    from_worker: Receiver<WorkerToDashboard>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    /// Start a worker that loads the classifier described by `config`
    pub fn spawn(config: AppConfig) -> Result<Self> {
        Self::spawn_with(move || Classifier::load(&config))
    }

    /// Start a worker with a custom classifier loader
    pub fn spawn_with<F>(load: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Classifier> + Send + 'static,
    {
        let (to_worker, requests) = unbounded();
        let (results, from_worker) = unbounded();

        let handle = std::thread::Builder::new()
            .name("inference".to_string())
            .spawn(move || {
                info!("Inference thread starting...");
                run_worker(load, requests, results);
                info!("Inference thread exiting...");
            })
            .context("Failed to spawn inference thread")?;

        Ok(Self {
            to_worker,
            from_worker,
            handle: Some(handle),
        })
    }

    /// Queue a request. Returns `false` if the worker has stopped.
    pub fn send(&self, message: DashboardToWorker) -> bool {
        self.to_worker.send(message).is_ok()
    }

    /// Next pending result, if any
    pub fn try_recv(&self) -> Option<WorkerToDashboard> {
        match self.from_worker.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocking receive, for headless callers and tests
    pub fn recv(&self) -> Option<WorkerToDashboard> {
        self.from_worker.recv().ok()
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        let _ = self.to_worker.send(DashboardToWorker::Shutdown);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker<F>(load: F, requests: Receiver<DashboardToWorker>, results: Sender<WorkerToDashboard>)
where
    F: FnOnce() -> Result<Classifier>,
{
    let mut classifier = match load() {
        Ok(classifier) => {
            let _ = results.send(WorkerToDashboard::ModelLoaded {
                classes: classifier.labels().len(),
            });
            Some(classifier)
        }
        Err(e) => {
            error!("Failed to load model: {:#}", e);
            let _ = results.send(WorkerToDashboard::ModelFailed(format!("{:#}", e)));
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return;
        }
    };

    for request in requests.iter() {
        match request {
            DashboardToWorker::Predict(drawing) => {
                let reply = match classifier.as_mut() {
                    None => WorkerToDashboard::Error("Model is not loaded".to_string()),
                    Some(classifier) => match runtime.block_on(classifier.predict_drawing(&drawing)) {
                        Ok(result) => WorkerToDashboard::Prediction(result),
                        Err(e) => {
                            error!("Prediction failed: {:#}", e);
                            WorkerToDashboard::Error(format!("{:#}", e))
                        }
                    },
                };
                if results.send(reply).is_err() {
                    break;
                }
            }
            DashboardToWorker::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::{Drawing, Point, Stroke, StrokeNormalizer};
    use crate::vision::{PreprocessConfig, ScoreModel, TransformClient, TransformOptions};
    use ndarray::Array4;

    struct Fixed(Vec<f32>);

    impl ScoreModel for Fixed {
        fn scores(&mut self, _input: Array4<f32>) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn fixed_classifier() -> Result<Classifier> {
        Ok(Classifier::new(
            Box::new(Fixed(vec![0.1, 0.7, 0.2])),
            vec!["a".into(), "b".into(), "c".into()],
            StrokeNormalizer::default(),
            TransformClient::local(TransformOptions::default()),
            PreprocessConfig::default(),
            3,
        ))
    }

    #[test]
    fn test_worker_reports_model_and_predictions() {
        let worker = InferenceWorker::spawn_with(fixed_classifier).unwrap();

        assert!(matches!(worker.recv(), Some(WorkerToDashboard::ModelLoaded { classes: 3 })));

        let drawing = Drawing::from_strokes(vec![Stroke::new(vec![Point::new(5, 5), Point::new(50, 60)]).unwrap()]);
        assert!(worker.send(DashboardToWorker::Predict(drawing)));

        match worker.recv() {
            Some(WorkerToDashboard::Prediction(Some(result))) => {
                assert_eq!(result.predictions[0].class_name, "b");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        assert!(worker.send(DashboardToWorker::Predict(Drawing::new())));
        assert!(matches!(worker.recv(), Some(WorkerToDashboard::Prediction(None))));
    }

    #[test]
    fn test_worker_load_failure() {
        let worker = InferenceWorker::spawn_with(|| anyhow::bail!("model.onnx missing")).unwrap();

        match worker.recv() {
            Some(WorkerToDashboard::ModelFailed(msg)) => assert!(msg.contains("model.onnx missing")),
            other => panic!("unexpected message: {:?}", other),
        }

        worker.send(DashboardToWorker::Predict(Drawing::new()));
        assert!(matches!(worker.recv(), Some(WorkerToDashboard::Error(_))));
    }
}
