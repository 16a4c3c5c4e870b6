//! Shared application state between dashboard and worker

use crate::config::AppConfig;

/// Lifecycle of the classification model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelStatus {
    #[default]
    Loading,
    Ready { classes: usize },
    Failed(String),
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready { .. })
    }
}

/// Central shared state
#[derive(Debug, Clone, Default)]
pub struct SharedAppState {
    /// Application configuration
    pub config: AppConfig,
    /// Runtime state (not persisted)
    pub runtime: RuntimeState,
}

impl SharedAppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            runtime: RuntimeState::default(),
        }
    }
}

/// Runtime state that is not persisted
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    pub model_status: ModelStatus,
    /// A prediction request is in flight
    pub is_predicting: bool,
    /// Number of completed predictions
    pub predictions_made: usize,
    /// Address of the embedded transform server, if running
    pub server_address: Option<String>,
    /// Last error message (if any)
    pub last_error: Option<String>,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_state() {
        let mut runtime = RuntimeState::default();
        assert!(runtime.last_error.is_none());

        runtime.set_error("fetch failed");
        assert_eq!(runtime.last_error.as_deref(), Some("fetch failed"));

        runtime.clear_error();
        assert!(runtime.last_error.is_none());
    }

    #[test]
    fn test_model_status_default_is_loading() {
        let state = SharedAppState::new(AppConfig::default());
        assert_eq!(state.runtime.model_status, ModelStatus::Loading);
        assert!(!state.runtime.model_status.is_ready());
        assert!(ModelStatus::Ready { classes: 10 }.is_ready());
    }
}
