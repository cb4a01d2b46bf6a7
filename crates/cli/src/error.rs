//! Error types for pipeline operations.

use std::path::PathBuf;

use contracts::ContractError;
use event_hub::HubError;
use sensor_sim::SimError;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Simulated device setup or update failed
    #[error("Sensor error: {0}")]
    Sensor(#[from] SimError),

    /// A native collaborator call failed
    #[error("Native error: {0}")]
    Contract(#[from] ContractError),

    /// Subscribing to or leaving a native notification source failed
    #[error("Event hub error: {0}")]
    Hub(#[from] HubError),

    /// A renderer could not write its output
    #[error("Renderer '{renderer}' failed: {message}")]
    Render { renderer: String, message: String },

    /// A pipeline task panicked or was aborted
    #[error("Pipeline task '{task}' failed: {message}")]
    Task { task: &'static str, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn render(renderer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            renderer: renderer.into(),
            message: message.into(),
        }
    }

    pub fn task(task: &'static str, message: impl Into<String>) -> Self {
        Self::Task {
            task,
            message: message.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
