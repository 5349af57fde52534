//! Error types.
//!
//! - `PipelineError`: everything the inference pipeline can report to a caller.
//! - `AppError`: what the `co2` binary turns errors into (message + exit code).

use std::path::PathBuf;

/// Failures of the inference pipeline.
///
/// `ModelLoad` and `Misconfigured` are fatal. The remaining variants are caller errors that a
/// front-end should surface and let the user correct.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("missing indicator '{field}'")]
    MissingField { field: String },

    #[error("indicator '{field}' = {value} is outside [{min}, {max}]")]
    RangeViolation {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("indicator '{field}' = {value} is invalid: {reason}")]
    InvalidValue {
        field: String,
        value: f64,
        reason: String,
    },

    #[error("{stage} expects {expected} features, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to load artifact '{}': {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("pipeline misconfigured: {reason}")]
    Misconfigured { reason: String },
}

impl PipelineError {
    pub fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// `true` when no prediction is possible until the process is reconfigured.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad { .. } | Self::Misconfigured { .. })
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let exit_code = if err.is_fatal() { 4 } else { 3 };
        Self::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
