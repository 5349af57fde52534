//! Model and scaler seams.
//!
//! The pipeline only ever sees these two traits. Loaded artifacts implement them,
//! and so do test doubles, which is what keeps the orchestrator independent of
//! artifact formats.

use crate::domain::FeatureVector;
use crate::error::PipelineError;

/// A fitted regression model: feature vector in, one scalar out.
///
/// Implementations must be deterministic and must not mutate shared state, so one
/// instance can serve any number of concurrent callers.
pub trait Regressor: Send + Sync {
    fn expected_feature_count(&self) -> usize;

    fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError>;
}

/// A fitted per-feature transform applied before prediction.
///
/// Output keeps the input's field names and order.
pub trait Transform: Send + Sync {
    fn feature_count(&self) -> usize;

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PipelineError>;
}

/// Reject vectors whose length differs from what `stage` was fitted on.
pub fn check_dimension(stage: &'static str, expected: usize, features: &FeatureVector) -> Result<(), PipelineError> {
    if features.len() != expected {
        return Err(PipelineError::DimensionMismatch {
            stage,
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
