//! Shared prediction pipeline used by every front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! indicators -> feature vector -> (scaled vector) -> prediction -> (tier)
//!
//! Front-ends (the CLI here, a UI elsewhere) collect an `IndicatorSet`, call
//! `run`, and render the `PredictionResult`. Nothing in this module performs I/O
//! except `run_enriched`, whose history lookup is optional by construction.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::domain::{IndicatorSchema, IndicatorSet, PipelineConfig, PredictionResult};
use crate::error::PipelineError;
use crate::features::build;
use crate::io::history::{HistoryComparison, HistorySource};
use crate::models::{Regressor, Transform};
use crate::registry::LoadedArtifacts;

/// A prediction together with optional historical context.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPrediction {
    pub prediction: PredictionResult,
    pub history: Option<HistoryComparison>,
    /// Enrichment problems; never affect `prediction`.
    pub warnings: Vec<String>,
}

/// Composed inference pipeline over shared, read-only artifacts.
#[derive(Clone)]
pub struct Pipeline {
    schema: IndicatorSchema,
    config: PipelineConfig,
    /// Present exactly when `config.scale_features` is set.
    scaler: Option<Arc<dyn Transform>>,
    model: Arc<dyn Regressor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("schema", &self.schema.name)
            .field("config", &self.config)
            .field("features", &self.model.expected_feature_count())
            .finish()
    }
}

impl Pipeline {
    /// Assemble a pipeline, checking stage dimensions against the schema.
    ///
    /// A scaler passed while scaling is disabled is ignored; a missing scaler
    /// while scaling is enabled is an error.
    pub fn new(
        schema: IndicatorSchema,
        config: PipelineConfig,
        model: Arc<dyn Regressor>,
        scaler: Option<Arc<dyn Transform>>,
    ) -> Result<Self, PipelineError> {
        if model.expected_feature_count() != schema.len() {
            return Err(PipelineError::DimensionMismatch {
                stage: "model",
                expected: model.expected_feature_count(),
                actual: schema.len(),
            });
        }

        let scaler = if config.scale_features {
            let scaler = scaler.ok_or_else(|| PipelineError::Misconfigured {
                reason: "feature scaling is enabled but no scaler was provided".to_string(),
            })?;
            if scaler.feature_count() != schema.len() {
                return Err(PipelineError::DimensionMismatch {
                    stage: "scaler",
                    expected: scaler.feature_count(),
                    actual: schema.len(),
                });
            }
            Some(scaler)
        } else {
            if scaler.is_some() {
                debug!("feature scaling disabled; ignoring supplied scaler");
            }
            None
        };

        Ok(Self {
            schema,
            config,
            scaler,
            model,
        })
    }

    /// Build a pipeline over cached artifacts.
    ///
    /// `schema` must have the feature layout the artifacts were checked
    /// against at load time; any other layout is a `ModelLoad` error.
    pub fn from_artifacts(
        schema: IndicatorSchema,
        config: PipelineConfig,
        artifacts: &LoadedArtifacts,
    ) -> Result<Self, PipelineError> {
        artifacts
            .contract
            .verify(&schema)
            .map_err(|reason| PipelineError::model_load(&artifacts.model_path, reason))?;
        let model: Arc<dyn Regressor> = artifacts.model.clone();
        let scaler = artifacts
            .scaler
            .clone()
            .map(|s| s as Arc<dyn Transform>);
        Self::new(schema, config, model, scaler)
    }

    pub fn schema(&self) -> &IndicatorSchema {
        &self.schema
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Run one request through every enabled stage.
    pub fn run(&self, indicators: &IndicatorSet) -> Result<PredictionResult, PipelineError> {
        let features = build(indicators, &self.schema)?;
        debug!(features = ?features.as_slice(), "built feature vector");

        let features = match &self.scaler {
            Some(scaler) => {
                let scaled = scaler.transform(&features)?;
                debug!(features = ?scaled.as_slice(), "scaled feature vector");
                scaled
            }
            None => features,
        };

        let value = self.model.predict(&features)?;
        let tier = self.config.classify.then(|| classify(value));
        debug!(value, ?tier, "prediction complete");

        Ok(PredictionResult { value, tier })
    }

    /// Run many requests in parallel; results keep the input order.
    pub fn run_batch(&self, requests: &[IndicatorSet]) -> Vec<Result<PredictionResult, PipelineError>> {
        requests.par_iter().map(|indicators| self.run(indicators)).collect()
    }

    /// Run the prediction, then try to attach history for `country`.
    ///
    /// Core errors propagate. History errors become warnings.
    pub fn run_enriched(
        &self,
        indicators: &IndicatorSet,
        history: &dyn HistorySource,
        country: &str,
    ) -> Result<EnrichedPrediction, PipelineError> {
        let prediction = self.run(indicators)?;
        let year = indicators
            .get("year")
            .filter(|y| y.fract() == 0.0)
            .map(|y| y as i32);

        let mut warnings = Vec::new();
        let comparison = match history.series(country) {
            Ok(series) => {
                if series.rows_skipped > 0 {
                    warnings.push(format!(
                        "skipped {} unusable historical rows for {}",
                        series.rows_skipped, series.country
                    ));
                }
                series.compare(prediction.value, year)
            }
            Err(err) => {
                warn!(error = %err, country, "historical data unavailable");
                warnings.push(format!("historical data unavailable: {err}"));
                None
            }
        };

        Ok(EnrichedPrediction {
            prediction,
            history: comparison,
            warnings,
        })
    }
}
