//! Read model and scaler artifacts.
//!
//! Artifacts are JSON documents. Besides their parameters, each one records the
//! feature contract (schema version + feature names in training order) it was
//! fitted under; loading fails unless that contract matches the configured
//! schema exactly. A positional mismatch would otherwise produce plausible but
//! wrong predictions with no error anywhere.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{FeatureContract, IndicatorSchema};
use crate::error::PipelineError;
use crate::models::{AffineScaler, Aggregation, ScalingParams, Tree, TreeEnsemble};

pub const MODEL_FORMAT: &str = "co2-tree-ensemble";
pub const SCALER_FORMAT: &str = "co2-scaler";
pub const FORMAT_VERSION: u32 = 1;

/// On-disk model document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub format: String,
    pub format_version: u32,
    pub contract: FeatureContract,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Added to the aggregated tree output under both aggregations.
    #[serde(default)]
    pub base_score: f64,
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

/// On-disk scaler document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerFile {
    pub format: String,
    pub format_version: u32,
    pub contract: FeatureContract,
    #[serde(flatten)]
    pub params: ScalingParams,
}

/// Load a model artifact and check it against `schema`.
pub fn read_model_json(path: &Path, schema: &IndicatorSchema) -> Result<TreeEnsemble, PipelineError> {
    let json = read_to_string(path)?;
    let model = model_from_str(&json, schema).map_err(|e| PipelineError::model_load(path, e))?;
    info!(
        path = %path.display(),
        trees = model.tree_count(),
        aggregation = ?model.aggregation(),
        "loaded regression model"
    );
    Ok(model)
}

/// Load a scaler artifact and check it against `schema`.
pub fn read_scaler_json(path: &Path, schema: &IndicatorSchema) -> Result<AffineScaler, PipelineError> {
    let json = read_to_string(path)?;
    let scaler = scaler_from_str(&json, schema).map_err(|e| PipelineError::model_load(path, e))?;
    info!(path = %path.display(), "loaded feature scaler");
    Ok(scaler)
}

pub fn model_from_str(json: &str, schema: &IndicatorSchema) -> Result<TreeEnsemble, String> {
    let file: ModelFile = serde_json::from_str(json).map_err(|e| format!("invalid model JSON: {e}"))?;
    check_header(&file.format, file.format_version, MODEL_FORMAT)?;
    file.contract.verify(schema)?;
    if file.n_features != file.contract.features.len() {
        return Err(format!(
            "n_features = {} but the contract lists {} features",
            file.n_features,
            file.contract.features.len()
        ));
    }
    TreeEnsemble::new(file.aggregation, file.base_score, file.n_features, file.trees)
}

pub fn scaler_from_str(json: &str, schema: &IndicatorSchema) -> Result<AffineScaler, String> {
    let file: ScalerFile = serde_json::from_str(json).map_err(|e| format!("invalid scaler JSON: {e}"))?;
    check_header(&file.format, file.format_version, SCALER_FORMAT)?;
    file.contract.verify(schema)?;
    let param_len = match &file.params {
        ScalingParams::Standard { mean, .. } => mean.len(),
        ScalingParams::MinMax { data_min, .. } => data_min.len(),
    };
    if param_len != file.contract.features.len() {
        return Err(format!(
            "scaler has {param_len} parameters but the contract lists {} features",
            file.contract.features.len()
        ));
    }
    AffineScaler::new(&file.params)
}

fn read_to_string(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|e| PipelineError::model_load(path, e.to_string()))
}

fn check_header(format: &str, version: u32, expected: &str) -> Result<(), String> {
    if format != expected {
        return Err(format!("expected format '{expected}', found '{format}'"));
    }
    if version != FORMAT_VERSION {
        return Err(format!(
            "unsupported format_version {version} (supported: {FORMAT_VERSION})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, SchemaVariant};
    use crate::models::{Regressor, Transform};

    const ENERGY_MODEL: &str = r#"{
        "format": "co2-tree-ensemble",
        "format_version": 1,
        "contract": {"schema_version": 1, "features": ["gdp", "energy_consumption", "population"]},
        "aggregation": "mean",
        "n_features": 3,
        "trees": [
            {"nodes": [
                {"split": {"feature": 1, "threshold": 20000.0, "left": 1, "right": 2}},
                {"leaf": {"value": 1500.0}},
                {"leaf": {"value": 4200.0}}
            ]}
        ]
    }"#;

    #[test]
    fn loads_matching_model() {
        let schema = SchemaVariant::Energy.schema();
        let model = model_from_str(ENERGY_MODEL, &schema).unwrap();
        assert_eq!(model.expected_feature_count(), 3);
        let x = FeatureVector::new(schema.feature_names(), vec![15.0, 25_000.0, 5.0]).unwrap();
        assert_eq!(model.predict(&x).unwrap(), 4200.0);
    }

    #[test]
    fn rejects_model_for_other_schema() {
        let schema = SchemaVariant::Emissions.schema();
        let err = model_from_str(ENERGY_MODEL, &schema).unwrap_err();
        assert!(err.contains("expects 3 features"), "{err}");
    }

    #[test]
    fn rejects_wrong_format_tag() {
        let schema = SchemaVariant::Energy.schema();
        let json = ENERGY_MODEL.replace("co2-tree-ensemble", "pickle");
        let err = model_from_str(&json, &schema).unwrap_err();
        assert!(err.contains("expected format"), "{err}");
    }

    #[test]
    fn rejects_corrupt_json() {
        let schema = SchemaVariant::Energy.schema();
        assert!(model_from_str("{\"format\": ", &schema).is_err());
    }

    #[test]
    fn missing_file_is_a_model_load_error() {
        let schema = SchemaVariant::Energy.schema();
        let err = read_model_json(Path::new("/nonexistent/co2/model.json"), &schema).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn loads_standard_scaler() {
        let schema = SchemaVariant::Energy.schema();
        let json = r#"{
            "format": "co2-scaler",
            "format_version": 1,
            "contract": {"schema_version": 1, "features": ["gdp", "energy_consumption", "population"]},
            "kind": "standard",
            "mean": [15.0, 25000.0, 5.0],
            "scale": [5.0, 10000.0, 2.0]
        }"#;
        let scaler = scaler_from_str(json, &schema).unwrap();
        let x = FeatureVector::new(schema.feature_names(), vec![20.0, 15_000.0, 5.0]).unwrap();
        assert_eq!(scaler.transform(&x).unwrap().as_slice(), &[1.0, -1.0, 0.0]);
    }

    #[test]
    fn rejects_scaler_with_short_parameters() {
        let schema = SchemaVariant::Energy.schema();
        let json = r#"{
            "format": "co2-scaler",
            "format_version": 1,
            "contract": {"schema_version": 1, "features": ["gdp", "energy_consumption", "population"]},
            "kind": "standard",
            "mean": [15.0, 25000.0],
            "scale": [5.0, 10000.0]
        }"#;
        let err = scaler_from_str(json, &schema).unwrap_err();
        assert!(err.contains("2 parameters"), "{err}");
    }
}
