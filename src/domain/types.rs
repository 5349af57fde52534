//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built by any front-end (CLI flags, CSV rows, a UI form)
//! - loaded from JSON (custom schemas)
//! - checked against the feature contract stored in each artifact

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Whether an indicator accepts any real value or only whole numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Real,
    Integer,
}

/// One declared indicator: name, unit, valid range and default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn real(name: &str, unit: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            min,
            max,
            default,
            kind: FieldKind::Real,
        }
    }

    pub fn integer(name: &str, unit: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::real(name, unit, min, max, default)
        }
    }

    /// Clamp `value` into `[min, max]`, rounding integer fields.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = match self.kind {
            FieldKind::Real => value,
            FieldKind::Integer => value.round(),
        };
        value.clamp(self.min, self.max)
    }
}

/// Ordered list of indicators a model was trained on.
///
/// Field order is the training order. `version` is bumped whenever fields are
/// added, removed, renamed or reordered, and must agree with the
/// `FeatureContract` stored in every artifact used with this schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSchema {
    pub name: String,
    pub version: u32,
    pub fields: Vec<FieldSpec>,
}

impl IndicatorSchema {
    /// Parse and validate a schema from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let schema: Self = serde_json::from_str(json).map_err(|e| format!("invalid schema JSON: {e}"))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check structural sanity: non-empty, unique names, consistent ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err(format!("schema '{}' declares no fields", self.name));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(format!("schema '{}' has a field with an empty name", self.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("schema '{}' declares '{}' twice", self.name, field.name));
            }
            if !(field.min.is_finite() && field.max.is_finite() && field.min <= field.max) {
                return Err(format!(
                    "field '{}' has an invalid range [{}, {}]",
                    field.name, field.min, field.max
                ));
            }
            if field.kind == FieldKind::Integer {
                let fractional = [("min", field.min), ("max", field.max), ("default", field.default)]
                    .into_iter()
                    .find(|(_, v)| v.fract() != 0.0);
                if let Some((which, value)) = fractional {
                    return Err(format!(
                        "integer field '{}' has a non-integral {which} {value}",
                        field.name
                    ));
                }
            }
            if !(field.min..=field.max).contains(&field.default) {
                return Err(format!(
                    "field '{}' default {} is outside [{}, {}]",
                    field.name, field.default, field.min, field.max
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in training order.
    pub fn feature_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// The contract an artifact trained on this schema must carry.
    pub fn contract(&self) -> FeatureContract {
        FeatureContract {
            schema_version: self.version,
            features: self.feature_names(),
        }
    }

    /// Every field at its declared default (the initial slider position).
    pub fn defaults(&self) -> IndicatorSet {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default))
            .collect()
    }

    /// Clamp every declared field into range.
    ///
    /// Meant for UI-style callers whose inputs cannot violate bounds anyway.
    /// Undeclared indicators are passed through untouched.
    pub fn clamp(&self, indicators: &IndicatorSet) -> IndicatorSet {
        let mut out = indicators.clone();
        for field in &self.fields {
            if let Some(value) = indicators.get(&field.name) {
                if value.is_finite() {
                    out.insert(&field.name, field.clamp(value));
                }
            }
        }
        out
    }
}

/// Built-in indicator layouts.
///
/// Two distinct layouts are in use by deployed models and neither is more
/// authoritative than the other; anything else goes through a JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// coal_co2, oil_co2, gdp, population, year (scaled).
    Emissions,
    /// gdp, energy_consumption, population (unscaled).
    Energy,
}

impl SchemaVariant {
    pub fn schema(self) -> IndicatorSchema {
        match self {
            SchemaVariant::Emissions => IndicatorSchema {
                name: "emissions".to_string(),
                version: 1,
                fields: vec![
                    FieldSpec::real("coal_co2", "Mt", 0.0, 20_000.0, 10_000.0),
                    FieldSpec::real("oil_co2", "Mt", 0.0, 20_000.0, 10_000.0),
                    FieldSpec::real("gdp", "trillions", 0.0, 30.0, 15.0),
                    FieldSpec::real("population", "billions", 0.0, 10.0, 5.0),
                    FieldSpec::integer("year", "", 1950.0, 2025.0, 2020.0),
                ],
            },
            SchemaVariant::Energy => IndicatorSchema {
                name: "energy".to_string(),
                version: 1,
                fields: vec![
                    FieldSpec::real("gdp", "trillions", 0.0, 30.0, 15.0),
                    FieldSpec::real("energy_consumption", "TWh", 0.0, 50_000.0, 25_000.0),
                    FieldSpec::real("population", "billions", 0.0, 10.0, 5.0),
                ],
            },
        }
    }

    /// Whether models trained on this layout expect standardized inputs.
    pub fn scales_features(self) -> bool {
        match self {
            SchemaVariant::Emissions => true,
            SchemaVariant::Energy => false,
        }
    }
}

/// Named raw indicator values for one prediction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet(BTreeMap<String, f64>);

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for IndicatorSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Feature names and schema version an artifact was trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureContract {
    pub schema_version: u32,
    pub features: Vec<String>,
}

impl FeatureContract {
    /// Compare against the configured schema; returns a description of the first difference.
    pub fn verify(&self, schema: &IndicatorSchema) -> Result<(), String> {
        if self.schema_version != schema.version {
            return Err(format!(
                "artifact was trained on schema version {}, configured schema '{}' is version {}",
                self.schema_version, schema.name, schema.version
            ));
        }
        let expected = schema.feature_names();
        if self.features.len() != expected.len() {
            return Err(format!(
                "artifact expects {} features {:?}, schema '{}' declares {} {:?}",
                self.features.len(),
                self.features,
                schema.name,
                expected.len(),
                expected
            ));
        }
        for (idx, (got, want)) in self.features.iter().zip(&expected).enumerate() {
            if got != want {
                return Err(format!(
                    "feature order differs at position {idx}: artifact has '{got}', schema '{}' has '{want}'",
                    schema.name
                ));
            }
        }
        Ok(())
    }
}

/// Ordered model input, one value per schema field in training order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: DVector<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self, PipelineError> {
        if names.len() != values.len() {
            return Err(PipelineError::DimensionMismatch {
                stage: "feature vector",
                expected: names.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            names: names.into(),
            values: DVector::from_vec(values),
        })
    }

    /// Same field names, new values (used by transforms).
    pub fn with_values(&self, values: DVector<f64>) -> Result<Self, PipelineError> {
        if values.len() != self.names.len() {
            return Err(PipelineError::DimensionMismatch {
                stage: "feature vector",
                expected: self.names.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            names: Arc::clone(&self.names),
            values,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Severity tier of a predicted emission value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
        }
    }

    /// One-line description for terminal output.
    pub fn description(self) -> &'static str {
        match self {
            Tier::Green => "low emissions",
            Tier::Yellow => "moderate emissions",
            Tier::Red => "high emissions",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted emissions in megatonnes of CO₂.
    pub value: f64,
    /// `None` only when classification is disabled.
    pub tier: Option<Tier>,
}

/// Stage switches for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Run the scaler between the builder and the model.
    pub scale_features: bool,
    /// Attach a tier to each prediction.
    pub classify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale_features: true,
            classify: true,
        }
    }
}

impl PipelineConfig {
    pub fn for_variant(variant: SchemaVariant) -> Self {
        Self {
            scale_features: variant.scales_features(),
            classify: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schemas_are_valid() {
        for variant in [SchemaVariant::Emissions, SchemaVariant::Energy] {
            variant.schema().validate().unwrap();
        }
    }

    #[test]
    fn emissions_order_is_fixed() {
        let names = SchemaVariant::Emissions.schema().feature_names();
        assert_eq!(names, ["coal_co2", "oil_co2", "gdp", "population", "year"]);
    }

    #[test]
    fn schema_json_rejects_duplicate_fields() {
        let json = r#"{
            "name": "dup", "version": 1,
            "fields": [
                {"name": "gdp", "min": 0, "max": 30, "default": 15},
                {"name": "gdp", "min": 0, "max": 30, "default": 15}
            ]
        }"#;
        let err = IndicatorSchema::from_json_str(json).unwrap_err();
        assert!(err.contains("twice"), "{err}");
    }

    #[test]
    fn schema_json_rejects_default_out_of_range() {
        let json = r#"{
            "name": "bad", "version": 1,
            "fields": [{"name": "population", "min": 0, "max": 1.5, "default": 5}]
        }"#;
        assert!(IndicatorSchema::from_json_str(json).is_err());
    }

    #[test]
    fn schema_json_rejects_fractional_integer_bounds() {
        let json = r#"{
            "name": "years", "version": 1,
            "fields": [{"name": "year", "kind": "integer", "min": 1950.5, "max": 2025, "default": 2000}]
        }"#;
        let err = IndicatorSchema::from_json_str(json).unwrap_err();
        assert!(err.contains("non-integral min"), "{err}");

        let json = r#"{
            "name": "years", "version": 1,
            "fields": [{"name": "year", "kind": "integer", "min": 1950, "max": 2025, "default": 2020.5}]
        }"#;
        let err = IndicatorSchema::from_json_str(json).unwrap_err();
        assert!(err.contains("non-integral default"), "{err}");
    }

    #[test]
    fn schema_json_defaults_kind_to_real() {
        let json = r#"{
            "name": "small", "version": 3,
            "fields": [{"name": "population", "unit": "billions", "min": 0, "max": 1.5, "default": 1}]
        }"#;
        let schema = IndicatorSchema::from_json_str(json).unwrap();
        assert_eq!(schema.fields[0].kind, FieldKind::Real);
        assert_eq!(schema.version, 3);
    }

    #[test]
    fn clamp_pulls_values_into_range_and_rounds_integers() {
        let schema = SchemaVariant::Emissions.schema();
        let raw = schema
            .defaults()
            .with("gdp", 45.0)
            .with("population", -1.0)
            .with("year", 1999.6)
            .with("extra", 7.0);
        let clamped = schema.clamp(&raw);
        assert_eq!(clamped.get("gdp"), Some(30.0));
        assert_eq!(clamped.get("population"), Some(0.0));
        assert_eq!(clamped.get("year"), Some(2000.0));
        assert_eq!(clamped.get("extra"), Some(7.0));
    }

    #[test]
    fn contract_detects_reordering() {
        let schema = SchemaVariant::Energy.schema();
        let contract = FeatureContract {
            schema_version: 1,
            features: vec![
                "energy_consumption".to_string(),
                "gdp".to_string(),
                "population".to_string(),
            ],
        };
        let err = contract.verify(&schema).unwrap_err();
        assert!(err.contains("position 0"), "{err}");
        assert!(schema.contract().verify(&schema).is_ok());
    }

    #[test]
    fn contract_detects_version_bump() {
        let schema = SchemaVariant::Energy.schema();
        let mut contract = schema.contract();
        contract.schema_version = 2;
        assert!(contract.verify(&schema).is_err());
    }

    #[test]
    fn feature_vector_rejects_length_mismatch() {
        let err = FeatureVector::new(vec!["a".to_string()], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch { expected: 1, actual: 2, .. }
        ));
    }
}
