//! Feature vector assembly.
//!
//! `build` is the only place where named indicators become positional model
//! input. It never clamps: out-of-range input is an error here, and callers that
//! want slider semantics clamp first via `IndicatorSchema::clamp`.

use crate::domain::{FeatureVector, FieldKind, FieldSpec, IndicatorSchema, IndicatorSet};
use crate::error::PipelineError;

/// Assemble the feature vector for `indicators` in the schema's field order.
///
/// Fails on the first field (in schema order) that is missing, non-finite,
/// non-integral for an integer field, or outside its declared range.
pub fn build(indicators: &IndicatorSet, schema: &IndicatorSchema) -> Result<FeatureVector, PipelineError> {
    let mut values = Vec::with_capacity(schema.len());
    for field in &schema.fields {
        let value = indicators
            .get(&field.name)
            .ok_or_else(|| PipelineError::MissingField {
                field: field.name.clone(),
            })?;
        check_value(field, value)?;
        values.push(value);
    }
    FeatureVector::new(schema.feature_names(), values)
}

fn check_value(field: &FieldSpec, value: f64) -> Result<(), PipelineError> {
    if !value.is_finite() {
        return Err(PipelineError::InvalidValue {
            field: field.name.clone(),
            value,
            reason: "not a finite number".to_string(),
        });
    }
    if field.kind == FieldKind::Integer && value.fract() != 0.0 {
        return Err(PipelineError::InvalidValue {
            field: field.name.clone(),
            value,
            reason: "expected a whole number".to_string(),
        });
    }
    if value < field.min || value > field.max {
        return Err(PipelineError::RangeViolation {
            field: field.name.clone(),
            value,
            min: field.min,
            max: field.max,
        });
    }
    Ok(())
}
