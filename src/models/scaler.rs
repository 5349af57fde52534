//! Fitted per-feature affine scaling.
//!
//! Two parameterisations are supported:
//!
//! - `standard`: `(x - mean) / scale`
//! - `min_max`: `(x - data_min) / (data_max - data_min) * (hi - lo) + lo`
//!
//! A zero scale or zero data range is replaced by 1 so constant features pass
//! through centred instead of dividing by zero.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::FeatureVector;
use crate::error::PipelineError;
use crate::models::model::{Transform, check_dimension};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalingParams {
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "unit_range")]
        feature_range: (f64, f64),
    },
}

fn unit_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Validated scaler: `((x - offset) ./ divisor) * span + shift`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineScaler {
    offset: DVector<f64>,
    divisor: DVector<f64>,
    span: f64,
    shift: f64,
}

impl AffineScaler {
    pub fn new(params: &ScalingParams) -> Result<Self, String> {
        match params {
            ScalingParams::Standard { mean, scale } => {
                check_params("mean", mean, "scale", scale)?;
                Ok(Self {
                    offset: DVector::from_column_slice(mean),
                    divisor: non_zero(DVector::from_column_slice(scale)),
                    span: 1.0,
                    shift: 0.0,
                })
            }
            ScalingParams::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                check_params("data_min", data_min, "data_max", data_max)?;
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(format!("invalid feature_range ({lo}, {hi})"));
                }
                let min = DVector::from_column_slice(data_min);
                let range = DVector::from_column_slice(data_max) - &min;
                Ok(Self {
                    offset: min,
                    divisor: non_zero(range),
                    span: hi - lo,
                    shift: *lo,
                })
            }
        }
    }
}

fn check_params(a_name: &str, a: &[f64], b_name: &str, b: &[f64]) -> Result<(), String> {
    if a.is_empty() {
        return Err(format!("{a_name} is empty"));
    }
    if a.len() != b.len() {
        return Err(format!(
            "{a_name} has {} entries but {b_name} has {}",
            a.len(),
            b.len()
        ));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(format!("{a_name}/{b_name} contain non-finite values"));
    }
    Ok(())
}

fn non_zero(mut v: DVector<f64>) -> DVector<f64> {
    for x in v.iter_mut() {
        if *x == 0.0 {
            *x = 1.0;
        }
    }
    v
}

impl Transform for AffineScaler {
    fn feature_count(&self) -> usize {
        self.offset.len()
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PipelineError> {
        check_dimension("scaler", self.offset.len(), features)?;
        let scaled = (features.values() - &self.offset)
            .component_div(&self.divisor)
            .map(|v| v * self.span + self.shift);
        features.with_values(scaled)
    }
}
