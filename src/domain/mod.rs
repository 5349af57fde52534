//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - indicator declarations and layouts (`FieldSpec`, `IndicatorSchema`, `SchemaVariant`)
//! - request/response values (`IndicatorSet`, `FeatureVector`, `PredictionResult`, `Tier`)
//! - the artifact feature contract (`FeatureContract`)

pub mod types;

pub use types::*;
