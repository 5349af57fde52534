//! `co2-estimator` library crate.
//!
//! The binary (`co2`) is a thin wrapper around this library so that:
//!
//! - the inference pipeline is testable without spawning processes
//! - any front-end (CLI, UI, service) calls the same `Pipeline::run`
//! - artifact loading stays in one place, shared by every caller

pub mod app;
pub mod classify;
pub mod cli;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod models;
pub mod registry;
pub mod report;

pub use app::pipeline::{EnrichedPrediction, Pipeline};
pub use domain::{IndicatorSchema, IndicatorSet, PredictionResult, Tier};
pub use error::PipelineError;
