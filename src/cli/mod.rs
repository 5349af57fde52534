//! Command-line parsing for the CO₂ emission estimator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Everything here ends up as an `IndicatorSet` plus artifact
//! locations; no prediction semantics live in this module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::SchemaVariant;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "co2", version, about = "CO₂ emission estimator (tree-ensemble regression)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Predict emissions for one set of indicators.
    ///
    /// Indicators not given with `--set` take the schema's default value.
    Predict(PredictArgs),
    /// Predict one row per record of a CSV file (header = indicator names).
    Batch(BatchArgs),
    /// Print the indicator schema: field order, ranges and defaults.
    Schema(SchemaArgs),
}

/// Whether to run the scaler stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scaling {
    /// Built-in variants use their own default; custom schemas scale when a
    /// scaler artifact is configured.
    Auto,
    On,
    Off,
}

/// Which indicator schema to use.
#[derive(Debug, Args, Clone)]
pub struct SchemaSelection {
    /// Built-in indicator layout.
    #[arg(long, value_enum, default_value_t = SchemaVariant::Emissions)]
    pub variant: SchemaVariant,

    /// Custom schema JSON (overrides --variant).
    #[arg(long, value_name = "JSON")]
    pub schema: Option<PathBuf>,
}

/// Artifact and stage options shared by `predict` and `batch`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    #[command(flatten)]
    pub selection: SchemaSelection,

    /// Model artifact (default: $CO2_MODEL_PATH, else random_forest_model.json).
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Scaler artifact (default: $CO2_SCALER_PATH, else scaler.json).
    #[arg(long, value_name = "JSON")]
    pub scaler: Option<PathBuf>,

    /// Run the scaler stage.
    #[arg(long, value_enum, default_value_t = Scaling::Auto)]
    pub scaling: Scaling,

    /// Report the raw value only, without a tier.
    #[arg(long)]
    pub no_classify: bool,

    /// Clamp out-of-range indicators into range instead of rejecting them.
    #[arg(long)]
    pub clamp: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Indicator value, e.g. `--set gdp=15.0` (repeatable).
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, f64)>,

    /// Historical emissions CSV (default: $CO2_HISTORY_PATH). Optional; failures only warn.
    #[arg(long, value_name = "CSV")]
    pub history: Option<PathBuf>,

    /// Country to compare against in the history file.
    #[arg(long, default_value = "World")]
    pub country: String,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Input CSV with one request per row.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Output CSV (default: stdout).
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub selection: SchemaSelection,
}

/// Parse `name=value` into an indicator assignment.
pub fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing indicator name in '{raw}'"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}
