//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the schema and artifact locations (flags, then `.env`/environment)
//! - loads artifacts once, before reading any request
//! - runs the pipeline and prints results

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::cli::{BatchArgs, Command, ModelArgs, PredictArgs, Scaling, SchemaArgs, SchemaSelection};
use crate::domain::{IndicatorSchema, IndicatorSet, PipelineConfig};
use crate::error::AppError;
use crate::io::history::CsvHistory;
use crate::registry::ArtifactPaths;

pub mod pipeline;

pub use pipeline::{EnrichedPrediction, Pipeline};

const DEFAULT_MODEL_PATH: &str = "random_forest_model.json";
const DEFAULT_SCALER_PATH: &str = "scaler.json";

/// Entry point for the `co2` binary.
pub fn run() -> Result<(), AppError> {
    // `co2` on its own should behave like `co2 predict` with every indicator at
    // its default, the same starting point a form-based front-end shows.
    let argv = rewrite_args(std::env::args().collect());
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Predict(args) => handle_predict(args),
        Command::Batch(args) => handle_batch(args),
        Command::Schema(args) => handle_schema(args),
    }
}

/// Everything resolved from flags and environment before any request is read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub schema: IndicatorSchema,
    pub config: PipelineConfig,
    pub paths: ArtifactPaths,
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let settings = resolve_settings(&args.model, env_path)?;
    let pipeline = load_pipeline(&settings)?;

    let mut indicators = settings.schema.defaults();
    apply_assignments(&settings.schema, &mut indicators, &args.set)?;
    if args.model.clamp {
        indicators = settings.schema.clamp(&indicators);
    }

    let history = args.history.clone().or_else(|| env_path("CO2_HISTORY_PATH"));
    let text = match history {
        Some(path) => {
            let source = CsvHistory::new(path);
            let enriched = pipeline.run_enriched(&indicators, &source, &args.country)?;
            crate::report::format_enriched(&settings.schema, settings.config, &indicators, &enriched)
        }
        None => {
            let result = pipeline.run(&indicators)?;
            crate::report::format_prediction(&settings.schema, settings.config, &indicators, &result)
        }
    };
    print!("{text}");
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let settings = resolve_settings(&args.model, env_path)?;
    let pipeline = load_pipeline(&settings)?;

    let rows = crate::io::batch::read_batch_csv(&args.input)?;
    let defaults = settings.schema.defaults();

    // Rows that failed to parse keep their slot so output lines up with input.
    let requests: Vec<IndicatorSet> = rows
        .iter()
        .map(|row| match &row.indicators {
            Ok(ind) => {
                let merged = merge(&defaults, ind);
                if args.model.clamp {
                    settings.schema.clamp(&merged)
                } else {
                    merged
                }
            }
            Err(_) => IndicatorSet::new(),
        })
        .collect();

    let predictions = pipeline.run_batch(&requests);
    let results: Vec<_> = rows
        .iter()
        .zip(predictions)
        .map(|(row, prediction)| match &row.indicators {
            Ok(_) => prediction.map_err(|e| e.to_string()),
            Err(message) => Err(message.clone()),
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(rows = rows.len(), failed, "batch complete");

    crate::io::batch::write_batch_output(args.output.as_deref(), &settings.schema, &rows, &results)
}

fn handle_schema(args: SchemaArgs) -> Result<(), AppError> {
    let schema = resolve_schema(&args.selection)?;
    print!("{}", crate::report::format_schema(&schema));
    Ok(())
}

/// Load (or reuse) artifacts and assemble the pipeline. Failures here are fatal.
fn load_pipeline(settings: &Settings) -> Result<Pipeline, AppError> {
    let artifacts = crate::registry::global().get_or_load(&settings.paths, &settings.schema)?;
    Ok(Pipeline::from_artifacts(
        settings.schema.clone(),
        settings.config,
        &artifacts,
    )?)
}

fn resolve_schema(selection: &SchemaSelection) -> Result<IndicatorSchema, AppError> {
    match &selection.schema {
        Some(path) => crate::io::schema::read_schema_json(path),
        None => Ok(selection.variant.schema()),
    }
}

/// Resolve schema, stage switches and artifact paths.
///
/// Precedence for paths: explicit flag, then `env` (the process environment,
/// with `.env` already loaded), then the built-in default file name.
pub fn resolve_settings(
    args: &ModelArgs,
    env: impl Fn(&str) -> Option<PathBuf>,
) -> Result<Settings, AppError> {
    let schema = resolve_schema(&args.selection)?;

    let model = args
        .model
        .clone()
        .or_else(|| env("CO2_MODEL_PATH"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
    let configured_scaler = args.scaler.clone().or_else(|| env("CO2_SCALER_PATH"));

    let scale_features = match args.scaling {
        Scaling::On => true,
        Scaling::Off => false,
        Scaling::Auto if args.selection.schema.is_some() => configured_scaler.is_some(),
        Scaling::Auto => args.selection.variant.scales_features(),
    };
    let scaler = scale_features
        .then(|| configured_scaler.unwrap_or_else(|| PathBuf::from(DEFAULT_SCALER_PATH)));

    Ok(Settings {
        schema,
        config: PipelineConfig {
            scale_features,
            classify: !args.no_classify,
        },
        paths: ArtifactPaths { model, scaler },
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Apply `--set` assignments, rejecting names the schema does not declare.
fn apply_assignments(
    schema: &IndicatorSchema,
    indicators: &mut IndicatorSet,
    assignments: &[(String, f64)],
) -> Result<(), AppError> {
    for (name, value) in assignments {
        if schema.field(name).is_none() {
            return Err(AppError::new(
                2,
                format!(
                    "Unknown indicator '{name}' for schema '{}'. Known: {}",
                    schema.name,
                    schema.feature_names().join(", ")
                ),
            ));
        }
        indicators.insert(name, *value);
    }
    Ok(())
}

fn merge(base: &IndicatorSet, overrides: &IndicatorSet) -> IndicatorSet {
    let mut out = base.clone();
    for (name, value) in overrides.iter() {
        out.insert(name, value);
    }
    out
}

/// Rewrite argv so `co2` defaults to `co2 predict`.
///
/// Rules:
/// - `co2`                      -> `co2 predict`
/// - `co2 --set gdp=12 ...`     -> `co2 predict --set gdp=12 ...`
/// - `co2 --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("predict".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "predict" | "batch" | "schema");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "predict".to_string());
        return argv;
    }

    argv
}
