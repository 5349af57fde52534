//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline stays free of presentation concerns
//! - output changes are localized (important for future snapshot tests)

use crate::app::pipeline::EnrichedPrediction;
use crate::domain::{FieldKind, IndicatorSchema, IndicatorSet, PipelineConfig, PredictionResult};

/// Format inputs + prediction (+ tier when classified).
pub fn format_prediction(
    schema: &IndicatorSchema,
    config: PipelineConfig,
    indicators: &IndicatorSet,
    result: &PredictionResult,
) -> String {
    let mut out = String::new();

    out.push_str("=== co2 - CO₂ Emission Estimate ===\n");
    out.push_str(&format!(
        "Schema: {} (v{}) | scaling: {}\n",
        schema.name,
        schema.version,
        if config.scale_features { "on" } else { "off" },
    ));

    out.push_str("\nInputs:\n");
    for field in &schema.fields {
        let value = indicators.get(&field.name).unwrap_or(f64::NAN);
        let line = format!(
            "  {:<20} {:>14} {}",
            truncate(&field.name, 20),
            fmt_value(value, field.kind),
            field.unit
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.push_str(&format!("\nPredicted CO₂ emission: {:.2} Mt\n", result.value));
    if let Some(tier) = result.tier {
        out.push_str(&format!("Tier: {} ({})\n", tier.label(), tier.description()));
    }

    out
}

/// Format a prediction with its historical context and any warnings.
pub fn format_enriched(
    schema: &IndicatorSchema,
    config: PipelineConfig,
    indicators: &IndicatorSet,
    enriched: &EnrichedPrediction,
) -> String {
    let mut out = format_prediction(schema, config, indicators, &enriched.prediction);

    if let Some(history) = &enriched.history {
        out.push_str(&format!("\nHistory ({}):\n", history.country));
        out.push_str(&format!(
            "- latest recorded: {:.2} Mt ({})\n",
            history.latest.co2, history.latest.year
        ));
        out.push_str(&format!(
            "- prediction vs latest: {:+.2} Mt\n",
            history.delta_from_latest
        ));
        if let Some(same_year) = history.same_year {
            out.push_str(&format!(
                "- recorded for {}: {:.2} Mt\n",
                same_year.year, same_year.co2
            ));
        }
    }

    for warning in &enriched.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }

    out
}

/// Format a schema as a table of fields, ranges and defaults.
pub fn format_schema(schema: &IndicatorSchema) -> String {
    let mut out = String::new();
    out.push_str(&format!("Schema: {} (v{})\n", schema.name, schema.version));

    let header = format!(
        "{:<3} {:<20} {:>12} {:>12} {:>12} {:<10}",
        "#", "field", "min", "max", "default", "unit"
    );
    out.push_str(header.trim_end());
    out.push('\n');
    let rule = format!("{:-<3} {:-<20} {:-<12} {:-<12} {:-<12} {:-<10}", "", "", "", "", "", "");
    out.push_str(&rule);
    out.push('\n');

    for (idx, field) in schema.fields.iter().enumerate() {
        let line = format!(
            "{:<3} {:<20} {:>12} {:>12} {:>12} {:<10}",
            idx,
            truncate(&field.name, 20),
            fmt_value(field.min, field.kind),
            fmt_value(field.max, field.kind),
            fmt_value(field.default, field.kind),
            field.unit,
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_value(v: f64, kind: FieldKind) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    match kind {
        FieldKind::Integer => format!("{v:.0}"),
        FieldKind::Real => format!("{v:.4}"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SchemaVariant, Tier};
    use crate::io::history::{HistoryComparison, HistoryRecord};

    #[test]
    fn prediction_lists_inputs_in_schema_order() {
        let schema = SchemaVariant::Energy.schema();
        let text = format_prediction(
            &schema,
            PipelineConfig::for_variant(SchemaVariant::Energy),
            &schema.defaults(),
            &PredictionResult {
                value: 4200.0,
                tier: Some(Tier::Yellow),
            },
        );
        let gdp = text.find("gdp").unwrap();
        let energy = text.find("energy_consumption").unwrap();
        assert!(gdp < energy);
        assert!(text.contains("scaling: off"));
        assert!(text.contains("Predicted CO₂ emission: 4200.00 Mt"));
        assert!(text.contains("Tier: yellow (moderate emissions)"));
    }

    #[test]
    fn unclassified_prediction_has_no_tier_line() {
        let schema = SchemaVariant::Energy.schema();
        let text = format_prediction(
            &schema,
            PipelineConfig::for_variant(SchemaVariant::Energy),
            &schema.defaults(),
            &PredictionResult {
                value: 1.0,
                tier: None,
            },
        );
        assert!(!text.contains("Tier:"));
    }

    #[test]
    fn enriched_output_includes_history_and_warnings() {
        let schema = SchemaVariant::Emissions.schema();
        let enriched = EnrichedPrediction {
            prediction: PredictionResult {
                value: 2500.0,
                tier: Some(Tier::Green),
            },
            history: Some(HistoryComparison {
                country: "India".to_string(),
                latest: HistoryRecord { year: 2021, co2: 2700.0 },
                delta_from_latest: -200.0,
                same_year: Some(HistoryRecord { year: 2020, co2: 2400.0 }),
            }),
            warnings: vec!["skipped 1 unusable historical rows for India".to_string()],
        };
        let text = format_enriched(
            &schema,
            PipelineConfig::for_variant(SchemaVariant::Emissions),
            &schema.defaults(),
            &enriched,
        );
        assert!(text.contains("prediction vs latest: -200.00 Mt"));
        assert!(text.contains("recorded for 2020: 2400.00 Mt"));
        assert!(text.contains("warning: skipped 1"));
    }

    #[test]
    fn schema_table_prints_integer_fields_without_decimals() {
        let text = format_schema(&SchemaVariant::Emissions.schema());
        let year = text.lines().find(|l| l.contains("year")).unwrap();
        assert!(year.contains("1950"));
        assert!(!year.contains("1950.0"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("energy_consumption", 6), "energ.");
        assert_eq!(truncate("gdp", 6), "gdp");
    }
}
