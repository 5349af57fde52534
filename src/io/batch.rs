//! CSV batch input/output for the `co2 batch` command.
//!
//! Input: one request per row, header = indicator names. Cells that are blank
//! are left out of the row's `IndicatorSet`; unparsable cells are row errors.
//!
//! Output: the input line number, every schema field, then `value`, `tier` and
//! `error` (exactly one of value/error is filled).

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::domain::{IndicatorSchema, IndicatorSet, PredictionResult};
use crate::error::AppError;

/// One parsed input row.
#[derive(Debug, Clone)]
pub struct BatchRow {
    /// 1-based line number in the input file (header is line 1).
    pub line: usize,
    pub indicators: Result<IndicatorSet, String>,
}

pub fn read_batch_csv(path: &Path) -> Result<Vec<BatchRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open batch CSV '{}': {e}", path.display())))?;
    parse_batch(file)
}

pub fn parse_batch<R: Read>(reader: R) -> Result<Vec<BatchRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read batch CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let indicators = match result {
            Ok(record) => parse_record(&headers, &record),
            Err(e) => Err(format!("CSV parse error: {e}")),
        };
        rows.push(BatchRow { line, indicators });
    }
    Ok(rows)
}

fn parse_record(headers: &[String], record: &csv::StringRecord) -> Result<IndicatorSet, String> {
    let mut indicators = IndicatorSet::new();
    for (name, cell) in headers.iter().zip(record.iter()) {
        if cell.is_empty() {
            continue;
        }
        let value = cell
            .parse::<f64>()
            .map_err(|_| format!("column '{name}': '{cell}' is not a number"))?;
        indicators.insert(name, value);
    }
    Ok(indicators)
}

/// Write batch results; `results[i]` belongs to `rows[i]`.
pub fn write_batch_csv<W: Write>(
    writer: W,
    schema: &IndicatorSchema,
    rows: &[BatchRow],
    results: &[Result<PredictionResult, String>],
) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write batch CSV: {e}"));

    let mut header = vec!["line".to_string()];
    header.extend(schema.feature_names());
    header.extend(["value", "tier", "error"].map(String::from));
    out.write_record(&header).map_err(write_err)?;

    for (row, result) in rows.iter().zip(results) {
        let mut record = vec![row.line.to_string()];
        for field in &schema.fields {
            let cell = row
                .indicators
                .as_ref()
                .ok()
                .and_then(|ind| ind.get(&field.name))
                .map(|v| v.to_string())
                .unwrap_or_default();
            record.push(cell);
        }
        match result {
            Ok(prediction) => {
                record.push(format!("{:.4}", prediction.value));
                record.push(prediction.tier.map(|t| t.label().to_string()).unwrap_or_default());
                record.push(String::new());
            }
            Err(message) => {
                record.push(String::new());
                record.push(String::new());
                record.push(message.clone());
            }
        }
        out.write_record(&record).map_err(write_err)?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush batch CSV: {e}")))?;
    Ok(())
}

/// Write to `path`, or stdout when `path` is `None`.
pub fn write_batch_output(
    path: Option<&Path>,
    schema: &IndicatorSchema,
    rows: &[BatchRow],
    results: &[Result<PredictionResult, String>],
) -> Result<(), AppError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(2, format!("Failed to create batch output '{}': {e}", path.display()))
            })?;
            write_batch_csv(file, schema, rows, results)
        }
        None => write_batch_csv(std::io::stdout().lock(), schema, rows, results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SchemaVariant, Tier};

    #[test]
    fn parses_rows_and_reports_bad_cells() {
        let input = "gdp,energy_consumption,population\n15,25000,5\n12,,4\n1,abc,2\n";
        let rows = parse_batch(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].indicators.as_ref().unwrap().get("energy_consumption"), Some(25_000.0));
        assert_eq!(rows[1].indicators.as_ref().unwrap().get("energy_consumption"), None);
        assert!(rows[2].indicators.as_ref().unwrap_err().contains("energy_consumption"));
    }

    #[test]
    fn writes_value_or_error_per_row() {
        let schema = SchemaVariant::Energy.schema();
        let rows = parse_batch("gdp,energy_consumption,population\n15,25000,5\n99,1,1\n".as_bytes()).unwrap();
        let results = vec![
            Ok(PredictionResult {
                value: 4200.0,
                tier: Some(Tier::Yellow),
            }),
            Err("indicator 'gdp' = 99 is outside [0, 30]".to_string()),
        ];
        let mut buf = Vec::new();
        write_batch_csv(&mut buf, &schema, &rows, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "line,gdp,energy_consumption,population,value,tier,error");
        assert_eq!(lines[1], "2,15,25000,5,4200.0000,yellow,");
        assert!(lines[2].starts_with("3,99,1,1,,,"));
    }
}
