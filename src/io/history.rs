//! Historical emissions (optional enrichment).
//!
//! History is context for a prediction, never a prerequisite: every failure here
//! is a `HistoryError`, which the pipeline downgrades to a warning.
//!
//! Expected CSV layout: a header with at least `country`, `year` and `co2`
//! columns (any order, extra columns ignored). Rows with a blank or unparsable
//! `co2`/`year` are skipped and counted.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to open history file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read history CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("history CSV has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("no usable history rows for '{0}'")]
    NoRows(String),
}

/// Emissions observed for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub year: i32,
    pub co2: f64,
}

/// One country's records, sorted by year.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    pub country: String,
    pub records: Vec<HistoryRecord>,
    pub rows_skipped: usize,
}

impl HistorySeries {
    pub fn latest(&self) -> Option<HistoryRecord> {
        self.records.last().copied()
    }

    pub fn at_year(&self, year: i32) -> Option<HistoryRecord> {
        self.records
            .binary_search_by_key(&year, |r| r.year)
            .ok()
            .map(|idx| self.records[idx])
    }

    /// Compare a prediction with the most recent observation and, when
    /// `year` is given, the observation for that year.
    pub fn compare(&self, predicted: f64, year: Option<i32>) -> Option<HistoryComparison> {
        let latest = self.latest()?;
        Some(HistoryComparison {
            country: self.country.clone(),
            latest,
            delta_from_latest: predicted - latest.co2,
            same_year: year.and_then(|y| self.at_year(y)),
        })
    }
}

/// Prediction placed next to recorded history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryComparison {
    pub country: String,
    pub latest: HistoryRecord,
    pub delta_from_latest: f64,
    pub same_year: Option<HistoryRecord>,
}

/// Anything that can provide a country's history.
pub trait HistorySource: Send + Sync {
    fn series(&self, country: &str) -> Result<HistorySeries, HistoryError>;
}

/// History backed by a CSV file, read on each request.
#[derive(Debug, Clone)]
pub struct CsvHistory {
    path: PathBuf,
}

impl CsvHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistorySource for CsvHistory {
    fn series(&self, country: &str) -> Result<HistorySeries, HistoryError> {
        let file = File::open(&self.path).map_err(|source| HistoryError::Open {
            path: self.path.clone(),
            source,
        })?;
        parse_history(file, country)
    }
}

/// Parse history CSV and keep the rows for `country` (case-insensitive).
pub fn parse_history<R: Read>(reader: R, country: &str) -> Result<HistorySeries, HistoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);
    let column = |name: &'static str| header_map.get(name).copied().ok_or(HistoryError::MissingColumn(name));
    let country_col = column("country")?;
    let year_col = column("year")?;
    let co2_col = column("co2")?;

    let wanted = country.trim().to_lowercase();
    let mut records = Vec::new();
    let mut rows_skipped = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                rows_skipped += 1;
                continue;
            }
        };
        let matches_country = record
            .get(country_col)
            .is_some_and(|c| c.to_lowercase() == wanted);
        if !matches_country {
            continue;
        }
        let year = record.get(year_col).and_then(|v| v.parse::<i32>().ok());
        let co2 = record
            .get(co2_col)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        match (year, co2) {
            (Some(year), Some(co2)) => records.push(HistoryRecord { year, co2 }),
            _ => rows_skipped += 1,
        }
    }

    if records.is_empty() {
        return Err(HistoryError::NoRows(country.to_string()));
    }
    records.sort_by_key(|r| r.year);
    records.dedup_by_key(|r| r.year);

    Ok(HistorySeries {
        country: country.trim().to_string(),
        records,
        rows_skipped,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}country,year,co2,population\n\
        World,2019,37000.5,7.7\n\
        India,2019,2600.0,1.38\n\
        India,2021,2700.0,1.40\n\
        india,2020,,1.39\n\
        India,2018,2500.0,1.36\n";

    #[test]
    fn keeps_only_requested_country_sorted_by_year() {
        let series = parse_history(CSV.as_bytes(), "India").unwrap();
        let years: Vec<i32> = series.records.iter().map(|r| r.year).collect();
        assert_eq!(years, [2018, 2019, 2021]);
        assert_eq!(series.rows_skipped, 1);
    }

    #[test]
    fn country_match_ignores_case() {
        let series = parse_history(CSV.as_bytes(), " WORLD ").unwrap();
        assert_eq!(series.latest().unwrap().co2, 37000.5);
    }

    #[test]
    fn comparison_reports_delta_and_same_year() {
        let series = parse_history(CSV.as_bytes(), "India").unwrap();
        let cmp = series.compare(3000.0, Some(2019)).unwrap();
        assert_eq!(cmp.latest.year, 2021);
        assert_eq!(cmp.delta_from_latest, 300.0);
        assert_eq!(cmp.same_year.unwrap().co2, 2600.0);
        assert!(series.compare(3000.0, Some(1960)).unwrap().same_year.is_none());
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_history("country,year\nIndia,2020\n".as_bytes(), "India").unwrap_err();
        assert!(matches!(err, HistoryError::MissingColumn("co2")));
    }

    #[test]
    fn unknown_country_has_no_rows() {
        let err = parse_history(CSV.as_bytes(), "Atlantis").unwrap_err();
        assert!(matches!(err, HistoryError::NoRows(_)));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = CsvHistory::new("/nonexistent/history.csv").series("India").unwrap_err();
        assert!(matches!(err, HistoryError::Open { .. }));
    }
}
