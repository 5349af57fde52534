//! Custom indicator schemas from JSON.

use std::fs;
use std::path::Path;

use crate::domain::IndicatorSchema;
use crate::error::AppError;

/// Read and validate a schema file.
pub fn read_schema_json(path: &Path) -> Result<IndicatorSchema, AppError> {
    let json = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open schema '{}': {e}", path.display())))?;
    IndicatorSchema::from_json_str(&json)
        .map_err(|e| AppError::new(2, format!("Schema '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_usage_error() {
        let err = read_schema_json(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn reads_schema_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let json = serde_json::to_string(&crate::domain::SchemaVariant::Energy.schema()).unwrap();
        fs::write(&path, json).unwrap();
        let schema = read_schema_json(&path).unwrap();
        assert_eq!(schema.feature_names(), ["gdp", "energy_consumption", "population"]);
    }
}
