/*
 * data.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loading data records from JSON and YAML files.

use std::fs;
use std::path::Path;

use crate::error::{TemplateError, TemplateResult};
use crate::value::Record;

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// Format implied by the file extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()?
            .to_str()?
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            _ => None,
        }
    }
}

/// Parse a record from `source`. The top level must be an object/mapping.
pub fn parse_record(source: &str, format: DataFormat) -> Result<Record, String> {
    let value: serde_json::Value = match format {
        DataFormat::Json => serde_json::from_str(source).map_err(|e| e.to_string())?,
        DataFormat::Yaml => serde_yaml::from_str(source).map_err(|e| e.to_string())?,
    };
    if !value.is_object() {
        return Err("top level must be an object".to_string());
    }
    Ok(Record::from_json(value))
}

/// Load a record from a `.json`, `.yaml` or `.yml` file.
pub fn load_record(path: &Path) -> TemplateResult<Record> {
    let data_error = |message: String| TemplateError::Data {
        path: path.to_path_buf(),
        message,
    };

    let format = DataFormat::from_path(path)
        .ok_or_else(|| data_error("unknown data format (expected .json, .yaml or .yml)".to_string()))?;
    let source = fs::read_to_string(path).map_err(|e| data_error(e.to_string()))?;
    parse_record(&source, format).map_err(data_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::resolve;
    use tempfile::TempDir;

    #[test]
    fn test_json_and_yaml_agree() {
        let json = parse_record(r#"{"customer": {"name": "Ada"}, "items": [1, 2]}"#, DataFormat::Json).unwrap();
        let yaml = parse_record("customer:\n  name: Ada\nitems:\n  - 1\n  - 2\n", DataFormat::Yaml).unwrap();
        assert_eq!(json, yaml);
        assert_eq!(resolve(&yaml, &["Customer", "Name"]).unwrap(), "Ada");
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert!(parse_record("[1, 2]", DataFormat::Json).is_err());
        assert!(parse_record("just text", DataFormat::Yaml).is_err());
    }

    #[test]
    fn test_load_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.YML");
        fs::write(&path, "total: 12.5\n").unwrap();
        let record = load_record(&path).unwrap();
        assert_eq!(resolve(&record, &["total"]).unwrap(), "12.5");

        let unknown = dir.path().join("data.txt");
        fs::write(&unknown, "").unwrap();
        assert!(matches!(load_record(&unknown), Err(TemplateError::Data { .. })));
    }
}
