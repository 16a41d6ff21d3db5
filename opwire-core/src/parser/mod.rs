use serde_json::Value;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

/// Parse a schema document into a JSON value (works for both JSON and YAML
/// inputs). The document root must be an object.
pub fn parse_document_str(input: &str, format: DocumentFormat) -> Result<Value, ParseError> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str::<Value>(input)?,
        DocumentFormat::Yaml => yaml_to_json(input)?,
        DocumentFormat::Auto => parse_auto(input)?,
    };
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(value)
}

fn parse_auto(input: &str) -> Result<Value, ParseError> {
    // Heuristic: JSON starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(input) {
            Ok(v) => Ok(v),
            // If JSON parsing fails, try YAML as fallback; report the JSON
            // error since we tried JSON first.
            Err(e) => yaml_to_json(input).map_err(|_| ParseError::Json(e)),
        }
    } else {
        match yaml_to_json(input) {
            Ok(v) => Ok(v),
            Err(e) => serde_json::from_str::<Value>(input).map_err(|_| e),
        }
    }
}

fn yaml_to_json(input: &str) -> Result<Value, ParseError> {
    let y = serde_yaml::from_str::<serde_yaml::Value>(input)?;
    Ok(serde_json::to_value(y)?)
}
