//! JSON Schema validation for rule catalogues.
//!
//! External catalogue documents are validated against
//! schema/catalog.schema.json before deserialization so that portable rule
//! sets fail fast with field-level messages instead of serde errors.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded catalogue schema (loaded at compile time).
const CATALOG_SCHEMA_JSON: &str = include_str!("../../../../schema/catalog.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

/// Get or initialize the compiled schema validator.
fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(CATALOG_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a catalogue JSON value against the schema.
///
/// Returns `Ok(())` if valid, or the list of validation error messages.
pub fn validate_catalog_schema(catalog_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(catalog_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_catalog_passes_schema() {
        let value = serde_json::json!({
            "catalog_version": "1.0",
            "rules": [
                {
                    "id": "contrast-aa",
                    "name": "Minimum contrast ratio",
                    "category": "perceivable",
                    "standard": "WCAG 2.1",
                    "level": "AA",
                    "kind": "threshold",
                    "data_path": "color_contrast.minimum_ratio",
                    "threshold": 4.5,
                    "operator": "gte"
                }
            ]
        });
        assert!(validate_catalog_schema(&value).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let value = serde_json::json!({
            "catalog_version": "1.0",
            "rules": [
                { "id": "r1", "name": "Rule" }
            ]
        });
        let result = validate_catalog_schema(&value);
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_empty());
    }

    #[test]
    fn invalid_version_format_fails() {
        let value = serde_json::json!({
            "catalog_version": "not-a-version",
            "rules": []
        });
        assert!(validate_catalog_schema(&value).is_err());
    }

    #[test]
    fn invalid_level_fails() {
        let value = serde_json::json!({
            "catalog_version": "1.0",
            "rules": [
                {
                    "id": "r1",
                    "name": "Rule",
                    "category": "c",
                    "standard": "s",
                    "level": "AAAA",
                    "kind": "boolean",
                    "data_path": "p",
                    "expected": true
                }
            ]
        });
        assert!(validate_catalog_schema(&value).is_err());
    }

    #[test]
    fn zero_weight_fails() {
        let value = serde_json::json!({
            "catalog_version": "1.0",
            "rules": [
                {
                    "id": "r1",
                    "name": "Rule",
                    "category": "c",
                    "standard": "s",
                    "level": "A",
                    "kind": "boolean",
                    "data_path": "p",
                    "expected": true,
                    "weight": 0
                }
            ]
        });
        assert!(validate_catalog_schema(&value).is_err());
    }

    #[test]
    fn unknown_top_level_property_fails() {
        let value = serde_json::json!({
            "catalog_version": "1.0",
            "rules": [],
            "unknown_field": true
        });
        assert!(validate_catalog_schema(&value).is_err());
    }
}
