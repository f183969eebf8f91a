//! Rule catalogue loading and validation.
//!
//! Catalogues are structured data validated against a JSON Schema. This
//! module handles parsing YAML/JSON catalogues, the built-in rule set, and
//! structural validation (unique IDs, positive weights).

mod definition;
mod schema;

pub use definition::{
    ChildKind, ChildRule, Combinator, ComparisonOp, Condition, CountOp, RuleDefinition, RuleKind,
    WILDCARD_DETECTOR,
};
pub use schema::validate_catalog_schema;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in catalogue (embedded at compile time).
const BUILTIN_CATALOG_YAML: &str = include_str!("../../data/builtin.yaml");

static BUILTIN_CATALOG: OnceLock<Result<Catalog, String>> = OnceLock::new();

/// Errors that can occur when loading catalogues.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalogue file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Catalogue validation failed: {0}")]
    ValidationError(String),
}

/// A static, versioned set of rule definitions grouped by standard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalogue version (semver).
    pub catalog_version: String,

    /// All rule definitions.
    pub rules: Vec<RuleDefinition>,
}

impl Catalog {
    /// The built-in WCAG 2.1 / Section 508 / EN 301 549 catalogue.
    pub fn builtin() -> Result<Catalog, CatalogError> {
        let result = BUILTIN_CATALOG.get_or_init(|| {
            let catalog: Catalog =
                serde_yaml::from_str(BUILTIN_CATALOG_YAML).map_err(|e| e.to_string())?;
            catalog.validate().map_err(|e| e.to_string())?;
            Ok(catalog)
        });

        match result {
            Ok(catalog) => Ok(catalog.clone()),
            Err(e) => Err(CatalogError::ValidationError(e.clone())),
        }
    }

    /// Parse a catalogue from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a catalogue from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a catalogue from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Schema-validate and deserialize a catalogue document.
    fn from_value(value: serde_json::Value) -> Result<Self, CatalogError> {
        validate_catalog_schema(&value)
            .map_err(|errors| CatalogError::SchemaError(errors.join("; ")))?;

        let catalog: Catalog = serde_json::from_value(value)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Merge custom rules into this catalogue.
    ///
    /// A custom rule whose `id` matches an existing rule replaces it;
    /// otherwise the rule is appended. The merged catalogue is re-validated.
    pub fn merged(mut self, custom_rules: &[RuleDefinition]) -> Result<Self, CatalogError> {
        for custom in custom_rules {
            match self.rules.iter_mut().find(|r| r.id == custom.id) {
                Some(existing) => *existing = custom.clone(),
                None => self.rules.push(custom.clone()),
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Rules belonging to one standard.
    pub fn rules_for_standard<'a>(
        &'a self,
        standard: &'a str,
    ) -> impl Iterator<Item = &'a RuleDefinition> {
        self.rules.iter().filter(move |r| r.standard == standard)
    }

    /// The distinct standards covered by this catalogue, in rule order.
    pub fn standards(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .filter(|r| seen.insert(r.standard.as_str()))
            .map(|r| r.standard.as_str())
            .collect()
    }

    /// Validate catalogue structure.
    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(&rule.id) {
                return Err(CatalogError::ValidationError(format!(
                    "Duplicate rule ID: {}",
                    rule.id
                )));
            }

            if rule.weight <= 0.0 {
                return Err(CatalogError::ValidationError(format!(
                    "Rule {} has non-positive weight {}",
                    rule.id, rule.weight
                )));
            }

            if let RuleKind::Composite { rules, .. } = &rule.kind {
                if rules.is_empty() {
                    return Err(CatalogError::ValidationError(format!(
                        "Composite rule {} has no children",
                        rule.id
                    )));
                }
                if rules.iter().any(|c| c.weight <= 0.0) {
                    return Err(CatalogError::ValidationError(format!(
                        "Composite rule {} has a child with non-positive weight",
                        rule.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.rules.is_empty());
        assert!(catalog.standards().contains(&"WCAG 2.1"));
        assert!(catalog.standards().contains(&"Section 508"));
        assert!(catalog.standards().contains(&"EN 301 549"));
    }

    #[test]
    fn builtin_catalog_passes_schema() {
        let value: serde_json::Value = serde_yaml::from_str(BUILTIN_CATALOG_YAML).unwrap();
        assert!(validate_catalog_schema(&value).is_ok());
    }

    #[test]
    fn duplicate_rule_ids_rejected() {
        let yaml = r#"
catalog_version: "1.0"
rules:
  - id: r1
    name: "Rule 1"
    category: c
    standard: s
    level: A
    kind: boolean
    data_path: a
    expected: true
  - id: r1
    name: "Rule 2"
    category: c
    standard: s
    level: A
    kind: boolean
    data_path: b
    expected: true
"#;
        let result = Catalog::from_yaml(yaml);
        assert!(matches!(result, Err(CatalogError::ValidationError(_))));
    }

    #[test]
    fn schema_rejects_malformed_rule() {
        let yaml = r#"
catalog_version: "1.0"
rules:
  - id: r1
    name: "Rule 1"
"#;
        let result = Catalog::from_yaml(yaml);
        assert!(matches!(result, Err(CatalogError::SchemaError(_))));
    }

    #[test]
    fn merge_replaces_by_id_and_appends() {
        let catalog = Catalog::builtin().unwrap();
        let original_len = catalog.rules.len();

        let mut replacement = catalog
            .rules
            .iter()
            .find(|r| r.id == "contrast-aa")
            .unwrap()
            .clone();
        replacement.weight = 5.0;

        let mut added = replacement.clone();
        added.id = "contrast-custom".to_string();

        let merged = catalog.merged(&[replacement, added]).unwrap();
        assert_eq!(merged.rules.len(), original_len + 1);
        let contrast = merged.rules.iter().find(|r| r.id == "contrast-aa").unwrap();
        assert_eq!(contrast.weight, 5.0);
    }

    #[test]
    fn rules_for_standard_filters() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog
            .rules_for_standard("Section 508")
            .all(|r| r.standard == "Section 508"));
        assert!(catalog.rules_for_standard("Section 508").count() >= 2);
    }
}
