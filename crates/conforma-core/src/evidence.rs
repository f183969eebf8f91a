//! Evidence records for rule evaluations.
//!
//! Every failing or conditional verdict is supported by evidence pointing at
//! the data path that was inspected and the actual vs. expected values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a piece of evidence was taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// A producer's finding bag.
    Finding,
    /// The run-scoped analysis context.
    Context,
}

/// A piece of evidence supporting an evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// What this evidence documents.
    pub claim: String,

    /// Where the evidence comes from.
    pub source: EvidenceSource,

    /// Dotted data path that was inspected (or context property name).
    pub path: String,

    /// Value actually found, if any.
    pub actual: Option<Value>,

    /// Value or bound the rule expected.
    pub expected: Option<Value>,
}

impl Evidence {
    /// Evidence comparing an extracted finding value against an expectation.
    pub fn comparison(
        claim: impl Into<String>,
        path: impl Into<String>,
        actual: Value,
        expected: Value,
    ) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Finding,
            path: path.into(),
            actual: Some(actual),
            expected: Some(expected),
        }
    }

    /// Evidence that a finding path was absent.
    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            claim: format!("no value present at `{}`", path),
            source: EvidenceSource::Finding,
            path,
            actual: None,
            expected: None,
        }
    }

    /// Evidence recording the outcome of a conditional rule's gate check.
    pub fn condition(claim: impl Into<String>, path: impl Into<String>, held: bool) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Finding,
            path: path.into(),
            actual: Some(Value::Bool(held)),
            expected: Some(Value::Bool(true)),
        }
    }

    /// Evidence taken from a context property.
    pub fn from_context(
        claim: impl Into<String>,
        property: impl Into<String>,
        actual: Option<Value>,
        expected: Value,
    ) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Context,
            path: property.into(),
            actual,
            expected: Some(expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparison_evidence() {
        let evidence = Evidence::comparison(
            "contrast ratio below minimum",
            "color_contrast.minimum_ratio",
            json!(3.0),
            json!(4.5),
        );
        assert_eq!(evidence.source, EvidenceSource::Finding);
        assert_eq!(evidence.actual, Some(json!(3.0)));
        assert_eq!(evidence.expected, Some(json!(4.5)));
    }

    #[test]
    fn missing_evidence_has_no_values() {
        let evidence = Evidence::missing("images.missing_alt");
        assert!(evidence.actual.is_none());
        assert!(evidence.expected.is_none());
        assert!(evidence.claim.contains("images.missing_alt"));
    }

    #[test]
    fn context_evidence_records_property_and_expectation() {
        let evidence = Evidence::from_context(
            "condition: context `page_type` equals \"mobile\"",
            "page_type",
            None,
            json!("mobile"),
        );
        assert_eq!(evidence.source, EvidenceSource::Context);
        assert_eq!(evidence.path, "page_type");
        assert!(evidence.actual.is_none());
        assert_eq!(evidence.expected, Some(json!("mobile")));
    }
}
