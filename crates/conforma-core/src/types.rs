//! Core types shared across the evaluation engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// WCAG conformance level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    A,
    AA,
    AAA,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::A => write!(f, "A"),
            Level::AA => write!(f, "AA"),
            Level::AAA => write!(f, "AAA"),
        }
    }
}

/// Severity of a single issue raised by a rule evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome status of one rule evaluation.
///
/// `NotApplicable` evaluations are excluded from every average and from the
/// weighted overall score. `Error` evaluations score 0 and aggregate like
/// failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Passed,
    Failed,
    NotApplicable,
    Error,
}

impl EvaluationStatus {
    pub fn is_applicable(&self) -> bool {
        !matches!(self, EvaluationStatus::NotApplicable)
    }
}

/// A single problem found by a failing or erroring rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    /// Remediation guidance. Every failing evaluation carries exactly one.
    pub recommendation: String,
}

/// Result of evaluating one rule against one finding snapshot.
///
/// Immutable once created; conditional rules build a *new* evaluation by
/// merging a child evaluation's fields rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleEvaluation {
    /// Identity of the evaluated rule.
    pub rule_id: String,

    /// Display name of the rule.
    pub rule_name: String,

    /// Owning compliance standard (e.g. "WCAG 2.1").
    pub standard: String,

    /// Conformance level of the rule.
    pub level: Level,

    /// Name of the producer whose findings were evaluated.
    pub detector: String,

    pub status: EvaluationStatus,

    /// Score in [0, 100].
    pub score: f64,

    /// Relative contribution to the weighted overall score.
    pub weight: f64,

    /// Issues raised, ordered by discovery.
    pub issues: Vec<Issue>,

    /// Actual-vs-expected records supporting the verdict.
    pub evidence: Vec<Evidence>,
}

impl RuleEvaluation {
    /// Whether this evaluation contributes to aggregate scores.
    pub fn is_applicable(&self) -> bool {
        self.status.is_applicable()
    }
}

/// Per-standard compliance scores, recomputed each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceScore {
    /// Average over all applicable evaluations for this standard.
    pub overall: f64,
    pub level_a: f64,
    pub level_aa: f64,
    pub level_aaa: f64,
}

/// Final compliance tier, either from per-level averages (aggregator) or
/// from the blended top-level score (orchestrator). The two derivations use
/// different thresholds and must not be confused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComplianceLevel {
    #[serde(rename = "WCAG 2.1 AAA")]
    Aaa,
    #[serde(rename = "WCAG 2.1 AA")]
    Aa,
    #[serde(rename = "WCAG 2.1 A")]
    A,
    #[serde(rename = "Not Compliant")]
    NotCompliant,
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceLevel::Aaa => write!(f, "WCAG 2.1 AAA"),
            ComplianceLevel::Aa => write!(f, "WCAG 2.1 AA"),
            ComplianceLevel::A => write!(f, "WCAG 2.1 A"),
            ComplianceLevel::NotCompliant => write!(f, "Not Compliant"),
        }
    }
}

/// Legal exposure derived from the WCAG AA average.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegalRisk {
    Low,
    Medium,
    High,
}

/// End-user impact derived from the overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserImpact {
    Minimal,
    Moderate,
    Significant,
    Severe,
}

/// Priority of a remediation item. Ordering is the fixed sort order for
/// recommendation lists: critical > high > medium > low > enhancement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Enhancement,
}

/// Estimated remediation effort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// Expected improvement from applying a recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// A prioritized remediation item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub description: String,
    /// Concrete action text for remediation.
    pub action: String,
    pub effort: Effort,
    pub impact: Impact,
    /// Rule IDs of example evaluations, capped per recommendation.
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Run-scoped metadata for one analysis invocation.
///
/// Created once per invocation by the orchestrator, read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Compliance standards in scope for this run.
    pub standards: Vec<String>,

    /// Target conformance level.
    pub target_level: Level,

    /// When set, failing threshold-style rules score 0 instead of
    /// receiving distance-based partial credit.
    #[serde(default)]
    pub strict_mode: bool,

    /// Device/page-type tag used by contextual rule filtering and by
    /// conditional rules checking context properties.
    #[serde(default)]
    pub page_type: Option<String>,

    /// Per-rule weight overrides applied on top of catalogue weights.
    #[serde(default)]
    pub rule_weights: BTreeMap<String, f64>,

    /// Free-form context properties readable by conditional rules.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            standards: vec!["WCAG 2.1".to_string()],
            target_level: Level::AA,
            strict_mode: false,
            page_type: None,
            rule_weights: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl AnalysisContext {
    pub fn new(standards: Vec<String>, target_level: Level) -> Self {
        Self {
            standards,
            target_level,
            ..Self::default()
        }
    }

    /// Look up a context property by name for conditional rules.
    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "page_type" | "type" => self
                .page_type
                .as_ref()
                .map(|t| serde_json::Value::String(t.clone())),
            "target_level" => Some(serde_json::Value::String(self.target_level.to_string())),
            "strict_mode" => Some(serde_json::Value::Bool(self.strict_mode)),
            _ => self.properties.get(name).cloned(),
        }
    }

    /// Effective weight for a rule after applying overrides.
    pub fn weight_for(&self, rule_id: &str, catalogue_weight: f64) -> f64 {
        self.rule_weights
            .get(rule_id)
            .copied()
            .unwrap_or(catalogue_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_sort_order() {
        let mut priorities = vec![
            Priority::Low,
            Priority::Critical,
            Priority::Enhancement,
            Priority::Medium,
            Priority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Medium,
                Priority::Low,
                Priority::Enhancement,
            ]
        );
    }

    #[test]
    fn compliance_level_display() {
        assert_eq!(ComplianceLevel::Aaa.to_string(), "WCAG 2.1 AAA");
        assert_eq!(ComplianceLevel::NotCompliant.to_string(), "Not Compliant");
    }

    #[test]
    fn context_property_lookup() {
        let ctx = AnalysisContext {
            page_type: Some("mobile".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ctx.property("page_type"),
            Some(serde_json::Value::String("mobile".to_string()))
        );
        assert_eq!(ctx.property("strict_mode"), Some(serde_json::Value::Bool(false)));
        assert_eq!(ctx.property("unknown"), None);
    }

    #[test]
    fn weight_override() {
        let mut ctx = AnalysisContext::default();
        ctx.rule_weights.insert("contrast-aa".to_string(), 3.0);
        assert_eq!(ctx.weight_for("contrast-aa", 1.0), 3.0);
        assert_eq!(ctx.weight_for("other", 2.0), 2.0);
    }
}
