//! Rule definitions: the stable catalogue schema.
//!
//! A `RuleDefinition` is a static declarative check mapping a dotted data
//! path in a producer's finding bag to a pass/fail/partial-credit verdict
//! under one compliance standard. The kind-specific parameters live in the
//! `RuleKind` tagged union so that every kind carries only the fields it
//! needs and dispatch is exhaustive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Level, Severity};

/// Producer wildcard: the rule may evaluate any producer's output.
pub const WILDCARD_DETECTOR: &str = "all";

fn default_weight() -> f64 {
    1.0
}

fn default_detectors() -> Vec<String> {
    vec![WILDCARD_DETECTOR.to_string()]
}

/// Comparison operator for threshold/percentage rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gte,
    Lte,
    Eq,
    Gt,
    Lt,
}

impl ComparisonOp {
    /// Apply the comparison: does `actual` satisfy the bound?
    pub fn holds(&self, actual: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Gte => actual >= threshold,
            ComparisonOp::Lte => actual <= threshold,
            ComparisonOp::Eq => actual == threshold,
            ComparisonOp::Gt => actual > threshold,
            ComparisonOp::Lt => actual < threshold,
        }
    }

    /// Short phrase for generated messages ("at least 4.5").
    pub fn describe(&self) -> &'static str {
        match self {
            ComparisonOp::Gte => "at least",
            ComparisonOp::Lte => "at most",
            ComparisonOp::Eq => "exactly",
            ComparisonOp::Gt => "more than",
            ComparisonOp::Lt => "less than",
        }
    }
}

/// Comparison operator for count rules, applied to an array length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CountOp {
    /// Length must not exceed the threshold.
    Max,
    /// Length must reach the threshold.
    Min,
    /// Length must equal the threshold.
    Exact,
}

impl CountOp {
    pub fn holds(&self, len: usize, threshold: usize) -> bool {
        match self {
            CountOp::Max => len <= threshold,
            CountOp::Min => len >= threshold,
            CountOp::Exact => len == threshold,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            CountOp::Max => "at most",
            CountOp::Min => "at least",
            CountOp::Exact => "exactly",
        }
    }
}

/// Gate check for conditional rules.
///
/// A false condition closes the gate: the rule is `not_applicable`, never a
/// failure, and the child rule does not run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Condition {
    /// The finding path resolves to any value.
    Exists { path: String },
    /// The finding path resolves to exactly this value.
    Equals { path: String, value: Value },
    /// An `AnalysisContext` property equals this value.
    ContextEquals { property: String, value: Value },
}

/// How a composite rule combines its children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Every applicable child must pass.
    All,
    /// At least one applicable child must pass.
    Any,
}

/// The evaluation logic a conditional or composite rule delegates to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildKind {
    Threshold { threshold: f64, operator: ComparisonOp },
    Boolean { expected: bool },
    Count { threshold: usize, operator: CountOp },
}

/// A nested rule inside a conditional or composite definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildRule {
    /// Overrides the parent's data path when set.
    #[serde(default)]
    pub data_path: Option<String>,

    /// Weight within a composite's blended score.
    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(flatten)]
    pub kind: ChildKind,
}

/// Tagged union over rule kinds. Each variant carries only the parameters
/// its kind requires; adding a kind forces every dispatch site to handle it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Numeric comparison with distance-based partial credit on failure.
    Threshold { threshold: f64, operator: ComparisonOp },

    /// Exact equality against an expected boolean.
    Boolean { expected: bool },

    /// Array length comparison with linear partial-credit decay.
    Count { threshold: usize, operator: CountOp },

    /// Same mechanics as `Threshold`; reserved for ratio-style paths.
    Percentage { threshold: f64, operator: ComparisonOp },

    /// Gate a child rule behind a condition.
    Conditional {
        condition: Condition,
        rule: Box<ChildRule>,
    },

    /// Combine several child rules into one verdict.
    Composite {
        combinator: Combinator,
        rules: Vec<ChildRule>,
    },

    /// Delegate to a registered `CustomScorer` by name.
    Custom { scorer: String },
}

impl RuleKind {
    /// Catalogue-facing name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Threshold { .. } => "threshold",
            RuleKind::Boolean { .. } => "boolean",
            RuleKind::Count { .. } => "count",
            RuleKind::Percentage { .. } => "percentage",
            RuleKind::Conditional { .. } => "conditional",
            RuleKind::Composite { .. } => "composite",
            RuleKind::Custom { .. } => "custom",
        }
    }
}

/// One declarative compliance check. Immutable, loaded once at engine
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleDefinition {
    /// Stable identity, unique within a catalogue.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Grouping category (e.g. "perceivable", "operable").
    pub category: String,

    /// Owning standard (e.g. "WCAG 2.1", "Section 508").
    pub standard: String,

    /// Conformance level of the rule.
    pub level: Level,

    /// Dotted path into the finding bag.
    pub data_path: String,

    #[serde(flatten)]
    pub kind: RuleKind,

    /// Relative contribution to the weighted overall score. Defaults to 1;
    /// must be > 0.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Producer names this rule may evaluate, or the `all` wildcard.
    #[serde(default = "default_detectors")]
    pub applicable_detectors: Vec<String>,

    /// Page-type allow-list. Empty means the rule applies in every context.
    #[serde(default)]
    pub contexts: Vec<String>,

    /// Fixed severity for failing issues. When absent, severity is derived
    /// from the relative deviation between actual and expected values.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Fixed remediation text. When absent, a message embedding the actual
    /// and expected values is generated.
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl RuleDefinition {
    /// Whether this rule may evaluate the named producer's output.
    pub fn applies_to_detector(&self, detector: &str) -> bool {
        self.applicable_detectors
            .iter()
            .any(|d| d == detector || d == WILDCARD_DETECTOR)
    }

    /// Whether this rule applies under the given page-type tag.
    ///
    /// An empty `contexts` list means no restriction. A rule with a
    /// non-empty list only applies when the tag is present and listed.
    pub fn applies_to_context(&self, page_type: Option<&str>) -> bool {
        if self.contexts.is_empty() {
            return true;
        }
        match page_type {
            Some(tag) => self.contexts.iter().any(|c| c == tag),
            None => false,
        }
    }
}
