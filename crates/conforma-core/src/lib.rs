//! # conforma-core
//!
//! Deterministic accessibility compliance rule-evaluation and scoring engine.
//!
//! This crate provides the core evaluation logic for Conforma, answering:
//! - Which compliance rules does this page satisfy?
//! - How far from conformance are the failures?
//! - What should be fixed first?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same (rule, finding, context) always produces the
//!    same evaluation; the cache returns repeats verbatim.
//! 2. **Total**: every rule evaluation yields a structurally valid result;
//!    absent data surfaces as `not_applicable`, faults as `error`, never as
//!    a missing field.
//! 3. **Pure**: no I/O side effects inside evaluation; logging goes through
//!    `tracing` at the boundaries only.
//!
//! ## Example
//!
//! ```rust,ignore
//! use conforma_core::{AnalysisContext, ComplianceEngine};
//! use serde_json::json;
//!
//! let engine = ComplianceEngine::with_builtin_catalog()?;
//! let ctx = AnalysisContext::default();
//! let findings = [(
//!     "contrast_analyzer".to_string(),
//!     json!({ "color_contrast": { "minimum_ratio": 3.2 } }),
//! )];
//! let (evaluations, assessment) = engine.evaluate_findings(&findings, &ctx);
//! println!("{} ({})", assessment.overall_score, assessment.letter_grade);
//! ```

pub mod aggregator;
pub mod catalog;
pub mod evaluator;
pub mod evidence;
pub mod path;
pub mod recommend;
pub mod types;

// Re-export main types at crate root
pub use aggregator::{letter_grade, ComplianceAggregator, ComplianceAssessment, WCAG_STANDARD};
pub use catalog::{
    Catalog, CatalogError, ChildKind, ChildRule, Combinator, ComparisonOp, Condition, CountOp,
    RuleDefinition, RuleKind, WILDCARD_DETECTOR,
};
pub use evaluator::{CacheConfig, CustomOutcome, CustomScorer, EvaluationCache, RuleEvaluator};
pub use evidence::{Evidence, EvidenceSource};
pub use recommend::{RecommendationBuilder, EXAMPLE_CAP, TOP_LEVEL_CAP};
pub use types::{
    AnalysisContext, ComplianceLevel, ComplianceScore, Effort, EvaluationStatus, Impact, Issue,
    LegalRisk, Level, Priority, Recommendation, RuleEvaluation, Severity, UserImpact,
};

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Errors from engine construction.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Catalogue error: {0}")]
    Catalog(#[from] CatalogError),
}

/// The rules-phase engine: catalogue + evaluator + aggregator.
///
/// Construct once, reuse across analysis runs; the evaluation cache is
/// scoped to the engine instance.
pub struct ComplianceEngine {
    catalog: Catalog,
    evaluator: RuleEvaluator,
    aggregator: ComplianceAggregator,
}

impl ComplianceEngine {
    /// Engine over the built-in catalogue with default cache settings.
    pub fn with_builtin_catalog() -> Result<Self, EngineError> {
        Ok(Self::new(Catalog::builtin()?, CacheConfig::default()))
    }

    /// Engine over an explicit catalogue.
    pub fn new(catalog: Catalog, cache_config: CacheConfig) -> Self {
        Self {
            catalog,
            evaluator: RuleEvaluator::new(cache_config),
            aggregator: ComplianceAggregator::new(),
        }
    }

    /// Register a scorer for `custom`-kind rules.
    pub fn register_scorer(&mut self, scorer: Arc<dyn CustomScorer>) {
        self.evaluator.register_scorer(scorer);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The evaluation cache (size/clear are part of the public contract).
    pub fn cache(&self) -> &EvaluationCache {
        self.evaluator.cache()
    }

    /// Evaluate every in-scope rule against every producer's finding bag
    /// and aggregate the results.
    ///
    /// Rules are filtered to the standards named in the context; each rule
    /// evaluates only producers its `applicable_detectors` admits, which
    /// shows up as `not_applicable` entries excluded from all aggregates.
    pub fn evaluate_findings(
        &self,
        findings_by_producer: &[(String, Value)],
        ctx: &AnalysisContext,
    ) -> (Vec<RuleEvaluation>, ComplianceAssessment) {
        let mut evaluations = Vec::new();

        for rule in &self.catalog.rules {
            if !ctx.standards.iter().any(|s| s == &rule.standard) {
                continue;
            }
            for (producer, findings) in findings_by_producer {
                evaluations.push(self.evaluator.evaluate(rule, producer, findings, ctx));
            }
        }

        let assessment = self.aggregator.aggregate(&evaluations);
        (evaluations, assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contrast_findings(ratio: f64) -> Vec<(String, Value)> {
        vec![(
            "contrast_analyzer".to_string(),
            json!({ "color_contrast": { "minimum_ratio": ratio } }),
        )]
    }

    #[test]
    fn engine_evaluates_builtin_catalog() {
        let engine = ComplianceEngine::with_builtin_catalog().unwrap();
        let ctx = AnalysisContext::default();

        let (evaluations, assessment) = engine.evaluate_findings(&contrast_findings(5.0), &ctx);
        assert!(!evaluations.is_empty());

        // AA contrast passes; AAA (7.0) fails with partial credit.
        let aa = evaluations.iter().find(|e| e.rule_id == "contrast-aa").unwrap();
        assert_eq!(aa.status, EvaluationStatus::Passed);
        let aaa = evaluations.iter().find(|e| e.rule_id == "contrast-aaa").unwrap();
        assert_eq!(aaa.status, EvaluationStatus::Failed);
        assert!(aaa.score < 50.0);

        assert!(assessment.overall_score > 0.0);
    }

    #[test]
    fn standards_outside_context_are_skipped() {
        let engine = ComplianceEngine::with_builtin_catalog().unwrap();
        let ctx = AnalysisContext {
            standards: vec!["Section 508".to_string()],
            ..Default::default()
        };

        let (evaluations, _) = engine.evaluate_findings(&contrast_findings(5.0), &ctx);
        assert!(evaluations.iter().all(|e| e.standard == "Section 508"));
    }

    #[test]
    fn repeat_run_hits_cache() {
        let engine = ComplianceEngine::with_builtin_catalog().unwrap();
        let ctx = AnalysisContext::default();
        let findings = contrast_findings(3.0);

        let (first, _) = engine.evaluate_findings(&findings, &ctx);
        let count_after_first = engine.cache().entry_count();
        let (second, _) = engine.evaluate_findings(&findings, &ctx);

        assert_eq!(first, second);
        assert_eq!(engine.cache().entry_count(), count_after_first);
    }
}
