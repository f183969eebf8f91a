//! Recommendation builder: failed evaluations in, prioritized and
//! deduplicated remediation items out.

use std::collections::HashSet;

use crate::aggregator::ComplianceAssessment;
use crate::types::{
    ComplianceLevel, Effort, EvaluationStatus, Impact, Priority, Recommendation, RuleEvaluation,
    Severity,
};

/// Maximum recommendations surfaced at the top level.
pub const TOP_LEVEL_CAP: usize = 20;

/// Maximum example rule IDs attached to one recommendation.
pub const EXAMPLE_CAP: usize = 8;

/// Builds the final recommendation list for a report.
pub struct RecommendationBuilder;

impl RecommendationBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the deduplicated, priority-ordered recommendation list.
    ///
    /// `bubbled` carries recommendations surfaced by producers, heuristics
    /// or the enhancer; each sub-phase is expected to have capped its own
    /// list before handing it in.
    pub fn build(
        &self,
        evaluations: &[RuleEvaluation],
        assessment: &ComplianceAssessment,
        bubbled: Vec<Recommendation>,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if let Some(critical) = self.critical_fixes(evaluations) {
            recommendations.push(critical);
        }

        if assessment.compliance_level == ComplianceLevel::NotCompliant {
            recommendations.push(Recommendation {
                priority: Priority::High,
                title: "Achieve baseline WCAG compliance".to_string(),
                description: format!(
                    "The page does not meet any WCAG 2.1 conformance level \
                     (weighted score {}).",
                    assessment.overall_score
                ),
                action: "Address the failing Level A rules first; they gate every \
                         higher conformance tier."
                    .to_string(),
                effort: Effort::High,
                impact: Impact::High,
                examples: failed_rule_ids(evaluations, EXAMPLE_CAP),
            });
        }

        recommendations.extend(bubbled);

        // Fixed priority order, then dedupe by title keeping the
        // highest-priority occurrence.
        recommendations.sort_by_key(|r| r.priority);
        let mut seen = HashSet::new();
        recommendations.retain(|r| seen.insert(r.title.clone()));
        recommendations.truncate(TOP_LEVEL_CAP);
        recommendations
    }

    /// One rolled-up recommendation covering all critical/high failures.
    fn critical_fixes(&self, evaluations: &[RuleEvaluation]) -> Option<Recommendation> {
        let critical: Vec<&RuleEvaluation> = evaluations
            .iter()
            .filter(|e| {
                e.status == EvaluationStatus::Failed
                    && e.issues
                        .iter()
                        .any(|i| matches!(i.severity, Severity::Critical | Severity::High))
            })
            .collect();

        if critical.is_empty() {
            return None;
        }

        let examples: Vec<String> = critical
            .iter()
            .take(EXAMPLE_CAP)
            .map(|e| e.rule_id.clone())
            .collect();

        Some(Recommendation {
            priority: Priority::Critical,
            title: "Fix critical accessibility failures".to_string(),
            description: format!(
                "{} rule(s) failed with critical or high severity issues; these \
                 block assistive-technology users outright.",
                critical.len()
            ),
            action: "Resolve the listed failures before addressing lower-severity \
                     findings."
                .to_string(),
            effort: Effort::Medium,
            impact: Impact::High,
            examples,
        })
    }
}

impl Default for RecommendationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn failed_rule_ids(evaluations: &[RuleEvaluation], cap: usize) -> Vec<String> {
    evaluations
        .iter()
        .filter(|e| e.status == EvaluationStatus::Failed)
        .take(cap)
        .map(|e| e.rule_id.clone())
        .collect()
}
