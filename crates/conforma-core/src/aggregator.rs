//! Compliance aggregator: turns rule evaluations into per-standard scores
//! and an overall assessment.
//!
//! The aggregator applies fixed, non-configurable policy:
//! 1. `not_applicable` evaluations never contribute to any average.
//! 2. The weighted overall score blends all applicable evaluations across
//!    all standards, proportional to their configured weight.
//! 3. The compliance level comes from per-level WCAG averages crossing 80,
//!    a check deliberately stricter than the orchestrator's top-level
//!    buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ComplianceLevel, ComplianceScore, LegalRisk, Level, RuleEvaluation, UserImpact,
};

/// Standard name the compliance-level determination reads.
pub const WCAG_STANDARD: &str = "WCAG 2.1";

/// The full multi-standard assessment derived from one evaluation set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceAssessment {
    /// Weighted overall score in [0, 100], rounded.
    pub overall_score: f64,

    /// Compliance level from per-level WCAG averages.
    pub compliance_level: ComplianceLevel,

    /// Letter grade from the weighted overall score.
    pub letter_grade: String,

    /// Per-standard score breakdown.
    pub scores: BTreeMap<String, ComplianceScore>,

    /// Legal exposure from the WCAG AA average.
    pub legal_risk: LegalRisk,

    /// End-user impact from the overall score.
    pub user_impact: UserImpact,
}

impl ComplianceAssessment {
    /// Zero-score assessment used when the rules phase fails entirely.
    pub fn zeroed() -> Self {
        Self {
            overall_score: 0.0,
            compliance_level: ComplianceLevel::NotCompliant,
            letter_grade: letter_grade(0.0).to_string(),
            scores: BTreeMap::new(),
            legal_risk: LegalRisk::High,
            user_impact: UserImpact::Severe,
        }
    }
}

/// Aggregates rule evaluations into compliance scores.
pub struct ComplianceAggregator;

impl ComplianceAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate an evaluation set into a full assessment.
    ///
    /// Empty groups (including an entirely `not_applicable` set) yield 0
    /// without dividing by zero.
    pub fn aggregate(&self, evaluations: &[RuleEvaluation]) -> ComplianceAssessment {
        let applicable: Vec<&RuleEvaluation> =
            evaluations.iter().filter(|e| e.is_applicable()).collect();

        let mut scores: BTreeMap<String, ComplianceScore> = BTreeMap::new();
        let mut by_standard: BTreeMap<&str, Vec<&RuleEvaluation>> = BTreeMap::new();
        for eval in &applicable {
            by_standard.entry(eval.standard.as_str()).or_default().push(eval);
        }

        for (standard, evals) in &by_standard {
            scores.insert(
                standard.to_string(),
                ComplianceScore {
                    overall: average(evals.iter().map(|e| e.score)),
                    level_a: level_average(evals, Level::A),
                    level_aa: level_average(evals, Level::AA),
                    level_aaa: level_average(evals, Level::AAA),
                },
            );
        }

        let overall_score = weighted_overall(&applicable);
        let wcag = scores.get(WCAG_STANDARD);
        let compliance_level = determine_compliance_level(wcag);
        let legal_risk = derive_legal_risk(wcag);
        let user_impact = derive_user_impact(overall_score);

        ComplianceAssessment {
            overall_score,
            compliance_level,
            letter_grade: letter_grade(overall_score).to_string(),
            scores,
            legal_risk,
            user_impact,
        }
    }
}

impl Default for ComplianceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted overall score over applicable evaluations: round(Σ s·w / Σ w).
fn weighted_overall(applicable: &[&RuleEvaluation]) -> f64 {
    let weight_sum: f64 = applicable.iter().map(|e| e.weight).sum();
    if weight_sum <= 0.0 {
        return 0.0;
    }
    let score_sum: f64 = applicable.iter().map(|e| e.score * e.weight).sum();
    (score_sum / weight_sum).round()
}

fn average(scores: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = scores.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f64>() / collected.len() as f64
    }
}

fn level_average(evals: &[&RuleEvaluation], level: Level) -> f64 {
    average(
        evals
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.score),
    )
}

/// Compliance level from per-level WCAG averages crossing 80, checked from
/// the strictest tier downwards.
fn determine_compliance_level(wcag: Option<&ComplianceScore>) -> ComplianceLevel {
    let Some(score) = wcag else {
        return ComplianceLevel::NotCompliant;
    };

    if score.level_aaa >= 80.0 {
        ComplianceLevel::Aaa
    } else if score.level_aa >= 80.0 {
        ComplianceLevel::Aa
    } else if score.level_a >= 80.0 {
        ComplianceLevel::A
    } else {
        ComplianceLevel::NotCompliant
    }
}

/// Letter grade bands in 5-point steps from A+ at 95 down to F below 50.
pub fn letter_grade(score: f64) -> &'static str {
    if score >= 95.0 {
        "A+"
    } else if score >= 90.0 {
        "A"
    } else if score >= 85.0 {
        "B+"
    } else if score >= 80.0 {
        "B"
    } else if score >= 75.0 {
        "C+"
    } else if score >= 70.0 {
        "C"
    } else if score >= 65.0 {
        "D+"
    } else if score >= 60.0 {
        "D"
    } else if score >= 50.0 {
        "E"
    } else {
        "F"
    }
}

fn derive_legal_risk(wcag: Option<&ComplianceScore>) -> LegalRisk {
    let aa = wcag.map(|s| s.level_aa).unwrap_or(0.0);
    if aa >= 80.0 {
        LegalRisk::Low
    } else if aa >= 60.0 {
        LegalRisk::Medium
    } else {
        LegalRisk::High
    }
}

fn derive_user_impact(overall: f64) -> UserImpact {
    if overall >= 85.0 {
        UserImpact::Minimal
    } else if overall >= 70.0 {
        UserImpact::Moderate
    } else if overall >= 50.0 {
        UserImpact::Significant
    } else {
        UserImpact::Severe
    }
}
