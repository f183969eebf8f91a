//! Report assembly types for the analysis pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use conforma_core::{
    ComplianceAssessment, ComplianceLevel, Recommendation, RuleEvaluation,
};

use crate::producers::{Enhancement, ProducerOutput};

/// Per-producer outcome: exactly one of `output` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ProducerOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock time spent in this producer, including timeout waits.
    pub elapsed_ms: u64,
}

impl ProducerRecord {
    pub fn succeeded(output: ProducerOutput, elapsed_ms: u64) -> Self {
        Self {
            output: Some(output),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

/// Aggregate counts for one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Fraction of successful components in [0, 1]; 1.0 for an empty phase.
    pub success_rate: f64,
    pub elapsed_ms: u64,
}

impl PhaseSummary {
    pub fn from_records<'a>(
        records: impl Iterator<Item = &'a ProducerRecord>,
        elapsed_ms: u64,
    ) -> Self {
        let mut total = 0;
        let mut succeeded = 0;
        for record in records {
            total += 1;
            if record.is_success() {
                succeeded += 1;
            }
        }
        let failed = total - succeeded;
        let success_rate = if total == 0 {
            1.0
        } else {
            succeeded as f64 / total as f64
        };
        Self {
            total,
            succeeded,
            failed,
            success_rate,
            elapsed_ms,
        }
    }
}

/// Results of one fan-out phase, keyed by component name.
///
/// Used for both the detector and heuristic phases; the key set is
/// deterministic regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorResults {
    pub results: BTreeMap<String, ProducerRecord>,
    pub summary: PhaseSummary,
}

impl DetectorResults {
    pub fn empty() -> Self {
        Self {
            results: BTreeMap::new(),
            summary: PhaseSummary::from_records(std::iter::empty(), 0),
        }
    }

    /// Finding bags from successful components, keyed by producer name.
    pub fn successful_findings(&self) -> Vec<(String, Value)> {
        self.results
            .iter()
            .filter_map(|(name, record)| {
                record
                    .output
                    .as_ref()
                    .map(|output| (name.clone(), output.findings.clone()))
            })
            .collect()
    }

    /// Self-reported scores from successful components.
    pub fn scores(&self) -> Vec<f64> {
        self.results
            .values()
            .filter_map(|record| record.output.as_ref().and_then(|output| output.score))
            .collect()
    }

    /// Bubbled recommendations, capped per component.
    pub fn recommendations(&self, per_component_cap: usize) -> Vec<Recommendation> {
        self.results
            .values()
            .filter_map(|record| record.output.as_ref())
            .flat_map(|output| output.recommendations.iter().take(per_component_cap).cloned())
            .collect()
    }

    pub fn average_score(&self) -> Option<f64> {
        let scores = self.scores();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

/// Which phases ran to completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PhaseFlags {
    pub detectors: bool,
    pub heuristics: bool,
    pub rules: bool,
    /// None when no enhancer was registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<bool>,
}

/// The full analysis report. Always structurally complete, even on
/// partial or total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Blended top-level score in [0, 100].
    pub overall_score: f64,

    /// Score-bucket compliance level derived from `overall_score`; may
    /// differ from the assessment's per-level compliance check.
    pub compliance_level: ComplianceLevel,

    pub assessment: ComplianceAssessment,
    pub detector_results: DetectorResults,
    pub heuristic_results: DetectorResults,
    pub evaluations: Vec<RuleEvaluation>,
    pub recommendations: Vec<Recommendation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<Enhancement>,

    pub phases: PhaseFlags,
    pub analyzed_at: DateTime<Utc>,
}

impl Report {
    /// Terminal error report: zero scores, empty phases, `success` false.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            overall_score: 0.0,
            compliance_level: ComplianceLevel::NotCompliant,
            assessment: ComplianceAssessment::zeroed(),
            detector_results: DetectorResults::empty(),
            heuristic_results: DetectorResults::empty(),
            evaluations: vec![],
            recommendations: vec![],
            enhancement: None,
            phases: PhaseFlags::default(),
            analyzed_at: Utc::now(),
        }
    }

    /// Blend phase scores: 40% detector average, 30% heuristic average,
    /// 30% rules score. Absent phase averages fall back to the rules
    /// score so a missing signal neither inflates nor sinks the result.
    pub fn blend_scores(
        detector_avg: Option<f64>,
        heuristic_avg: Option<f64>,
        rules_score: f64,
    ) -> f64 {
        let detector = detector_avg.unwrap_or(rules_score);
        let heuristic = heuristic_avg.unwrap_or(rules_score);
        (0.4 * detector + 0.3 * heuristic + 0.3 * rules_score).clamp(0.0, 100.0)
    }

    /// Bucket an overall score into a headline compliance level.
    pub fn score_bucket(score: f64) -> ComplianceLevel {
        if score >= 95.0 {
            ComplianceLevel::Aaa
        } else if score >= 85.0 {
            ComplianceLevel::Aa
        } else if score >= 70.0 {
            ComplianceLevel::A
        } else {
            ComplianceLevel::NotCompliant
        }
    }
}
