//! Finding producer, heuristic analyzer, and enhancer traits.
//!
//! These are the seams to the external collaborators: detectors inspect the
//! page model, heuristics interpret detector output, and an optional
//! enhancer post-processes the whole run. The core never calls them
//! directly; only the orchestrator does.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use conforma_core::{AnalysisContext, ComplianceAssessment, Recommendation, RuleEvaluation};

use crate::report::DetectorResults;

/// Errors from producers, heuristics, and enhancers.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Producer failed: {0}")]
    Failed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

/// Named result bag returned by one producer or heuristic.
///
/// `findings` is an opaque nested structure addressed by the rule
/// catalogue's dotted data paths; it is immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerOutput {
    /// Finding data keyed by dotted paths.
    pub findings: Value,

    /// Optional self-reported score in [0, 100], blended into the
    /// top-level overall score.
    #[serde(default)]
    pub score: Option<f64>,

    /// Recommendations bubbled up to the report (capped per sub-phase).
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl ProducerOutput {
    pub fn new(findings: Value) -> Self {
        Self {
            findings,
            score: None,
            recommendations: vec![],
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score.clamp(0.0, 100.0));
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.recommendations = recommendations;
        self
    }
}

/// A detector component producing one named finding bag per run.
///
/// # Isolation Contract
/// Producers run concurrently and must not share mutable state. A
/// producer's failure or timeout is recorded per-name and never aborts
/// the run.
#[async_trait]
pub trait FindingProducer: Send + Sync {
    /// Name the finding bag is keyed under; also matched against rule
    /// `applicable_detectors` lists.
    fn name(&self) -> &str;

    /// Inspect the page model and return findings.
    async fn produce(&self, ctx: &AnalysisContext) -> Result<ProducerOutput, ProducerError>;

    /// Deadline enforced by the orchestrator for this producer. `None`
    /// uses the run configuration's `producer_timeout`.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// A heuristic analyzer run after the producer phase.
///
/// Heuristics run strictly sequentially, in registration order. Each may
/// read the full producer-phase output; none may read another heuristic's
/// output. The sequential contract exists to allow future dependency, not
/// to encourage hidden coupling.
#[async_trait]
pub trait HeuristicAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        detector_results: &DetectorResults,
        ctx: &AnalysisContext,
    ) -> Result<ProducerOutput, ProducerError>;
}

/// Inputs handed to the optional enhancement phase: everything earlier
/// phases produced, read-only.
#[derive(Debug)]
pub struct EnhancerInput<'a> {
    pub detector_results: &'a DetectorResults,
    pub heuristic_results: &'a DetectorResults,
    pub evaluations: &'a [RuleEvaluation],
    pub assessment: &'a ComplianceAssessment,
}

/// Output of the enhancement phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enhancement {
    /// Free-form insight data attached to the report.
    pub insights: Value,

    /// Extra recommendations merged into the final list.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Optional post-processing enhancer. Failure is recorded and never
/// affects the score computed in the rules phase.
#[async_trait]
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &str;

    async fn enhance(&self, input: EnhancerInput<'_>) -> Result<Enhancement, ProducerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn producer_output_clamps_score() {
        let output = ProducerOutput::new(json!({})).with_score(130.0);
        assert_eq!(output.score, Some(100.0));

        let output = ProducerOutput::new(json!({})).with_score(-5.0);
        assert_eq!(output.score, Some(0.0));
    }

    #[test]
    fn producer_output_round_trips_through_json() {
        let output = ProducerOutput::new(json!({ "images": { "missing_alt": [] } }))
            .with_score(92.0);
        let serialized = serde_json::to_string(&output).unwrap();
        let parsed: ProducerOutput = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.score, Some(92.0));
        assert!(parsed.recommendations.is_empty());
    }
}
