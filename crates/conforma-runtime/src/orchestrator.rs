//! Four-phase analysis orchestrator.
//!
//! The orchestrator runs:
//! 1. Detector fan-out: all producers concurrently, each under its own
//!    deadline; failures recorded per name.
//! 2. Heuristics: sequential, each reading the detector phase output.
//! 3. Rules: the deterministic engine evaluates the catalogue against
//!    every successful finding bag.
//! 4. Enhancement: optional post-processing; advisory only.
//!
//! Every phase tolerates partial failure. `analyze` always returns a
//! structurally complete [`Report`].

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tokio::time::timeout;

use conforma_core::{
    AnalysisContext, Catalog, ComplianceAssessment, ComplianceEngine, CustomScorer, EngineError,
    RecommendationBuilder, Recommendation, RuleEvaluation,
};

use crate::config::AnalysisConfig;
use crate::producers::{Enhancer, EnhancerInput, FindingProducer, HeuristicAnalyzer, ProducerError};
use crate::report::{DetectorResults, PhaseFlags, PhaseSummary, ProducerRecord, Report};

/// Recommendations bubbled from any single producer or heuristic are
/// capped before merging into the report.
const BUBBLED_RECOMMENDATION_CAP: usize = 8;

/// Builder for [`AnalysisOrchestrator`].
#[derive(Default)]
pub struct AnalysisOrchestratorBuilder {
    config: AnalysisConfig,
    producers: Vec<Arc<dyn FindingProducer>>,
    heuristics: Vec<Arc<dyn HeuristicAnalyzer>>,
    enhancer: Option<Arc<dyn Enhancer>>,
    scorers: Vec<Arc<dyn CustomScorer>>,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn producer(mut self, producer: Arc<dyn FindingProducer>) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn heuristic(mut self, heuristic: Arc<dyn HeuristicAnalyzer>) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    pub fn enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Register a scorer for `custom`-kind catalogue rules.
    pub fn scorer(mut self, scorer: Arc<dyn CustomScorer>) -> Self {
        self.scorers.push(scorer);
        self
    }

    /// Build the orchestrator. A broken catalogue (bad custom rule,
    /// duplicate id) does not fail construction; it is surfaced as the
    /// rules phase's zero-score fallback at run time.
    pub fn build(self) -> AnalysisOrchestrator {
        let engine = build_engine(&self.config, &self.scorers);
        if let Err(err) = &engine {
            tracing::warn!(error = %err, "catalogue rejected; rules phase will report zero");
        }
        AnalysisOrchestrator {
            config: self.config,
            producers: self.producers,
            heuristics: self.heuristics,
            enhancer: self.enhancer,
            engine,
        }
    }
}

fn build_engine(
    config: &AnalysisConfig,
    scorers: &[Arc<dyn CustomScorer>],
) -> Result<ComplianceEngine, EngineError> {
    let catalog = Catalog::builtin()?.merged(&config.custom_rules)?;
    let mut engine = ComplianceEngine::new(catalog, config.cache_config());
    for scorer in scorers {
        engine.register_scorer(Arc::clone(scorer));
    }
    Ok(engine)
}

/// Drives the four analysis phases and assembles the report.
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    producers: Vec<Arc<dyn FindingProducer>>,
    heuristics: Vec<Arc<dyn HeuristicAnalyzer>>,
    enhancer: Option<Arc<dyn Enhancer>>,
    engine: Result<ComplianceEngine, EngineError>,
}

impl AnalysisOrchestrator {
    pub fn builder() -> AnalysisOrchestratorBuilder {
        AnalysisOrchestratorBuilder::new()
    }

    /// The rules engine, when the catalogue was accepted.
    pub fn engine(&self) -> Option<&ComplianceEngine> {
        self.engine.as_ref().ok()
    }

    /// Run the full pipeline. Never fails: partial failures are recorded
    /// in the report, and anything fatal collapses into a terminal error
    /// report with `success == false`.
    pub async fn analyze(&self) -> Report {
        let ctx = self.config.context();
        match std::panic::AssertUnwindSafe(self.run_pipeline(&ctx))
            .catch_unwind()
            .await
        {
            Ok(report) => report,
            Err(_) => {
                tracing::error!("analysis pipeline panicked");
                Report::failure("analysis failed")
            }
        }
    }

    async fn run_pipeline(&self, ctx: &AnalysisContext) -> Report {
        let detector_results = self.run_detectors(ctx).await;
        let heuristic_results = self.run_heuristics(&detector_results, ctx).await;
        let (evaluations, assessment, rules_ok) =
            self.run_rules(&detector_results, &heuristic_results, ctx);

        let mut enhancement = None;
        let mut enhancement_flag = None;
        if let Some(enhancer) = &self.enhancer {
            let input = EnhancerInput {
                detector_results: &detector_results,
                heuristic_results: &heuristic_results,
                evaluations: &evaluations,
                assessment: &assessment,
            };
            match enhancer.enhance(input).await {
                Ok(result) => {
                    enhancement = Some(result);
                    enhancement_flag = Some(true);
                }
                Err(err) => {
                    tracing::warn!(enhancer = enhancer.name(), error = %err, "enhancement failed");
                    enhancement_flag = Some(false);
                }
            }
        }

        // Enhancer recommendations join the bubbled pool so they go
        // through the same sort/dedupe/cap path as everything else.
        let mut bubbled = self.bubbled_recommendations(&detector_results, &heuristic_results);
        if let Some(result) = &enhancement {
            bubbled.extend(
                result
                    .recommendations
                    .iter()
                    .take(BUBBLED_RECOMMENDATION_CAP)
                    .cloned(),
            );
        }
        let recommendations =
            RecommendationBuilder::new().build(&evaluations, &assessment, bubbled);

        let overall_score = Report::blend_scores(
            detector_results.average_score(),
            heuristic_results.average_score(),
            assessment.overall_score,
        );

        Report {
            success: true,
            error: None,
            overall_score,
            compliance_level: Report::score_bucket(overall_score),
            assessment,
            detector_results,
            heuristic_results,
            evaluations,
            recommendations,
            enhancement,
            phases: PhaseFlags {
                detectors: true,
                heuristics: true,
                rules: rules_ok,
                enhancement: enhancement_flag,
            },
            analyzed_at: chrono::Utc::now(),
        }
    }

    /// Phase 1: run every producer concurrently under its deadline.
    async fn run_detectors(&self, ctx: &AnalysisContext) -> DetectorResults {
        let phase_start = Instant::now();

        let tasks = self.producers.iter().map(|producer| {
            let producer = Arc::clone(producer);
            let ctx = ctx.clone();
            let deadline = producer.timeout().unwrap_or(self.config.producer_timeout);
            let name = producer.name().to_string();
            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let outcome = timeout(deadline, producer.produce(&ctx)).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(output)) => ProducerRecord::succeeded(output, elapsed_ms),
                    Ok(Err(err)) => ProducerRecord::failed(err.to_string(), elapsed_ms),
                    Err(_) => ProducerRecord::failed(
                        ProducerError::Timeout(deadline).to_string(),
                        elapsed_ms,
                    ),
                }
            });
            async move {
                let record = match handle.await {
                    Ok(record) => record,
                    Err(join_err) => ProducerRecord::failed(
                        format!("producer panicked: {join_err}"),
                        0,
                    ),
                };
                (name, record)
            }
        });

        let mut results = std::collections::BTreeMap::new();
        for (name, record) in join_all(tasks).await {
            if let Some(err) = &record.error {
                tracing::warn!(producer = %name, error = %err, "detector failed");
            }
            results.insert(name, record);
        }

        let summary =
            PhaseSummary::from_records(results.values(), phase_start.elapsed().as_millis() as u64);
        DetectorResults { results, summary }
    }

    /// Phase 2: run heuristics sequentially, each over the detector output.
    async fn run_heuristics(
        &self,
        detector_results: &DetectorResults,
        ctx: &AnalysisContext,
    ) -> DetectorResults {
        let phase_start = Instant::now();
        let mut results = std::collections::BTreeMap::new();

        for heuristic in &self.heuristics {
            let start = Instant::now();
            let record = match heuristic.analyze(detector_results, ctx).await {
                Ok(output) => {
                    ProducerRecord::succeeded(output, start.elapsed().as_millis() as u64)
                }
                Err(err) => {
                    tracing::warn!(heuristic = heuristic.name(), error = %err, "heuristic failed");
                    ProducerRecord::failed(err.to_string(), start.elapsed().as_millis() as u64)
                }
            };
            results.insert(heuristic.name().to_string(), record);
        }

        let summary =
            PhaseSummary::from_records(results.values(), phase_start.elapsed().as_millis() as u64);
        DetectorResults { results, summary }
    }

    /// Phase 3: evaluate the rule catalogue over every successful finding
    /// bag from the first two phases. A missing engine (rejected
    /// catalogue) degrades to a zero-score assessment.
    fn run_rules(
        &self,
        detector_results: &DetectorResults,
        heuristic_results: &DetectorResults,
        ctx: &AnalysisContext,
    ) -> (Vec<RuleEvaluation>, ComplianceAssessment, bool) {
        let engine = match &self.engine {
            Ok(engine) => engine,
            Err(err) => {
                tracing::warn!(error = %err, "rules phase degraded to zero-score fallback");
                return (vec![], ComplianceAssessment::zeroed(), false);
            }
        };

        let mut findings = detector_results.successful_findings();
        findings.extend(heuristic_results.successful_findings());

        let (evaluations, assessment) = engine.evaluate_findings(&findings, ctx);
        (evaluations, assessment, true)
    }

    fn bubbled_recommendations(
        &self,
        detector_results: &DetectorResults,
        heuristic_results: &DetectorResults,
    ) -> Vec<Recommendation> {
        let mut bubbled = detector_results.recommendations(BUBBLED_RECOMMENDATION_CAP);
        bubbled.extend(heuristic_results.recommendations(BUBBLED_RECOMMENDATION_CAP));
        bubbled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conforma_core::RuleDefinition;
    use serde_json::json;
    use std::time::Duration;

    use crate::producers::{ProducerError, ProducerOutput};

    struct StaticProducer {
        name: &'static str,
        findings: serde_json::Value,
        score: Option<f64>,
    }

    #[async_trait]
    impl FindingProducer for StaticProducer {
        fn name(&self) -> &str {
            self.name
        }

        async fn produce(&self, _ctx: &AnalysisContext) -> Result<ProducerOutput, ProducerError> {
            let mut output = ProducerOutput::new(self.findings.clone());
            output.score = self.score;
            Ok(output)
        }
    }

    struct FailingProducer;

    #[async_trait]
    impl FindingProducer for FailingProducer {
        fn name(&self) -> &str {
            "flaky_detector"
        }

        async fn produce(&self, _ctx: &AnalysisContext) -> Result<ProducerOutput, ProducerError> {
            Err(ProducerError::Failed("connection reset".to_string()))
        }
    }

    struct SlowProducer;

    #[async_trait]
    impl FindingProducer for SlowProducer {
        fn name(&self) -> &str {
            "slow_detector"
        }

        async fn produce(&self, _ctx: &AnalysisContext) -> Result<ProducerOutput, ProducerError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(ProducerOutput::new(json!({})))
        }

        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(50))
        }
    }

    fn contrast_producer() -> Arc<dyn FindingProducer> {
        Arc::new(StaticProducer {
            name: "contrast_analyzer",
            findings: json!({ "color_contrast": { "minimum_ratio": 5.2 } }),
            score: Some(90.0),
        })
    }

    #[tokio::test]
    async fn producer_failure_is_recorded_not_fatal() {
        let orchestrator = AnalysisOrchestrator::builder()
            .producer(contrast_producer())
            .producer(Arc::new(FailingProducer))
            .build();

        let report = orchestrator.analyze().await;
        assert!(report.success);
        assert_eq!(report.detector_results.summary.total, 2);
        assert_eq!(report.detector_results.summary.failed, 1);
        let failed = &report.detector_results.results["flaky_detector"];
        assert!(failed.error.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_producer_times_out() {
        let orchestrator = AnalysisOrchestrator::builder()
            .producer(Arc::new(SlowProducer))
            .build();

        let report = orchestrator.analyze().await;
        assert!(report.success);
        let record = &report.detector_results.results["slow_detector"];
        assert!(!record.is_success());
        assert!(record.error.as_deref().unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn bad_custom_rule_degrades_rules_phase() {
        let mut config = AnalysisConfig::default();
        // Replaces a builtin by id, then fails validation on the
        // non-positive weight.
        let rule: RuleDefinition = serde_json::from_value(json!({
            "id": "img-alt-missing",
            "name": "dup",
            "category": "images",
            "standard": "WCAG 2.1",
            "level": "A",
            "kind": "boolean",
            "expected": true,
            "data_path": "x",
            "weight": -1.0
        }))
        .unwrap();
        config.custom_rules = vec![rule];

        let orchestrator = AnalysisOrchestrator::builder()
            .config(config)
            .producer(contrast_producer())
            .build();

        let report = orchestrator.analyze().await;
        assert!(report.success);
        assert!(!report.phases.rules);
        assert_eq!(report.assessment.overall_score, 0.0);
        assert!(report.evaluations.is_empty());
    }
}
