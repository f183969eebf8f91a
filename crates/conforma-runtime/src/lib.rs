//! # conforma-runtime
//!
//! Async orchestration layer for Conforma accessibility analysis.
//!
//! The runtime wires user-supplied detectors, heuristics, and an optional
//! enhancer around the deterministic rules engine in `conforma-core`, and
//! folds everything into a single report:
//!
//! 1. **Detectors** run concurrently, each under a deadline.
//! 2. **Heuristics** run sequentially over the detector output.
//! 3. **Rules** evaluate the catalogue against every finding bag.
//! 4. **Enhancement** optionally post-processes the assembled results.
//!
//! Every phase tolerates partial failure: a crashed, erroring, or
//! timed-out component is recorded by name in the report and the run
//! continues with what succeeded.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use conforma_runtime::{AnalysisConfig, AnalysisOrchestrator};
//!
//! let orchestrator = AnalysisOrchestrator::builder()
//!     .config(AnalysisConfig::default())
//!     .producer(Arc::new(ContrastDetector::new(page)))
//!     .producer(Arc::new(StructureDetector::new(page)))
//!     .build();
//!
//! let report = orchestrator.analyze().await;
//! println!("{} ({})", report.overall_score, report.assessment.letter_grade);
//! ```

pub mod config;
pub mod orchestrator;
pub mod producers;
pub mod report;

pub use config::AnalysisConfig;
pub use orchestrator::{AnalysisOrchestrator, AnalysisOrchestratorBuilder};
pub use producers::{
    Enhancement, Enhancer, EnhancerInput, FindingProducer, HeuristicAnalyzer, ProducerError,
    ProducerOutput,
};
pub use report::{DetectorResults, PhaseFlags, PhaseSummary, ProducerRecord, Report};

// Re-export the core surface callers need to build configs and scorers.
pub use conforma_core::{
    AnalysisContext, Catalog, ComplianceAssessment, ComplianceEngine, ComplianceLevel,
    CustomOutcome, CustomScorer, Effort, EvaluationStatus, Impact, Issue, Level, Priority,
    Recommendation, RuleDefinition, RuleEvaluation, Severity,
};
