//! Rule evaluator: kind dispatch, partial-credit scoring, memoization.
//!
//! Evaluation is deterministic given the same `(rule, finding snapshot,
//! context)` triple; the cache in [`cache`] exploits this to return stored
//! evaluations verbatim on repeat inputs.

mod cache;

pub use cache::{CacheConfig, CacheKey, EvaluationCache};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::catalog::{
    ChildKind, Combinator, ComparisonOp, Condition, CountOp, RuleDefinition, RuleKind,
};
use crate::evidence::Evidence;
use crate::path;
use crate::types::{AnalysisContext, EvaluationStatus, Issue, RuleEvaluation, Severity};

/// Outcome of a pluggable custom scorer.
#[derive(Debug, Clone)]
pub struct CustomOutcome {
    pub status: EvaluationStatus,
    /// Score in [0, 100]; clamped by the evaluator.
    pub score: f64,
    pub issues: Vec<Issue>,
    pub evidence: Vec<Evidence>,
}

/// Pluggable scoring logic for `custom`-kind rules.
///
/// Scorers are registered by name at engine construction; a rule whose
/// `scorer` field names an unregistered scorer evaluates to `error`,
/// never to a silent pass.
pub trait CustomScorer: Send + Sync {
    /// Name the catalogue refers to this scorer by.
    fn name(&self) -> &str;

    /// Produce a verdict for one rule against one finding bag.
    fn evaluate(
        &self,
        rule: &RuleDefinition,
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> CustomOutcome;
}

/// Intermediate verdict shared by all rule kinds before the final
/// `RuleEvaluation` is assembled.
struct Verdict {
    status: EvaluationStatus,
    score: f64,
    issues: Vec<Issue>,
    evidence: Vec<Evidence>,
}

impl Verdict {
    fn passed(evidence: Vec<Evidence>) -> Self {
        Self {
            status: EvaluationStatus::Passed,
            score: 100.0,
            issues: vec![],
            evidence,
        }
    }

    fn not_applicable(evidence: Vec<Evidence>) -> Self {
        Self {
            status: EvaluationStatus::NotApplicable,
            score: 0.0,
            issues: vec![],
            evidence,
        }
    }

    fn error(message: String, recommendation: String) -> Self {
        Self {
            status: EvaluationStatus::Error,
            score: 0.0,
            issues: vec![Issue {
                severity: Severity::Low,
                message,
                recommendation,
            }],
            evidence: vec![],
        }
    }
}

/// Evaluates one rule definition against one finding snapshot plus context.
pub struct RuleEvaluator {
    cache: EvaluationCache,
    scorers: HashMap<String, Arc<dyn CustomScorer>>,
}

impl RuleEvaluator {
    pub fn new(cache_config: CacheConfig) -> Self {
        Self {
            cache: EvaluationCache::new(cache_config),
            scorers: HashMap::new(),
        }
    }

    /// Register a custom scorer. Later registrations with the same name win.
    pub fn register_scorer(&mut self, scorer: Arc<dyn CustomScorer>) {
        self.scorers.insert(scorer.name().to_string(), scorer);
    }

    /// The memoization cache (size/clear are part of the engine contract).
    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// Evaluate one rule against one producer's finding bag.
    ///
    /// Applicability (detector allow-list, page-type contexts) is checked
    /// before the cache so the key stays independent of the producer name.
    pub fn evaluate(
        &self,
        rule: &RuleDefinition,
        detector: &str,
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> RuleEvaluation {
        if !rule.applies_to_detector(detector)
            || !rule.applies_to_context(ctx.page_type.as_deref())
        {
            return self.assemble(rule, detector, ctx, Verdict::not_applicable(vec![]));
        }

        let key = CacheKey::new(&rule.id, findings, ctx);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(rule_id = %rule.id, "evaluation cache hit");
            // The key excludes the producer name, so a hit may have been
            // computed for another producer; restamp before returning.
            return RuleEvaluation {
                detector: detector.to_string(),
                ..hit
            };
        }

        let verdict = self.dispatch(rule, findings, ctx);
        let evaluation = self.assemble(rule, detector, ctx, verdict);
        self.cache.insert(key, evaluation.clone());
        evaluation
    }

    /// Exhaustive dispatch over the rule kind.
    fn dispatch(&self, rule: &RuleDefinition, findings: &Value, ctx: &AnalysisContext) -> Verdict {
        match &rule.kind {
            RuleKind::Threshold {
                threshold,
                operator,
            }
            | RuleKind::Percentage {
                threshold,
                operator,
            } => self.numeric_verdict(rule, &rule.data_path, *threshold, *operator, findings, ctx),

            RuleKind::Boolean { expected } => {
                self.boolean_verdict(rule, &rule.data_path, *expected, findings)
            }

            RuleKind::Count {
                threshold,
                operator,
            } => self.count_verdict(rule, &rule.data_path, *threshold, *operator, findings, ctx),

            RuleKind::Conditional { condition, rule: child } => {
                let (held, gate) = condition_holds(condition, findings, ctx);
                if !held {
                    return Verdict::not_applicable(vec![gate]);
                }

                let child_path = child.data_path.as_deref().unwrap_or(&rule.data_path);
                let mut verdict = self.child_verdict(rule, &child.kind, child_path, findings, ctx);
                // The gate check is recorded ahead of the child's evidence.
                verdict.evidence.insert(0, gate);
                verdict
            }

            RuleKind::Composite { combinator, rules } => {
                self.composite_verdict(rule, *combinator, rules, findings, ctx)
            }

            RuleKind::Custom { scorer } => match self.scorers.get(scorer) {
                Some(custom) => {
                    let outcome = custom.evaluate(rule, findings, ctx);
                    Verdict {
                        status: outcome.status,
                        score: outcome.score.clamp(0.0, 100.0),
                        issues: outcome.issues,
                        evidence: outcome.evidence,
                    }
                }
                None => Verdict::error(
                    format!("no scorer registered under `{}`", scorer),
                    format!("Register a custom scorer named `{}` before analysis.", scorer),
                ),
            },
        }
    }

    /// Threshold/percentage mechanics: pass scores 100; failures receive
    /// distance-based partial credit in [0, 50], rewarding near-misses.
    fn numeric_verdict(
        &self,
        rule: &RuleDefinition,
        data_path: &str,
        threshold: f64,
        operator: ComparisonOp,
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> Verdict {
        let Some(actual) = path::resolve_number(findings, data_path) else {
            return Verdict::not_applicable(vec![Evidence::missing(data_path)]);
        };

        let evidence = vec![Evidence::comparison(
            format!("`{}` must be {} {}", data_path, operator.describe(), threshold),
            data_path,
            actual.into(),
            threshold.into(),
        )];

        if operator.holds(actual, threshold) {
            return Verdict::passed(evidence);
        }

        let distance = (actual - threshold).abs();
        let score = if ctx.strict_mode {
            0.0
        } else {
            ((1.0 - (distance / threshold.max(100.0)).min(1.0)) * 50.0).round()
        };

        let severity = rule
            .severity
            .unwrap_or_else(|| derive_severity(actual, threshold));
        let message = format!(
            "{}: expected `{}` {} {}, found {}",
            rule.name,
            data_path,
            operator.describe(),
            threshold,
            actual
        );
        let recommendation = rule.recommendation.clone().unwrap_or_else(|| {
            format!(
                "Bring `{}` to {} {} (currently {}).",
                data_path,
                operator.describe(),
                threshold,
                actual
            )
        });

        Verdict {
            status: EvaluationStatus::Failed,
            score,
            issues: vec![Issue {
                severity,
                message,
                recommendation,
            }],
            evidence,
        }
    }

    /// Boolean mechanics: exact equality, no partial credit.
    fn boolean_verdict(
        &self,
        rule: &RuleDefinition,
        data_path: &str,
        expected: bool,
        findings: &Value,
    ) -> Verdict {
        let Some(actual) = path::resolve(findings, data_path) else {
            return Verdict::not_applicable(vec![Evidence::missing(data_path)]);
        };

        let evidence = vec![Evidence::comparison(
            format!("`{}` must equal {}", data_path, expected),
            data_path,
            actual.clone(),
            Value::Bool(expected),
        )];

        if *actual == Value::Bool(expected) {
            return Verdict::passed(evidence);
        }

        // A boolean mismatch is a total deviation.
        let severity = rule.severity.unwrap_or_else(|| derive_severity(0.0, 1.0));
        let recommendation = rule.recommendation.clone().unwrap_or_else(|| {
            format!("Ensure `{}` is {} (currently {}).", data_path, expected, actual)
        });

        Verdict {
            status: EvaluationStatus::Failed,
            score: 0.0,
            issues: vec![Issue {
                severity,
                message: format!(
                    "{}: expected `{}` to be {}, found {}",
                    rule.name, data_path, expected, actual
                ),
                recommendation,
            }],
            evidence,
        }
    }

    /// Count mechanics: partial credit decays linearly with the gap, 10
    /// points per unit for max/min and 20 per unit for exact, floored at 0.
    fn count_verdict(
        &self,
        rule: &RuleDefinition,
        data_path: &str,
        threshold: usize,
        operator: CountOp,
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> Verdict {
        let value = match path::resolve(findings, data_path) {
            None => return Verdict::not_applicable(vec![Evidence::missing(data_path)]),
            Some(v) => v,
        };

        let Value::Array(items) = value else {
            return Verdict::error(
                format!(
                    "{}: expected an array at `{}`, found {}",
                    rule.name,
                    data_path,
                    json_kind(value)
                ),
                format!("Verify the detector emits an array at `{}`.", data_path),
            );
        };

        let len = items.len();
        let evidence = vec![Evidence::comparison(
            format!(
                "`{}` must contain {} {} item(s)",
                data_path,
                operator.describe(),
                threshold
            ),
            data_path,
            (len as u64).into(),
            (threshold as u64).into(),
        )];

        if operator.holds(len, threshold) {
            return Verdict::passed(evidence);
        }

        let gap = len.abs_diff(threshold) as f64;
        let per_unit = match operator {
            CountOp::Max | CountOp::Min => 10.0,
            CountOp::Exact => 20.0,
        };
        let score = if ctx.strict_mode {
            0.0
        } else {
            (100.0 - gap * per_unit).max(0.0)
        };

        let severity = rule
            .severity
            .unwrap_or_else(|| derive_severity(len as f64, threshold as f64));
        let recommendation = rule.recommendation.clone().unwrap_or_else(|| {
            format!(
                "Reduce or raise `{}` to {} {} item(s) (currently {}).",
                data_path,
                operator.describe(),
                threshold,
                len
            )
        });

        Verdict {
            status: EvaluationStatus::Failed,
            score,
            issues: vec![Issue {
                severity,
                message: format!(
                    "{}: expected {} {} item(s) at `{}`, found {}",
                    rule.name,
                    operator.describe(),
                    threshold,
                    data_path,
                    len
                ),
                recommendation,
            }],
            evidence,
        }
    }

    /// Evaluation logic a conditional or composite child delegates to.
    fn child_verdict(
        &self,
        rule: &RuleDefinition,
        kind: &ChildKind,
        data_path: &str,
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> Verdict {
        match kind {
            ChildKind::Threshold {
                threshold,
                operator,
            } => self.numeric_verdict(rule, data_path, *threshold, *operator, findings, ctx),
            ChildKind::Boolean { expected } => {
                self.boolean_verdict(rule, data_path, *expected, findings)
            }
            ChildKind::Count {
                threshold,
                operator,
            } => self.count_verdict(rule, data_path, *threshold, *operator, findings, ctx),
        }
    }

    /// Composite mechanics: weight-blended child scores; `all` passes iff
    /// every applicable child passes, `any` iff at least one does. Children
    /// that are `not_applicable` are excluded; all-excluded makes the whole
    /// composite `not_applicable`.
    fn composite_verdict(
        &self,
        rule: &RuleDefinition,
        combinator: Combinator,
        children: &[crate::catalog::ChildRule],
        findings: &Value,
        ctx: &AnalysisContext,
    ) -> Verdict {
        let mut applicable: Vec<(Verdict, f64)> = Vec::new();
        let mut gate_evidence: Vec<Evidence> = Vec::new();

        for child in children {
            let child_path = child.data_path.as_deref().unwrap_or(&rule.data_path);
            let verdict = self.child_verdict(rule, &child.kind, child_path, findings, ctx);
            if verdict.status == EvaluationStatus::NotApplicable {
                gate_evidence.extend(verdict.evidence);
            } else {
                applicable.push((verdict, child.weight));
            }
        }

        if applicable.is_empty() {
            return Verdict::not_applicable(gate_evidence);
        }

        let weight_sum: f64 = applicable.iter().map(|(_, w)| w).sum();
        let blended: f64 = applicable
            .iter()
            .map(|(v, w)| v.score * w)
            .sum::<f64>()
            / weight_sum;

        let passed = match combinator {
            Combinator::All => applicable
                .iter()
                .all(|(v, _)| v.status == EvaluationStatus::Passed),
            Combinator::Any => applicable
                .iter()
                .any(|(v, _)| v.status == EvaluationStatus::Passed),
        };

        let mut issues = Vec::new();
        let mut evidence = gate_evidence;
        for (verdict, _) in applicable {
            issues.extend(verdict.issues);
            evidence.extend(verdict.evidence);
        }

        if passed {
            // `any` can pass while some children failed; keep their issues
            // as advisory output but report the rule as passed.
            Verdict {
                status: EvaluationStatus::Passed,
                score: blended.round(),
                issues,
                evidence,
            }
        } else {
            Verdict {
                status: EvaluationStatus::Failed,
                score: blended.round(),
                issues,
                evidence,
            }
        }
    }

    /// Assemble the final immutable evaluation from a verdict.
    fn assemble(
        &self,
        rule: &RuleDefinition,
        detector: &str,
        ctx: &AnalysisContext,
        verdict: Verdict,
    ) -> RuleEvaluation {
        RuleEvaluation {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            standard: rule.standard.clone(),
            level: rule.level,
            detector: detector.to_string(),
            status: verdict.status,
            score: verdict.score.clamp(0.0, 100.0),
            weight: ctx.weight_for(&rule.id, rule.weight),
            issues: verdict.issues,
            evidence: verdict.evidence,
        }
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Evaluate a conditional rule's gate, returning the verdict and the
/// evidence record documenting the check.
fn condition_holds(
    condition: &Condition,
    findings: &Value,
    ctx: &AnalysisContext,
) -> (bool, Evidence) {
    match condition {
        Condition::Exists { path } => {
            let held = path::resolve(findings, path).is_some();
            (
                held,
                Evidence::condition(format!("condition: `{}` exists", path), path, held),
            )
        }
        Condition::Equals { path, value } => {
            let held = path::resolve(findings, path) == Some(value);
            (
                held,
                Evidence::condition(
                    format!("condition: `{}` equals {}", path, value),
                    path,
                    held,
                ),
            )
        }
        Condition::ContextEquals { property, value } => {
            let actual = ctx.property(property);
            let held = actual.as_ref() == Some(value);
            (
                held,
                Evidence::from_context(
                    format!("condition: context `{}` equals {}", property, value),
                    property,
                    actual,
                    value.clone(),
                ),
            )
        }
    }
}

/// Severity from the relative deviation between actual and expected values:
/// more than 50% deviation is high, more than 25% medium, otherwise low.
fn derive_severity(actual: f64, expected: f64) -> Severity {
    let deviation = if expected.abs() > f64::EPSILON {
        ((actual - expected) / expected).abs()
    } else if actual.abs() > f64::EPSILON {
        1.0
    } else {
        0.0
    };

    if deviation > 0.5 {
        Severity::High
    } else if deviation > 0.25 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
