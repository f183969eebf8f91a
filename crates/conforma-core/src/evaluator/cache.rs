//! Memoization cache for rule evaluations.
//!
//! The evaluator is deterministic over `(rule, finding snapshot, context)`,
//! so identical inputs can return the stored evaluation verbatim. The cache
//! is bounded (capacity + TTL) and exposes size and clear as part of the
//! engine's public contract.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::sync::Cache;
use serde_json::Value;

use crate::types::{AnalysisContext, RuleEvaluation};

/// Cache key for evaluation results.
#[derive(Clone, Debug)]
pub struct CacheKey {
    rule_id: String,
    findings_hash: u64,
    context_hash: u64,
}

impl CacheKey {
    /// Create a cache key from evaluation inputs.
    pub fn new(rule_id: &str, findings: &Value, ctx: &AnalysisContext) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            findings_hash: hash_findings(findings),
            context_hash: hash_context(ctx),
        }
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule_id.hash(state);
        self.findings_hash.hash(state);
        self.context_hash.hash(state);
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.rule_id == other.rule_id
            && self.findings_hash == other.findings_hash
            && self.context_hash == other.context_hash
    }
}

impl Eq for CacheKey {}

/// Bounded cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Evaluation cache using moka.
///
/// Safe for concurrent reads and writes; entries are written once per key
/// and read-only thereafter.
pub struct EvaluationCache {
    cache: Cache<CacheKey, RuleEvaluation>,
}

impl EvaluationCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }

    /// Get a cached evaluation.
    pub fn get(&self, key: &CacheKey) -> Option<RuleEvaluation> {
        self.cache.get(key)
    }

    /// Store an evaluation in the cache.
    pub fn insert(&self, key: CacheKey, evaluation: RuleEvaluation) {
        self.cache.insert(key, evaluation);
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for EvaluationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

// Hash helpers

fn hash_findings(findings: &Value) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    // serde_json renders object keys in map order, which is stable for a
    // given Value, so the serialized form is a faithful snapshot.
    findings.to_string().hash(&mut hasher);
    hasher.finish()
}

fn hash_context(ctx: &AnalysisContext) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    for standard in &ctx.standards {
        standard.hash(&mut hasher);
    }
    ctx.target_level.to_string().hash(&mut hasher);
    ctx.strict_mode.hash(&mut hasher);
    ctx.page_type.hash(&mut hasher);
    for (rule_id, weight) in &ctx.rule_weights {
        rule_id.hash(&mut hasher);
        weight.to_bits().hash(&mut hasher);
    }
    for (name, value) in &ctx.properties {
        name.hash(&mut hasher);
        value.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvaluationStatus, Level};
    use serde_json::json;

    fn sample_evaluation() -> RuleEvaluation {
        RuleEvaluation {
            rule_id: "contrast-aa".to_string(),
            rule_name: "Minimum contrast ratio (AA)".to_string(),
            standard: "WCAG 2.1".to_string(),
            level: Level::AA,
            detector: "contrast_analyzer".to_string(),
            status: EvaluationStatus::Passed,
            score: 100.0,
            weight: 3.0,
            issues: vec![],
            evidence: vec![],
        }
    }

    #[test]
    fn cache_miss_then_hit() {
        let cache = EvaluationCache::default();
        let findings = json!({ "color_contrast": { "minimum_ratio": 5.1 } });
        let ctx = AnalysisContext::default();

        let key = CacheKey::new("contrast-aa", &findings, &ctx);
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), sample_evaluation());
        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.score, 100.0);
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn different_findings_produce_different_keys() {
        let ctx = AnalysisContext::default();
        let a = CacheKey::new("contrast-aa", &json!({ "ratio": 5.0 }), &ctx);
        let b = CacheKey::new("contrast-aa", &json!({ "ratio": 3.0 }), &ctx);
        assert_ne!(a, b);
    }

    #[test]
    fn context_changes_invalidate_key() {
        let findings = json!({ "ratio": 5.0 });
        let relaxed = AnalysisContext::default();
        let strict = AnalysisContext {
            strict_mode: true,
            ..Default::default()
        };

        let a = CacheKey::new("contrast-aa", &findings, &relaxed);
        let b = CacheKey::new("contrast-aa", &findings, &strict);
        assert_ne!(a, b);
    }

    #[test]
    fn invalidate_all_clears() {
        let cache = EvaluationCache::default();
        let ctx = AnalysisContext::default();
        let key = CacheKey::new("r1", &json!({}), &ctx);
        cache.insert(key.clone(), sample_evaluation());
        cache.invalidate_all();
        assert!(cache.get(&key).is_none());
    }
}
