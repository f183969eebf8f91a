//! Analysis run configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use conforma_core::{AnalysisContext, CacheConfig, Level, RuleDefinition};

/// Configuration for one orchestrated analysis run.
///
/// Deserializes from YAML or JSON; durations use humantime strings
/// (`"30s"`, `"1h"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Standards to evaluate; rules outside this set are skipped.
    pub standards: Vec<String>,

    /// Target conformance level for the run.
    pub target_level: Level,

    /// Disable partial credit: any failed check scores 0.
    pub strict_mode: bool,

    /// Extra rules merged into the builtin catalogue; a custom rule with
    /// a builtin's id replaces it.
    pub custom_rules: Vec<RuleDefinition>,

    /// Per-rule weight overrides, by rule id.
    pub rule_weights: BTreeMap<String, f64>,

    /// When false, page-type context tags are ignored and context-gated
    /// rules evaluate as unrestricted.
    pub contextual_rules: bool,

    /// Page type tag matched against rule context lists.
    pub page_type: Option<String>,

    /// Free-form context properties readable by conditional rules.
    pub properties: BTreeMap<String, Value>,

    /// Fallback deadline for producers that do not declare their own.
    #[serde(with = "humantime_serde")]
    pub producer_timeout: Duration,

    /// Evaluation cache capacity.
    pub cache_max_entries: u64,

    /// Evaluation cache entry time-to-live.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            standards: vec![
                "WCAG 2.1".to_string(),
                "Section 508".to_string(),
                "EN 301 549".to_string(),
            ],
            target_level: Level::AA,
            strict_mode: false,
            custom_rules: vec![],
            rule_weights: BTreeMap::new(),
            contextual_rules: true,
            page_type: None,
            properties: BTreeMap::new(),
            producer_timeout: Duration::from_secs(30),
            cache_max_entries: 10_000,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl AnalysisConfig {
    /// Build the evaluation context handed to the engine.
    pub fn context(&self) -> AnalysisContext {
        let mut ctx = AnalysisContext::new(self.standards.clone(), self.target_level);
        ctx.strict_mode = self.strict_mode;
        ctx.rule_weights = self.rule_weights.clone();
        ctx.properties = self.properties.clone();
        if self.contextual_rules {
            ctx.page_type = self.page_type.clone();
        }
        ctx
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache_max_entries,
            ttl: self.cache_ttl,
        }
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(de)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_standards() {
        let config = AnalysisConfig::default();
        assert_eq!(config.standards.len(), 3);
        assert_eq!(config.target_level, Level::AA);
        assert!(!config.strict_mode);
        assert_eq!(config.producer_timeout, Duration::from_secs(30));
    }

    #[test]
    fn durations_parse_from_humantime_strings() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{ "producer_timeout": "45s", "cache_ttl": "2h" }"#,
        )
        .unwrap();
        assert_eq!(config.producer_timeout, Duration::from_secs(45));
        assert_eq!(config.cache_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn context_drops_page_type_when_contextual_rules_disabled() {
        let mut config = AnalysisConfig::default();
        config.page_type = Some("mobile".to_string());
        config.contextual_rules = false;
        assert_eq!(config.context().page_type, None);

        config.contextual_rules = true;
        assert_eq!(config.context().page_type.as_deref(), Some("mobile"));
    }
}
