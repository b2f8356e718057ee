//! Declarative consolidation rules
//!
//! Rules are immutable policy loaded from configuration. The miners never read
//! rules directly; [`MinerThresholds::from_rules`] resolves the first rule that
//! targets each miner and falls back to built-in defaults when none does.

use super::pattern::PatternType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted time-based threshold: one year
const MAX_TIME_THRESHOLD_SECS: f64 = 365.0 * 86_400.0;

/// What a rule's threshold measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Threshold is a time span in seconds
    TimeBased,
    /// Threshold is a count of related memories
    FrequencyBased,
    /// Threshold is an importance score
    ImportanceBased,
}

/// How matched memories are turned into knowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    PatternExtraction,
    ConceptClustering,
    KnowledgeSynthesis,
}

/// A single consolidation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationRule {
    pub trigger_type: TriggerType,
    pub threshold: f64,
    /// Importance bonus granted by this rule (0.0–1.0)
    pub importance_boost: f32,
    /// Pattern types the rule applies to
    pub pattern_types: Vec<PatternType>,
    pub strategy: Strategy,
}

impl ConsolidationRule {
    /// Whether the rule targets `pattern_type`
    pub fn applies_to(&self, pattern_type: PatternType) -> bool {
        self.pattern_types.contains(&pattern_type)
    }

    /// Reject negative or non-finite thresholds and out-of-range boosts.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(Error::Config(format!(
                "rule threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        if self.trigger_type == TriggerType::TimeBased && self.threshold > MAX_TIME_THRESHOLD_SECS {
            return Err(Error::Config(format!(
                "time-based rule threshold must be at most {} seconds, got {}",
                MAX_TIME_THRESHOLD_SECS, self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.importance_boost) {
            return Err(Error::Config(format!(
                "rule importance_boost must be within 0.0..=1.0, got {}",
                self.importance_boost
            )));
        }
        if self.pattern_types.is_empty() {
            return Err(Error::Config("rule must name at least one pattern type".to_string()));
        }
        Ok(())
    }
}

/// Default rule set.
pub fn default_rules() -> Vec<ConsolidationRule> {
    vec![
        ConsolidationRule {
            trigger_type: TriggerType::TimeBased,
            threshold: 3600.0,
            importance_boost: 0.1,
            pattern_types: vec![PatternType::Temporal, PatternType::Causal],
            strategy: Strategy::PatternExtraction,
        },
        ConsolidationRule {
            trigger_type: TriggerType::FrequencyBased,
            threshold: 3.0,
            importance_boost: 0.2,
            pattern_types: vec![PatternType::Conceptual],
            strategy: Strategy::ConceptClustering,
        },
        ConsolidationRule {
            trigger_type: TriggerType::FrequencyBased,
            threshold: 2.0,
            importance_boost: 0.2,
            pattern_types: vec![PatternType::Behavioral],
            strategy: Strategy::ConceptClustering,
        },
        ConsolidationRule {
            trigger_type: TriggerType::ImportanceBased,
            threshold: 0.8,
            importance_boost: 0.3,
            pattern_types: vec![PatternType::Causal, PatternType::Conceptual],
            strategy: Strategy::KnowledgeSynthesis,
        },
    ]
}

/// Concrete thresholds consumed by the miners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinerThresholds {
    /// Consecutive entries must be strictly closer than this
    pub temporal_max_gap: Duration,
    /// Minimum members of a concept group for a conceptual pattern
    pub conceptual_min_group: usize,
    /// Minimum action-bearing members of a concept group for a behavioral pattern
    pub behavioral_min_group: usize,
}

impl Default for MinerThresholds {
    fn default() -> Self {
        Self {
            temporal_max_gap: Duration::from_secs(3600),
            conceptual_min_group: 3,
            behavioral_min_group: 2,
        }
    }
}

impl MinerThresholds {
    /// Resolve thresholds from a rule set.
    pub fn from_rules(rules: &[ConsolidationRule]) -> Self {
        let defaults = Self::default();
        let lookup = |trigger: TriggerType, pattern_type: PatternType| {
            rules
                .iter()
                .find(|r| r.trigger_type == trigger && r.applies_to(pattern_type))
                .map(|r| r.threshold)
                .filter(|t| t.is_finite() && *t >= 0.0)
        };

        Self {
            temporal_max_gap: lookup(TriggerType::TimeBased, PatternType::Temporal)
                .and_then(|t| Duration::try_from_secs_f64(t).ok())
                .unwrap_or(defaults.temporal_max_gap),
            conceptual_min_group: lookup(TriggerType::FrequencyBased, PatternType::Conceptual)
                .map(|t| t.ceil() as usize)
                .unwrap_or(defaults.conceptual_min_group),
            behavioral_min_group: lookup(TriggerType::FrequencyBased, PatternType::Behavioral)
                .map(|t| t.ceil() as usize)
                .unwrap_or(defaults.behavioral_min_group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_resolve_to_defaults() {
        assert_eq!(MinerThresholds::from_rules(&default_rules()), MinerThresholds::default());
        assert_eq!(MinerThresholds::from_rules(&[]), MinerThresholds::default());
    }

    #[test]
    fn test_rules_override_thresholds() {
        let rules = vec![
            ConsolidationRule {
                trigger_type: TriggerType::TimeBased,
                threshold: 600.0,
                importance_boost: 0.1,
                pattern_types: vec![PatternType::Temporal],
                strategy: Strategy::PatternExtraction,
            },
            ConsolidationRule {
                trigger_type: TriggerType::FrequencyBased,
                threshold: 4.5,
                importance_boost: 0.2,
                pattern_types: vec![PatternType::Conceptual, PatternType::Behavioral],
                strategy: Strategy::ConceptClustering,
            },
        ];

        let thresholds = MinerThresholds::from_rules(&rules);
        assert_eq!(thresholds.temporal_max_gap, Duration::from_secs(600));
        assert_eq!(thresholds.conceptual_min_group, 5);
        assert_eq!(thresholds.behavioral_min_group, 5);
    }

    #[test]
    fn test_validate() {
        for rule in default_rules() {
            rule.validate().unwrap();
        }

        let mut bad = default_rules().remove(0);
        bad.threshold = -1.0;
        assert!(bad.validate().is_err());

        let mut bad = default_rules().remove(0);
        bad.importance_boost = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = default_rules().remove(0);
        bad.pattern_types.clear();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_oversized_time_threshold() {
        let mut huge = default_rules().remove(0);
        huge.threshold = 1e20;
        assert!(matches!(huge.validate(), Err(Error::Config(_))));

        // unvalidated rules fall back instead of panicking
        let thresholds = MinerThresholds::from_rules(&[huge]);
        assert_eq!(thresholds.temporal_max_gap, MinerThresholds::default().temporal_max_gap);

        let mut year = default_rules().remove(0);
        year.threshold = MAX_TIME_THRESHOLD_SECS;
        year.validate().unwrap();

        // frequency thresholds are counts, not durations
        let mut frequent = default_rules().remove(1);
        frequent.threshold = 1e9;
        frequent.validate().unwrap();
    }

    #[test]
    fn test_rule_serialization() {
        let rule = default_rules().remove(1);
        let toml = toml::to_string(&rule).unwrap();
        assert!(toml.contains("trigger_type = \"frequency_based\""));
        assert!(toml.contains("strategy = \"concept_clustering\""));
        let back: ConsolidationRule = toml::from_str(&toml).unwrap();
        assert_eq!(back, rule);
    }
}
