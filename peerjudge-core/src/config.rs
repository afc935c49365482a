// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Judge configuration
//!
//! [`JudgeConfig`] carries everything the orchestrator, tier engines, and
//! composite scorer need: enabled tiers, per-tier timeouts, similarity
//! weights, provider selection, composite metric weights, and input size
//! limits. `Default` reproduces the reference configuration; presets cover
//! common variations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Version string recorded on every [`crate::CompositeResult`].
pub const CONFIG_VERSION: &str = "1.0.0";

/// Strategy when a required tier produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Synthesize neutral placeholders for missing tiers as long as Tier 1
    /// succeeded.
    Tier1Only,
    /// No fallback; incomplete results fail composite scoring.
    None,
}

/// Weights applied to the three similarity scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub semantic: f64,
    pub cosine: f64,
    pub jaccard: f64,
}

/// Tier 1 (lexical/semantic similarity) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier1Config {
    /// Weighted similarity at or above this marks the task successful
    pub similarity_threshold: f64,
    /// Weights for the task-success decision
    pub success_weights: SimilarityWeights,
    /// Weights for the overall score (plus the time share)
    pub overall_weights: SimilarityWeights,
    /// Share of the overall score given to the time component
    pub time_weight: f64,
    /// TF-IDF vocabulary cap
    pub max_features: usize,
}

impl Default for Tier1Config {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            success_weights: SimilarityWeights {
                semantic: 0.5,
                cosine: 0.3,
                jaccard: 0.2,
            },
            overall_weights: SimilarityWeights {
                semantic: 0.4,
                cosine: 0.3,
                jaccard: 0.2,
            },
            time_weight: 0.1,
            max_features: 5000,
        }
    }
}

/// Tier 2 (LLM-as-judge) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier2Config {
    /// "auto" selects the first provider with an API key in the
    /// environment; otherwise "openai" or "anthropic"
    pub provider: String,
    pub model: String,
    pub fallback_provider: String,
    pub fallback_model: String,
    /// Per-assessment timeout in seconds
    pub assessment_timeout_seconds: f64,
    /// Paper text is truncated to this many characters for cost control
    pub paper_excerpt_length: usize,
    pub technical_accuracy_weight: f64,
    pub constructiveness_weight: f64,
    pub planning_rationality_weight: f64,
}

impl Default for Tier2Config {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            model: "gpt-4o-mini".to_string(),
            fallback_provider: "anthropic".to_string(),
            fallback_model: "claude-3-5-haiku-20241022".to_string(),
            assessment_timeout_seconds: 30.0,
            paper_excerpt_length: 2000,
            technical_accuracy_weight: 0.4,
            constructiveness_weight: 0.3,
            planning_rationality_weight: 0.3,
        }
    }
}

/// Tier 3 (graph analysis) metric weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier3Config {
    pub path_convergence_weight: f64,
    pub tool_selection_weight: f64,
    pub centrality_weight: f64,
    pub balance_weight: f64,
}

impl Default for Tier3Config {
    fn default() -> Self {
        Self {
            path_convergence_weight: 0.25,
            tool_selection_weight: 0.25,
            centrality_weight: 0.25,
            balance_weight: 0.25,
        }
    }
}

/// Composite scoring weights and recommendation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Metric name -> weight; the default six metrics carry 0.167 each
    pub metric_weights: BTreeMap<String, f64>,
    pub accept_threshold: f64,
    pub weak_accept_threshold: f64,
    pub weak_reject_threshold: f64,
    pub accept_weight: f64,
    pub weak_accept_weight: f64,
    pub weak_reject_weight: f64,
    pub reject_weight: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        let metric_weights = BTreeMap::from([
            ("time_taken".to_string(), 0.167),
            ("task_success".to_string(), 0.167),
            ("coordination_quality".to_string(), 0.167),
            ("tool_efficiency".to_string(), 0.167),
            ("planning_rationality".to_string(), 0.167),
            ("output_similarity".to_string(), 0.167),
        ]);
        Self {
            metric_weights,
            accept_threshold: 0.8,
            weak_accept_threshold: 0.6,
            weak_reject_threshold: 0.4,
            accept_weight: 1.0,
            weak_accept_weight: 0.7,
            weak_reject_weight: -0.7,
            reject_weight: -1.0,
        }
    }
}

/// Input size bounds enforced before any tier runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    pub max_agent_output_bytes: usize,
    pub max_paper_bytes: usize,
    pub max_review_bytes: usize,
    pub max_reference_texts: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_agent_output_bytes: 100 * 1024,
            max_paper_bytes: 50 * 1024,
            max_review_bytes: 50 * 1024,
            max_reference_texts: 10,
        }
    }
}

/// Top-level judge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Tiers that will execute, in ascending order
    pub tiers_enabled: BTreeSet<u8>,
    pub tier1_max_seconds: f64,
    pub tier2_max_seconds: f64,
    pub tier3_max_seconds: f64,
    /// Soft budget for the whole pipeline; overruns only warn
    pub total_max_seconds: f64,
    pub fallback_strategy: FallbackStrategy,
    pub tier1: Tier1Config,
    pub tier2: Tier2Config,
    pub tier3: Tier3Config,
    pub composite: CompositeConfig,
    pub limits: InputLimits,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            tiers_enabled: BTreeSet::from([1, 2, 3]),
            tier1_max_seconds: 1.0,
            tier2_max_seconds: 30.0,
            tier3_max_seconds: 15.0,
            total_max_seconds: 45.0,
            fallback_strategy: FallbackStrategy::Tier1Only,
            tier1: Tier1Config::default(),
            tier2: Tier2Config::default(),
            tier3: Tier3Config::default(),
            composite: CompositeConfig::default(),
            limits: InputLimits::default(),
        }
    }
}

impl JudgeConfig {
    /// Configuration with only the deterministic tiers (1 and 3) enabled.
    pub fn without_llm_judge() -> Self {
        let mut config = Self::default();
        config.tiers_enabled = BTreeSet::from([1, 3]);
        config
    }

    pub fn is_tier_enabled(&self, tier: u8) -> bool {
        self.tiers_enabled.contains(&tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_all_tiers() {
        let config = JudgeConfig::default();
        assert!(config.is_tier_enabled(1));
        assert!(config.is_tier_enabled(2));
        assert!(config.is_tier_enabled(3));
        assert_eq!(config.fallback_strategy, FallbackStrategy::Tier1Only);
    }

    #[test]
    fn test_default_composite_weights_sum_to_one() {
        let config = CompositeConfig::default();
        let total: f64 = config.metric_weights.values().sum();
        assert!((total - 1.0).abs() < 1e-2, "weights sum to {total}");
        assert_eq!(config.metric_weights.len(), 6);
    }

    #[test]
    fn test_without_llm_judge_disables_tier2() {
        let config = JudgeConfig::without_llm_judge();
        assert!(!config.is_tier_enabled(2));
        assert!(config.is_tier_enabled(1));
        assert!(config.is_tier_enabled(3));
    }

    #[test]
    fn test_config_round_trip() {
        let config = JudgeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: JudgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
