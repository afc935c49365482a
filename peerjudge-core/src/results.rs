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

//! Result types for the three evaluation tiers, the composite verdict, and
//! cross-runtime baseline comparisons.
//!
//! All scalar scores are normalized to [0,1]. Constructors clamp inputs so
//! floating-point drift upstream (e.g., a cosine similarity of
//! 1.0000000000000002) can never produce an out-of-range result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        warn!("score is NaN; treating as 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!(value, "score outside [0,1]; clamping");
    }
    value.clamp(0.0, 1.0)
}

/// Lexical/semantic similarity metrics (Tier 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier1Result {
    /// TF-IDF cosine similarity against the best-matching reference
    pub cosine_score: f64,
    /// Word-set Jaccard similarity against the best-matching reference
    pub jaccard_score: f64,
    /// Embedding-based similarity, or the cosine fallback
    pub semantic_score: f64,
    /// Normalized execution-time score (`exp(-duration)`)
    pub time_score: f64,
    /// Binary success indicator (0.0 or 1.0)
    pub task_success: f64,
    /// Weighted similarity score
    pub overall_score: f64,
    /// Raw execution time in seconds
    pub execution_time: f64,
}

impl Tier1Result {
    /// Build a result with every score clamped into its valid range.
    #[allow(clippy::too_many_arguments)]
    pub fn clamped(
        cosine_score: f64,
        jaccard_score: f64,
        semantic_score: f64,
        time_score: f64,
        task_success: f64,
        overall_score: f64,
        execution_time: f64,
    ) -> Self {
        Self {
            cosine_score: clamp01(cosine_score),
            jaccard_score: clamp01(jaccard_score),
            semantic_score: clamp01(semantic_score),
            time_score: clamp01(time_score),
            task_success: if task_success >= 0.5 { 1.0 } else { 0.0 },
            overall_score: clamp01(overall_score),
            execution_time: execution_time.max(0.0),
        }
    }

    /// Neutral placeholder used by the tier1_only fallback strategy.
    pub fn neutral() -> Self {
        Self::clamped(0.5, 0.5, 0.5, 0.5, 0.0, 0.5, 0.0)
    }
}

/// LLM-as-judge quality scores (Tier 2).
///
/// There is no `clarity` field: it was historically an alias of
/// `constructiveness` and has been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier2Result {
    pub technical_accuracy: f64,
    pub constructiveness: f64,
    pub planning_rationality: f64,
    pub overall_score: f64,
    /// Model identifier, or "fallback_traditional" when degraded
    pub model_used: String,
    /// Estimated API cost in USD; `None` when cost is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_cost: Option<f64>,
    /// Whether any assessment fell back to a deterministic heuristic
    #[serde(default)]
    pub fallback_used: bool,
}

impl Tier2Result {
    pub fn clamped(
        technical_accuracy: f64,
        constructiveness: f64,
        planning_rationality: f64,
        overall_score: f64,
        model_used: impl Into<String>,
        api_cost: Option<f64>,
        fallback_used: bool,
    ) -> Self {
        Self {
            technical_accuracy: clamp01(technical_accuracy),
            constructiveness: clamp01(constructiveness),
            planning_rationality: clamp01(planning_rationality),
            overall_score: clamp01(overall_score),
            model_used: model_used.into(),
            api_cost: api_cost.map(|c| c.max(0.0)),
            fallback_used,
        }
    }

    /// Strictly neutral result for when no provider is available at all.
    pub fn neutral_fallback() -> Self {
        Self::clamped(0.5, 0.5, 0.5, 0.5, "fallback_traditional", Some(0.0), true)
    }
}

/// Graph-derived coordination metrics (Tier 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier3Result {
    pub path_convergence: f64,
    pub tool_selection_accuracy: f64,
    pub coordination_centrality: f64,
    pub task_distribution_balance: f64,
    pub overall_score: f64,
    /// Node count of the interaction graph
    pub graph_complexity: usize,
}

impl Tier3Result {
    pub fn clamped(
        path_convergence: f64,
        tool_selection_accuracy: f64,
        coordination_centrality: f64,
        task_distribution_balance: f64,
        overall_score: f64,
        graph_complexity: usize,
    ) -> Self {
        Self {
            path_convergence: clamp01(path_convergence),
            tool_selection_accuracy: clamp01(tool_selection_accuracy),
            coordination_centrality: clamp01(coordination_centrality),
            task_distribution_balance: clamp01(task_distribution_balance),
            overall_score: clamp01(overall_score),
            graph_complexity,
        }
    }

    /// Neutral placeholder used by the tier1_only fallback strategy.
    pub fn neutral() -> Self {
        Self::clamped(0.5, 0.5, 0.5, 0.5, 0.5, 1)
    }
}

/// Container for the tier outputs feeding composite scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub tier1: Option<Tier1Result>,
    pub tier2: Option<Tier2Result>,
    pub tier3: Option<Tier3Result>,
}

impl EvaluationResults {
    /// True when all three tiers produced a result.
    pub fn is_complete(&self) -> bool {
        self.tier1.is_some() && self.tier2.is_some() && self.tier3.is_some()
    }
}

/// Review recommendation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    WeakAccept,
    WeakReject,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::WeakAccept => "weak_accept",
            Recommendation::WeakReject => "weak_reject",
            Recommendation::Reject => "reject",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final composite verdict across all tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Weighted composite score over the active metric set
    pub composite_score: f64,
    pub recommendation: Recommendation,
    /// Numerical weight of the recommendation (-1.0 to 1.0)
    pub recommendation_weight: f64,

    /// The normalized metric values that entered the composite
    pub metric_scores: BTreeMap<String, f64>,

    pub tier1_score: f64,
    /// `None` when Tier 2 was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier2_score: Option<f64>,
    pub tier3_score: f64,

    /// True iff all three tiers produced results
    pub evaluation_complete: bool,
    /// True iff single-agent weight redistribution was applied
    #[serde(default)]
    pub single_agent_mode: bool,
    /// True iff any tier result was substituted or degraded to a fallback
    #[serde(default)]
    pub fallback_used: bool,

    /// The weights actually applied; always sums to 1.0 (+/- 1e-2)
    pub weights_used: BTreeMap<String, f64>,
    /// Tier numbers that executed
    #[serde(default)]
    pub tiers_enabled: Vec<u8>,

    /// ISO-8601 evaluation timestamp
    #[serde(default)]
    pub timestamp: String,
    /// Configuration version the verdict was produced with
    #[serde(default)]
    pub config_version: String,
}

/// Pairwise diff between two composite results from different runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub label_a: String,
    pub label_b: String,
    pub result_a: CompositeResult,
    pub result_b: CompositeResult,

    /// Per-metric `score_a - score_b`, over metrics present in both
    pub metric_deltas: BTreeMap<String, f64>,
    /// Per-tier delta; `None` when either side's tier was skipped
    pub tier_deltas: BTreeMap<String, Option<f64>>,
    /// One-line human-readable description
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier1_clamps_float_overflow() {
        // Cosine similarity of identical texts can exceed 1.0 by an ulp.
        let result = Tier1Result::clamped(1.000_000_000_000_000_2, 0.5, 0.5, 0.5, 1.0, 0.5, 1.0);
        assert_eq!(result.cosine_score, 1.0);
    }

    #[test]
    fn test_tier1_task_success_is_binary() {
        let result = Tier1Result::clamped(0.5, 0.5, 0.5, 0.5, 0.7, 0.5, 1.0);
        assert_eq!(result.task_success, 1.0);
        let result = Tier1Result::clamped(0.5, 0.5, 0.5, 0.5, 0.2, 0.5, 1.0);
        assert_eq!(result.task_success, 0.0);
    }

    #[test]
    fn test_tier2_neutral_fallback() {
        let result = Tier2Result::neutral_fallback();
        assert_eq!(result.technical_accuracy, 0.5);
        assert_eq!(result.constructiveness, 0.5);
        assert_eq!(result.planning_rationality, 0.5);
        assert_eq!(result.model_used, "fallback_traditional");
        assert!(result.fallback_used);
    }

    #[test]
    fn test_recommendation_serializes_snake_case() {
        let json = serde_json::to_string(&Recommendation::WeakAccept).unwrap();
        assert_eq!(json, "\"weak_accept\"");
        let back: Recommendation = serde_json::from_str("\"weak_reject\"").unwrap();
        assert_eq!(back, Recommendation::WeakReject);
    }

    #[test]
    fn test_evaluation_results_completeness() {
        let mut results = EvaluationResults::default();
        assert!(!results.is_complete());
        results.tier1 = Some(Tier1Result::neutral());
        results.tier2 = Some(Tier2Result::neutral_fallback());
        results.tier3 = Some(Tier3Result::neutral());
        assert!(results.is_complete());
    }

    #[test]
    fn test_composite_result_round_trip() {
        let result = CompositeResult {
            composite_score: 0.72,
            recommendation: Recommendation::WeakAccept,
            recommendation_weight: 0.7,
            metric_scores: BTreeMap::from([
                ("task_success".to_string(), 1.0),
                ("output_similarity".to_string(), 0.6),
            ]),
            tier1_score: 0.8,
            tier2_score: None,
            tier3_score: 0.7,
            evaluation_complete: false,
            single_agent_mode: true,
            fallback_used: true,
            weights_used: BTreeMap::from([("task_success".to_string(), 0.5)]),
            tiers_enabled: vec![1, 3],
            timestamp: "2025-06-01T00:00:00Z".to_string(),
            config_version: "1.0.0".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: CompositeResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
        assert!(!json.contains("tier2_score"));
    }
}
