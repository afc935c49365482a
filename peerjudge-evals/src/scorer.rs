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

//! Composite scoring across the three evaluation tiers.
//!
//! Six canonical metrics feed the weighted composite:
//!
//! | metric | source |
//! |---|---|
//! | `time_taken` | Tier 1 time score, log-renormalized |
//! | `task_success` | Tier 1 |
//! | `output_similarity` | Tier 1 overall |
//! | `planning_rationality` | Tier 2 |
//! | `coordination_quality` | Tier 3 centrality |
//! | `tool_efficiency` | Tier 3 tool accuracy |
//!
//! The absence of a tier is a signal, not an error: a skipped Tier 2 drops
//! `planning_rationality` and a single-agent trace drops
//! `coordination_quality`, with the dropped weight redistributed equally
//! over the remaining metrics so the weight vector keeps summing to 1.
//! Keeping all redistribution here, rather than sprinkled through the
//! tiers, localizes the reasoning.

use peerjudge_core::{
    config::CONFIG_VERSION, CompositeConfig, CompositeResult, EvaluationResults, JudgeError,
    Recommendation, Tier3Result, TraceRecord,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Composite scorer with configurable weights and thresholds.
pub struct CompositeScorer {
    config: CompositeConfig,
}

impl CompositeScorer {
    pub fn new(config: CompositeConfig) -> Self {
        Self { config }
    }

    /// Logarithmic renormalization of the Tier-1 time score:
    /// `1 / (1 + ln(1 + t))`, clamped to [0,1].
    fn normalize_time_score(time_score: f64) -> f64 {
        if time_score <= 0.0 {
            return 1.0;
        }
        (1.0 / (1.0 + (1.0 + time_score).ln())).clamp(0.0, 1.0)
    }

    // Floating-point drift upstream must not leak out of range.
    fn clamp_metric(name: &str, value: f64) -> f64 {
        if value.is_nan() {
            warn!(metric = name, "metric is NaN; treating as 0.0");
            return 0.0;
        }
        if !(0.0..=1.0).contains(&value) {
            warn!(metric = name, value, "metric outside [0,1]; clamping");
        }
        value.clamp(0.0, 1.0)
    }

    /// Map a composite score to its recommendation category.
    pub fn map_to_recommendation(&self, composite_score: f64) -> Recommendation {
        if composite_score >= self.config.accept_threshold {
            Recommendation::Accept
        } else if composite_score >= self.config.weak_accept_threshold {
            Recommendation::WeakAccept
        } else if composite_score >= self.config.weak_reject_threshold {
            Recommendation::WeakReject
        } else {
            Recommendation::Reject
        }
    }

    /// Numerical weight for a recommendation category.
    pub fn recommendation_weight(&self, recommendation: Recommendation) -> f64 {
        match recommendation {
            Recommendation::Accept => self.config.accept_weight,
            Recommendation::WeakAccept => self.config.weak_accept_weight,
            Recommendation::WeakReject => self.config.weak_reject_weight,
            Recommendation::Reject => self.config.reject_weight,
        }
    }

    /// Active weights after dropping metrics for a skipped Tier 2 and/or a
    /// single-agent trace. The dropped weight is shared equally over the
    /// remaining metrics and the vector is renormalized to sum to 1.
    fn redistribute_weights(
        &self,
        tier2_present: bool,
        single_agent: bool,
    ) -> Result<BTreeMap<String, f64>, JudgeError> {
        let mut weights = self.config.metric_weights.clone();
        let mut dropped = 0.0;

        if !tier2_present {
            if let Some(weight) = weights.remove("planning_rationality") {
                info!("Tier 2 skipped; redistributing planning_rationality weight");
                dropped += weight;
            }
        }
        if single_agent {
            if let Some(weight) = weights.remove("coordination_quality") {
                info!("single-agent trace; redistributing coordination_quality weight");
                dropped += weight;
            }
        }

        if weights.is_empty() {
            return Err(JudgeError::CannotScore(
                "no metrics remain after weight redistribution".to_string(),
            ));
        }

        let share = dropped / weights.len() as f64;
        for weight in weights.values_mut() {
            *weight += share;
        }
        let total: f64 = weights.values().sum();
        if total > 0.0 {
            for weight in weights.values_mut() {
                *weight /= total;
            }
        }

        Ok(weights)
    }

    /// Composite evaluation without a trace (multi-agent assumed).
    pub fn evaluate_composite(
        &self,
        results: &EvaluationResults,
    ) -> Result<CompositeResult, JudgeError> {
        self.score(results, false)
    }

    /// Composite evaluation with single-agent detection from the trace.
    pub fn evaluate_composite_with_trace(
        &self,
        results: &EvaluationResults,
        trace: &TraceRecord,
    ) -> Result<CompositeResult, JudgeError> {
        self.score(results, trace.is_single_agent())
    }

    fn score(
        &self,
        results: &EvaluationResults,
        single_agent: bool,
    ) -> Result<CompositeResult, JudgeError> {
        let tier1 = results.tier1.as_ref().ok_or_else(|| {
            JudgeError::CannotScore("no Tier 1 result available".to_string())
        })?;
        let tier2 = results.tier2.as_ref();

        let (tier3, tier3_substituted) = match results.tier3.as_ref() {
            Some(tier3) => (tier3.clone(), false),
            None => {
                warn!("no Tier 3 result; substituting neutral graph metrics");
                (Tier3Result::neutral(), true)
            }
        };

        let mut metrics: BTreeMap<String, f64> = BTreeMap::new();
        metrics.insert(
            "time_taken".to_string(),
            Self::clamp_metric("time_taken", Self::normalize_time_score(tier1.time_score)),
        );
        metrics.insert(
            "task_success".to_string(),
            Self::clamp_metric("task_success", tier1.task_success),
        );
        metrics.insert(
            "output_similarity".to_string(),
            Self::clamp_metric("output_similarity", tier1.overall_score),
        );
        if let Some(tier2) = tier2 {
            metrics.insert(
                "planning_rationality".to_string(),
                Self::clamp_metric("planning_rationality", tier2.planning_rationality),
            );
        }
        if !single_agent {
            metrics.insert(
                "coordination_quality".to_string(),
                Self::clamp_metric("coordination_quality", tier3.coordination_centrality),
            );
        }
        metrics.insert(
            "tool_efficiency".to_string(),
            Self::clamp_metric("tool_efficiency", tier3.tool_selection_accuracy),
        );

        let weights = self.redistribute_weights(tier2.is_some(), single_agent)?;

        let composite_score: f64 = weights
            .iter()
            .map(|(name, weight)| metrics.get(name).copied().unwrap_or(0.0) * weight)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let recommendation = self.map_to_recommendation(composite_score);
        debug!(
            composite = composite_score,
            recommendation = %recommendation,
            single_agent,
            "composite evaluation complete"
        );

        let fallback_used = !results.is_complete()
            || tier3_substituted
            || tier2.map(|t| t.fallback_used).unwrap_or(false);

        let mut tiers_enabled = vec![1];
        if tier2.is_some() {
            tiers_enabled.push(2);
        }
        if results.tier3.is_some() {
            tiers_enabled.push(3);
        }

        Ok(CompositeResult {
            composite_score,
            recommendation,
            recommendation_weight: self.recommendation_weight(recommendation),
            metric_scores: metrics,
            tier1_score: tier1.overall_score,
            tier2_score: tier2.map(|t| t.overall_score),
            tier3_score: tier3.overall_score,
            evaluation_complete: results.is_complete(),
            single_agent_mode: single_agent,
            fallback_used,
            weights_used: weights,
            tiers_enabled,
            timestamp: chrono::Utc::now().to_rfc3339(),
            config_version: CONFIG_VERSION.to_string(),
        })
    }
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self::new(CompositeConfig::default())
    }
}
