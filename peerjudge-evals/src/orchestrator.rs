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

//! Tier-ordered evaluation orchestration.
//!
//! [`JudgeAgent`] is the error boundary for tier execution: every enabled
//! tier runs under its own timeout, failures and timeouts become null
//! results, and the pipeline continues. After all tiers complete, the
//! composite scorer turns whatever survived into a verdict, or the
//! orchestrator fails with a cannot-score error when not even Tier 1
//! produced output.
//!
//! Tier results flow forward: the Tier-1 result is handed to Tier 2 as
//! context (its semantic score backs the technical-accuracy fallback).

use peerjudge_core::{
    validate_evaluation_input, CompositeResult, EvaluationResults, FallbackStrategy, JudgeConfig,
    JudgeError, TraceRecord,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::monitor::{PerformanceMonitor, TierFailureKind};
use crate::registry::PluginRegistry;
use crate::scorer::CompositeScorer;
use crate::tier1::{SimilarityEngine, SimilarityPlugin};
use crate::tier2::{LlmJudgeEngine, LlmJudgePlugin};
use crate::tier3::{GraphAnalysisEngine, GraphAnalysisPlugin};
use crate::{ExecutionStats, TierContext, TierInput, TierOutput};

/// Plugin-based evaluation orchestrator.
pub struct JudgeAgent {
    config: JudgeConfig,
    registry: PluginRegistry,
    scorer: CompositeScorer,
    monitor: PerformanceMonitor,
}

impl JudgeAgent {
    /// Judge with the three standard tier plugins. Tier-2 providers are
    /// resolved from the environment; with none available the tier will be
    /// skipped and its weight redistributed.
    pub fn new(config: JudgeConfig) -> Self {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(SimilarityPlugin::new(SimilarityEngine::new(
            config.tier1.clone(),
        ))));
        registry.register(Arc::new(LlmJudgePlugin::new(LlmJudgeEngine::from_env(
            config.tier2.clone(),
        ))));
        registry.register(Arc::new(GraphAnalysisPlugin::new(GraphAnalysisEngine::new(
            config.tier3.clone(),
        ))));
        Self::with_registry(config, registry)
    }

    /// Judge over a custom plugin registry.
    pub fn with_registry(config: JudgeConfig, registry: PluginRegistry) -> Self {
        let monitor = PerformanceMonitor::new(config.total_max_seconds);
        let scorer = CompositeScorer::new(config.composite.clone());
        info!(
            plugins = registry.list().len(),
            tiers = ?config.tiers_enabled,
            "judge agent initialized"
        );
        Self {
            config,
            registry,
            scorer,
            monitor,
        }
    }

    /// Execution statistics from the most recent run.
    pub fn execution_stats(&self) -> ExecutionStats {
        self.monitor.stats()
    }

    fn timeout_for(&self, tier: u8) -> Duration {
        let seconds = match tier {
            1 => self.config.tier1_max_seconds,
            2 => self.config.tier2_max_seconds,
            3 => self.config.tier3_max_seconds,
            _ => self.config.total_max_seconds,
        };
        Duration::from_secs_f64(seconds.max(1e-3))
    }

    /// Run the comprehensive tier-ordered evaluation.
    pub async fn evaluate_comprehensive(
        &self,
        paper: &str,
        review: &str,
        trace: Option<TraceRecord>,
        reference_reviews: Vec<String>,
    ) -> Result<CompositeResult, JudgeError> {
        validate_evaluation_input(paper, review, &reference_reviews, &self.config.limits)?;

        let pipeline_start = Instant::now();
        self.monitor.reset();

        // The time metric measures the evaluated run, not the evaluation.
        let (start_time, end_time) = match &trace {
            Some(trace) => (trace.timing_data.start_time, trace.timing_data.end_time),
            None => (0.0, 0.0),
        };

        // Empty reference list degrades to one empty reference so Tier 1
        // still produces a (zero-similarity) signal.
        let reference_reviews = if reference_reviews.is_empty() {
            vec![String::new()]
        } else {
            reference_reviews
        };

        let input = TierInput {
            paper: paper.to_string(),
            review: review.to_string(),
            reference_reviews,
            trace: trace.clone(),
            start_time,
            end_time,
        };

        let mut context = TierContext::default();
        let mut results = EvaluationResults::default();

        for plugin in self.registry.in_tier_order() {
            let tier = plugin.tier_number();
            if !self.config.is_tier_enabled(tier) {
                debug!(tier, "tier disabled; skipping");
                continue;
            }
            if !plugin.is_available() {
                warn!(
                    tier,
                    plugin = plugin.name(),
                    "plugin unavailable; skipping tier"
                );
                self.monitor.record_tier_failure(
                    tier,
                    TierFailureKind::Unavailable,
                    0.0,
                    format!("{} unavailable", plugin.name()),
                );
                continue;
            }

            info!(tier, plugin = plugin.name(), "executing tier");
            let tier_start = Instant::now();
            let outcome =
                tokio::time::timeout(self.timeout_for(tier), plugin.evaluate(&input, &context))
                    .await;
            let elapsed = tier_start.elapsed().as_secs_f64();

            match outcome {
                Ok(Ok(output)) => {
                    self.monitor.record_tier_execution(tier, elapsed);
                    info!(tier, elapsed, "tier completed");
                    match output {
                        TierOutput::Tier1(result) => {
                            context.tier1 = Some(result.clone());
                            results.tier1 = Some(result);
                        }
                        TierOutput::Tier2(result) => {
                            context.tier2 = Some(result.clone());
                            results.tier2 = Some(result);
                        }
                        TierOutput::Tier3(result) => {
                            results.tier3 = Some(result);
                        }
                    }
                }
                Ok(Err(e)) => {
                    error!(tier, error = %e, "tier failed");
                    self.monitor
                        .record_tier_failure(tier, TierFailureKind::Error, elapsed, e.to_string());
                }
                Err(_) => {
                    let message = format!(
                        "tier {tier} timeout after {:.3}s",
                        self.timeout_for(tier).as_secs_f64()
                    );
                    error!(tier, "{message}");
                    self.monitor.record_tier_failure(
                        tier,
                        TierFailureKind::Timeout,
                        elapsed,
                        message,
                    );
                }
            }
        }

        if !results.is_complete() {
            match self.config.fallback_strategy {
                FallbackStrategy::Tier1Only => {
                    if results.tier1.is_none() {
                        self.monitor.finalize(pipeline_start.elapsed().as_secs_f64());
                        return Err(JudgeError::CannotScore(
                            "Tier 1 produced no result; nothing to score".to_string(),
                        ));
                    }
                    self.monitor.record_fallback();
                }
                FallbackStrategy::None => {
                    self.monitor.finalize(pipeline_start.elapsed().as_secs_f64());
                    return Err(JudgeError::CannotScore(
                        "incomplete tier results and fallback disabled".to_string(),
                    ));
                }
            }
        }

        let mut composite = match &trace {
            Some(trace) => self.scorer.evaluate_composite_with_trace(&results, trace)?,
            None => self.scorer.evaluate_composite(&results)?,
        };

        self.monitor.finalize(pipeline_start.elapsed().as_secs_f64());
        let stats = self.monitor.stats();
        composite.tiers_enabled = stats.tiers_executed.clone();
        composite.fallback_used = composite.fallback_used || stats.fallback_used;

        info!(
            composite = composite.composite_score,
            recommendation = %composite.recommendation,
            summary = %self.monitor.summary(),
            "evaluation complete"
        );

        Ok(composite)
    }
}
