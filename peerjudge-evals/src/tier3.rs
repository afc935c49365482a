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

//! Tier 3: graph-analysis engine.
//!
//! Builds the interaction graph from the trace and derives four
//! coordination scalars, each degrading to neutral 0.5 when the trace
//! carries no signal. Purely deterministic; no LLM involvement.

use async_trait::async_trait;
use peerjudge_core::{Tier3Config, Tier3Result, TraceRecord};
use peerjudge_graph::{build_interaction_graph, metrics};
use std::sync::Arc;

use crate::{EvalError, TierContext, TierInput, TierOutput, TierPlugin};

/// Deterministic graph-metric engine.
pub struct GraphAnalysisEngine {
    config: Tier3Config,
}

impl GraphAnalysisEngine {
    pub fn new(config: Tier3Config) -> Self {
        Self { config }
    }

    /// Evaluate graph metrics for a trace. A missing trace is analyzed as
    /// an empty one, scoring neutral across the board.
    pub fn evaluate(&self, trace: Option<&TraceRecord>) -> Tier3Result {
        let minimal = TraceRecord::new("minimal");
        let trace = trace.unwrap_or(&minimal);
        let graph = build_interaction_graph(trace);

        let path_convergence = metrics::path_convergence(trace);
        let tool_selection_accuracy = metrics::tool_selection_accuracy(&graph);
        let coordination_centrality = metrics::coordination_centrality(&graph);
        let task_distribution_balance = metrics::task_distribution_balance(trace);

        let overall = path_convergence * self.config.path_convergence_weight
            + tool_selection_accuracy * self.config.tool_selection_weight
            + coordination_centrality * self.config.centrality_weight
            + task_distribution_balance * self.config.balance_weight;

        Tier3Result::clamped(
            path_convergence,
            tool_selection_accuracy,
            coordination_centrality,
            task_distribution_balance,
            overall,
            graph.node_count(),
        )
    }
}

impl Default for GraphAnalysisEngine {
    fn default() -> Self {
        Self::new(Tier3Config::default())
    }
}

/// Tier-3 plugin; graph work is CPU-bound and offloaded to a worker
/// thread.
pub struct GraphAnalysisPlugin {
    engine: Arc<GraphAnalysisEngine>,
}

impl GraphAnalysisPlugin {
    pub fn new(engine: GraphAnalysisEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[async_trait]
impl TierPlugin for GraphAnalysisPlugin {
    fn name(&self) -> &str {
        "graph_metrics"
    }

    fn tier_number(&self) -> u8 {
        3
    }

    async fn evaluate(
        &self,
        input: &TierInput,
        _context: &TierContext,
    ) -> Result<TierOutput, EvalError> {
        let engine = self.engine.clone();
        let trace = input.trace.clone();
        let result = tokio::task::spawn_blocking(move || engine.evaluate(trace.as_ref()))
            .await
            .map_err(|e| EvalError::Internal(format!("tier 3 worker panicked: {e}")))?;
        Ok(TierOutput::Tier3(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerjudge_core::{AgentInteraction, ToolCall};

    fn two_agent_trace() -> TraceRecord {
        let mut trace = TraceRecord::new("two-agent");
        trace.agent_interactions = vec![AgentInteraction {
            from: "manager".to_string(),
            to: "researcher".to_string(),
            kind: "delegation".to_string(),
            timestamp: Some(1.0),
            data: None,
        }];
        trace.tool_calls = vec![ToolCall {
            agent_id: "researcher".to_string(),
            tool_name: "fetch_paper".to_string(),
            success: true,
            duration: 0.5,
            timestamp: Some(2.0),
            context: None,
        }];
        trace
    }

    #[test]
    fn test_empty_trace_scores_neutral() {
        let engine = GraphAnalysisEngine::default();
        let result = engine.evaluate(None);

        assert_eq!(result.path_convergence, 0.5);
        assert_eq!(result.tool_selection_accuracy, 0.5);
        assert_eq!(result.coordination_centrality, 0.5);
        assert_eq!(result.task_distribution_balance, 0.5);
        assert!((result.overall_score - 0.5).abs() < 1e-9);
        assert_eq!(result.graph_complexity, 0);
    }

    #[test]
    fn test_two_agent_trace_produces_bounded_scores() {
        let engine = GraphAnalysisEngine::default();
        let result = engine.evaluate(Some(&two_agent_trace()));

        for score in [
            result.path_convergence,
            result.tool_selection_accuracy,
            result.coordination_centrality,
            result.task_distribution_balance,
            result.overall_score,
        ] {
            assert!((0.0..=1.0).contains(&score));
        }
        // manager, researcher, fetch_paper
        assert_eq!(result.graph_complexity, 3);
        assert_eq!(result.tool_selection_accuracy, 1.0);
    }

    #[test]
    fn test_failed_tools_lower_accuracy() {
        let mut trace = two_agent_trace();
        trace.tool_calls.push(ToolCall {
            agent_id: "researcher".to_string(),
            tool_name: "broken_tool".to_string(),
            success: false,
            duration: 0.1,
            timestamp: Some(3.0),
            context: None,
        });

        let engine = GraphAnalysisEngine::default();
        let result = engine.evaluate(Some(&trace));
        assert!((result.tool_selection_accuracy - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_plugin_returns_tier3_output() {
        let plugin = GraphAnalysisPlugin::new(GraphAnalysisEngine::default());
        let input = TierInput {
            paper: String::new(),
            review: String::new(),
            reference_reviews: Vec::new(),
            trace: Some(two_agent_trace()),
            start_time: 0.0,
            end_time: 1.0,
        };
        let output = plugin
            .evaluate(&input, &TierContext::default())
            .await
            .unwrap();
        assert_eq!(output.tier_number(), 3);
    }
}
