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

//! Coordination metrics over interaction graphs.
//!
//! Every metric returns a value in [0,1] and degrades to a neutral 0.5 when
//! the trace carries too little signal to measure (empty graph, no tool
//! calls). Degenerate inputs never error.

use peerjudge_core::TraceRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::warn;

use crate::graph::InteractionGraph;

/// Normalized betweenness centrality of the busiest agent node.
///
/// Computes Brandes betweenness over the directed graph, takes the value of
/// the highest-degree agent node, and normalizes by `(n-1)(n-2)`. Graphs
/// with fewer than two nodes (or no agent at all) score a neutral 0.5.
pub fn coordination_centrality(graph: &InteractionGraph) -> f64 {
    let n = graph.node_count();
    if n < 2 {
        warn!(nodes = n, "graph too small for centrality; scoring neutral");
        return 0.5;
    }

    let agents = graph.agent_nodes();
    let Some(hub) = agents.into_iter().max_by_key(|id| graph.degree(id.as_str())) else {
        warn!("no agent nodes in graph; scoring neutral centrality");
        return 0.5;
    };

    let scale = ((n - 1) * (n.saturating_sub(2))) as f64;
    if scale <= 0.0 {
        return 0.5;
    }

    let centrality = betweenness_centrality(graph);
    let raw = centrality.get(hub.as_str()).copied().unwrap_or(0.0);
    (raw / scale).clamp(0.0, 1.0)
}

/// Ratio of successful tool-call edges to total tool-call edges.
/// No tool-call edges at all scores a neutral 0.5.
pub fn tool_selection_accuracy(graph: &InteractionGraph) -> f64 {
    let mut total = 0usize;
    let mut successes = 0usize;
    for (_, attributes) in graph.edges() {
        if attributes.interaction == "tool_call" {
            total += 1;
            if attributes.success == Some(true) {
                successes += 1;
            }
        }
    }
    if total == 0 {
        return 0.5;
    }
    (successes as f64 / total as f64).clamp(0.0, 1.0)
}

/// Inverse of distinct (agent, tool) paths per unit of work.
///
/// Repeatedly traversing the same path converges to 1.0; spreading every
/// call over a fresh path approaches 1/total. No tool calls scores 0.5.
pub fn path_convergence(trace: &TraceRecord) -> f64 {
    let total = trace.tool_calls.len();
    if total == 0 {
        return 0.5;
    }

    let unique: BTreeSet<(&str, &str)> = trace
        .tool_calls
        .iter()
        .map(|call| (call.agent_id.as_str(), call.tool_name.as_str()))
        .collect();

    (1.0 - (unique.len().saturating_sub(1)) as f64 / total as f64).clamp(0.0, 1.0)
}

/// Normalized entropy of tool calls per agent.
///
/// Perfectly balanced load across agents scores 1.0; every call issued by
/// one agent scores 0.0; no tool calls scores a neutral 0.5.
pub fn task_distribution_balance(trace: &TraceRecord) -> f64 {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for call in &trace.tool_calls {
        *counts.entry(call.agent_id.as_str()).or_insert(0) += 1;
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.5;
    }
    let k = counts.len();
    if k == 1 {
        return 0.0;
    }

    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    let max_entropy = (k as f64).ln();

    (entropy / max_entropy).clamp(0.0, 1.0)
}

/// Brandes betweenness centrality for an unweighted directed graph.
fn betweenness_centrality(graph: &InteractionGraph) -> HashMap<&str, f64> {
    let nodes: Vec<&str> = graph.nodes().map(|(id, _)| id.as_str()).collect();
    let mut centrality: HashMap<&str, f64> = nodes.iter().map(|id| (*id, 0.0)).collect();

    for &source in &nodes {
        let mut stack: Vec<&str> = Vec::new();
        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut sigma: HashMap<&str, f64> = nodes.iter().map(|id| (*id, 0.0)).collect();
        let mut distance: HashMap<&str, i64> = nodes.iter().map(|id| (*id, -1)).collect();
        sigma.insert(source, 1.0);
        distance.insert(source, 0);

        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let d_v = distance[v];
            let sigma_v = sigma[v];
            for w in graph.successors(v) {
                let w = w.as_str();
                if distance[w] < 0 {
                    distance.insert(w, d_v + 1);
                    queue.push_back(w);
                }
                if distance[w] == d_v + 1 {
                    *sigma.get_mut(w).unwrap() += sigma_v;
                    predecessors.entry(w).or_default().push(v);
                }
            }
        }

        let mut delta: HashMap<&str, f64> = nodes.iter().map(|id| (*id, 0.0)).collect();
        while let Some(w) = stack.pop() {
            let coefficient = (1.0 + delta[w]) / sigma[w].max(1.0);
            if let Some(preds) = predecessors.get(w) {
                for &v in preds {
                    *delta.get_mut(v).unwrap() += sigma[v] * coefficient;
                }
            }
            if w != source {
                *centrality.get_mut(w).unwrap() += delta[w];
            }
        }
    }

    centrality
}
