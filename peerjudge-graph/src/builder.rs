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

//! Trace-to-graph conversion.
//!
//! Bounds hold for any input: `nodes <= 2*|interactions| + 2*|tool_calls|`
//! and `edges <= |interactions| + |tool_calls|`.

use peerjudge_core::TraceRecord;

use crate::graph::{EdgeAttributes, InteractionGraph, NodeType};

fn agent_or_unknown(id: &str) -> &str {
    if id.is_empty() {
        "unknown"
    } else {
        id
    }
}

fn tool_or_unknown(name: &str) -> &str {
    if name.is_empty() {
        "unknown_tool"
    } else {
        name
    }
}

/// Build the directed interaction graph for a trace.
///
/// Agent interactions contribute agent nodes and edges labeled with the
/// interaction kind; tool calls contribute an agent node, a tool node, and
/// a `tool_call` edge carrying the success flag.
pub fn build_interaction_graph(trace: &TraceRecord) -> InteractionGraph {
    let mut graph = InteractionGraph::new();

    for interaction in &trace.agent_interactions {
        let from = agent_or_unknown(&interaction.from);
        let to = agent_or_unknown(&interaction.to);
        graph.ensure_node(from, NodeType::Agent);
        graph.ensure_node(to, NodeType::Agent);

        let kind = if interaction.kind.is_empty() {
            "unknown"
        } else {
            interaction.kind.as_str()
        };
        graph.add_edge(
            from,
            to,
            EdgeAttributes {
                interaction: kind.to_string(),
                success: None,
            },
        );
    }

    for call in &trace.tool_calls {
        let agent = agent_or_unknown(&call.agent_id);
        let tool = tool_or_unknown(&call.tool_name);
        graph.ensure_node(agent, NodeType::Agent);
        graph.ensure_node(tool, NodeType::Tool);
        graph.add_edge(
            agent,
            tool,
            EdgeAttributes {
                interaction: "tool_call".to_string(),
                success: Some(call.success),
            },
        );
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerjudge_core::{AgentInteraction, ToolCall};
    use proptest::prelude::*;

    fn interaction(from: &str, to: &str, kind: &str) -> AgentInteraction {
        AgentInteraction {
            from: from.to_string(),
            to: to.to_string(),
            kind: kind.to_string(),
            timestamp: None,
            data: None,
        }
    }

    fn tool_call(agent: &str, tool: &str, success: bool) -> ToolCall {
        ToolCall {
            agent_id: agent.to_string(),
            tool_name: tool.to_string(),
            success,
            duration: 0.1,
            timestamp: None,
            context: None,
        }
    }

    fn multi_agent_trace() -> TraceRecord {
        let mut trace = TraceRecord::new("multi");
        trace.agent_interactions = vec![
            interaction("manager", "researcher", "delegation"),
            interaction("manager", "analyst", "delegation"),
            interaction("researcher", "manager", "response"),
        ];
        trace.tool_calls = vec![
            tool_call("researcher", "search_tool", true),
            tool_call("analyst", "analysis_tool", false),
        ];
        trace
    }

    #[test]
    fn test_agent_interactions_create_agent_nodes() {
        let graph = build_interaction_graph(&multi_agent_trace());
        assert_eq!(graph.node_type("manager"), Some(NodeType::Agent));
        assert_eq!(graph.node_type("researcher"), Some(NodeType::Agent));
        assert_eq!(graph.node_type("analyst"), Some(NodeType::Agent));
    }

    #[test]
    fn test_agent_interactions_create_labeled_edges() {
        let graph = build_interaction_graph(&multi_agent_trace());
        assert!(graph.has_edge("manager", "researcher"));
        assert!(graph.has_edge("manager", "analyst"));
        assert!(graph.has_edge("researcher", "manager"));
        assert_eq!(
            graph.edge("manager", "researcher").unwrap().interaction,
            "delegation"
        );
    }

    #[test]
    fn test_tool_calls_create_tool_nodes_and_edges() {
        let graph = build_interaction_graph(&multi_agent_trace());
        assert_eq!(graph.node_type("search_tool"), Some(NodeType::Tool));
        assert_eq!(graph.node_type("analysis_tool"), Some(NodeType::Tool));
        assert!(graph.has_edge("researcher", "search_tool"));

        let edge = graph.edge("researcher", "search_tool").unwrap();
        assert_eq!(edge.interaction, "tool_call");
        assert_eq!(edge.success, Some(true));
    }

    #[test]
    fn test_empty_trace_produces_empty_graph() {
        let graph = build_interaction_graph(&TraceRecord::new("empty"));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_agent_in_interactions_and_tools_has_one_agent_node() {
        let graph = build_interaction_graph(&multi_agent_trace());
        // "researcher" appears in interactions and as a tool caller.
        assert_eq!(graph.node_type("researcher"), Some(NodeType::Agent));
        let researcher_nodes = graph.nodes().filter(|(id, _)| *id == "researcher").count();
        assert_eq!(researcher_nodes, 1);
    }

    #[test]
    fn test_empty_ids_default_to_unknown() {
        let mut trace = TraceRecord::new("sparse");
        trace.agent_interactions = vec![interaction("", "", "")];
        trace.tool_calls = vec![tool_call("", "", true)];

        let graph = build_interaction_graph(&trace);
        assert_eq!(graph.node_type("unknown"), Some(NodeType::Agent));
        assert_eq!(graph.node_type("unknown_tool"), Some(NodeType::Tool));
        assert_eq!(graph.edge("unknown", "unknown").unwrap().interaction, "unknown");
    }

    #[test]
    fn test_repeated_tool_call_edge_keeps_last_success() {
        // Pinned merge semantics: earlier failures are overwritten.
        let mut trace = TraceRecord::new("repeat");
        trace.tool_calls = vec![
            tool_call("agent", "tool", false),
            tool_call("agent", "tool", true),
        ];

        let graph = build_interaction_graph(&trace);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge("agent", "tool").unwrap().success, Some(true));
    }

    proptest! {
        #[test]
        fn prop_node_and_edge_counts_are_bounded(
            num_interactions in 0usize..20,
            num_tool_calls in 0usize..20,
        ) {
            let mut trace = TraceRecord::new("prop");
            for i in 0..num_interactions {
                trace.agent_interactions.push(interaction(
                    &format!("a{}", i % 5),
                    &format!("b{}", i % 3),
                    "msg",
                ));
            }
            for i in 0..num_tool_calls {
                trace.tool_calls.push(tool_call(
                    &format!("a{}", i % 4),
                    &format!("t{}", i % 6),
                    i % 2 == 0,
                ));
            }

            let graph = build_interaction_graph(&trace);
            prop_assert!(graph.node_count() <= 2 * num_interactions + 2 * num_tool_calls);
            prop_assert!(graph.edge_count() <= num_interactions + num_tool_calls);
        }

        #[test]
        fn prop_all_tool_nodes_are_typed_tool(num_tool_calls in 0usize..30) {
            let mut trace = TraceRecord::new("prop");
            for i in 0..num_tool_calls {
                trace.tool_calls.push(tool_call("caller", &format!("tool-{i}"), true));
            }

            let graph = build_interaction_graph(&trace);
            for tool in graph.tool_nodes() {
                prop_assert_eq!(graph.node_type(tool), Some(NodeType::Tool));
            }
            prop_assert_eq!(graph.tool_nodes().len(), num_tool_calls);
        }
    }
}
