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

//! Simple directed graph with typed nodes.
//!
//! Nodes are agent or tool identifiers; edges carry the interaction label
//! and, for tool calls, the success flag. `BTreeMap` keys make iteration
//! order deterministic, which keeps metric computation and tests stable.

use std::collections::{BTreeMap, BTreeSet};

/// Node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Agent,
    Tool,
}

/// Attributes on a directed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttributes {
    /// Interaction label (e.g., "delegation", "tool_call")
    pub interaction: String,
    /// Success flag; set for tool-call edges only
    pub success: Option<bool>,
}

/// Directed graph of agents and tools.
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    nodes: BTreeMap<String, NodeType>,
    edges: BTreeMap<(String, String), EdgeAttributes>,
    successors: BTreeMap<String, BTreeSet<String>>,
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or re-type a node. An existing agent node is never
    /// downgraded to a tool node.
    pub fn ensure_node(&mut self, id: impl Into<String>, node_type: NodeType) {
        let id = id.into();
        match self.nodes.get(&id) {
            Some(NodeType::Agent) => {}
            Some(NodeType::Tool) if node_type == NodeType::Agent => {
                self.nodes.insert(id, NodeType::Agent);
            }
            Some(NodeType::Tool) => {}
            None => {
                self.nodes.insert(id, node_type);
            }
        }
    }

    /// Insert a directed edge, overwriting any existing attributes for the
    /// same `(source, target)` pair (simple-graph semantics).
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        attributes: EdgeAttributes,
    ) {
        let source = source.into();
        let target = target.into();
        self.successors
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.edges.insert((source, target), attributes);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_type(&self, id: &str) -> Option<NodeType> {
        self.nodes.get(id).copied()
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .contains_key(&(source.to_string(), target.to_string()))
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&EdgeAttributes> {
        self.edges.get(&(source.to_string(), target.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, NodeType)> {
        self.nodes.iter().map(|(id, ty)| (id, *ty))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&(String, String), &EdgeAttributes)> {
        self.edges.iter()
    }

    /// Outgoing neighbors of a node.
    pub fn successors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.successors.get(id).into_iter().flatten()
    }

    /// Total degree (in + out) of a node.
    pub fn degree(&self, id: &str) -> usize {
        self.edges
            .keys()
            .filter(|(source, target)| source == id || target == id)
            .count()
    }

    /// Agent node ids in deterministic order.
    pub fn agent_nodes(&self) -> Vec<&String> {
        self.nodes
            .iter()
            .filter(|(_, ty)| **ty == NodeType::Agent)
            .map(|(id, _)| id)
            .collect()
    }

    /// Tool node ids in deterministic order.
    pub fn tool_nodes(&self) -> Vec<&String> {
        self.nodes
            .iter()
            .filter(|(_, ty)| **ty == NodeType::Tool)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_call_edge(success: bool) -> EdgeAttributes {
        EdgeAttributes {
            interaction: "tool_call".to_string(),
            success: Some(success),
        }
    }

    #[test]
    fn test_nodes_and_edges() {
        let mut graph = InteractionGraph::new();
        graph.ensure_node("a", NodeType::Agent);
        graph.ensure_node("t", NodeType::Tool);
        graph.add_edge("a", "t", tool_call_edge(true));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge("a", "t"));
        assert!(!graph.has_edge("t", "a"));
        assert_eq!(graph.node_type("a"), Some(NodeType::Agent));
        assert_eq!(graph.node_type("t"), Some(NodeType::Tool));
    }

    #[test]
    fn test_agent_node_is_never_downgraded() {
        let mut graph = InteractionGraph::new();
        graph.ensure_node("x", NodeType::Agent);
        graph.ensure_node("x", NodeType::Tool);
        assert_eq!(graph.node_type("x"), Some(NodeType::Agent));
    }

    #[test]
    fn test_tool_node_upgrades_to_agent() {
        let mut graph = InteractionGraph::new();
        graph.ensure_node("x", NodeType::Tool);
        graph.ensure_node("x", NodeType::Agent);
        assert_eq!(graph.node_type("x"), Some(NodeType::Agent));
    }

    #[test]
    fn test_repeated_edge_overwrites_attributes() {
        // Simple-graph merge semantics: the last call wins.
        let mut graph = InteractionGraph::new();
        graph.ensure_node("a", NodeType::Agent);
        graph.ensure_node("t", NodeType::Tool);
        graph.add_edge("a", "t", tool_call_edge(false));
        graph.add_edge("a", "t", tool_call_edge(true));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge("a", "t").unwrap().success, Some(true));
    }

    #[test]
    fn test_degree_counts_both_directions() {
        let mut graph = InteractionGraph::new();
        for id in ["hub", "a", "b"] {
            graph.ensure_node(id, NodeType::Agent);
        }
        graph.add_edge(
            "hub",
            "a",
            EdgeAttributes {
                interaction: "delegation".to_string(),
                success: None,
            },
        );
        graph.add_edge(
            "b",
            "hub",
            EdgeAttributes {
                interaction: "response".to_string(),
                success: None,
            },
        );

        assert_eq!(graph.degree("hub"), 2);
        assert_eq!(graph.degree("a"), 1);
    }
}
