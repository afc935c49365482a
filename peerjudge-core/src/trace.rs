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

//! Execution trace records
//!
//! A [`TraceRecord`] is the normalized representation of a single agent run,
//! regardless of which runtime produced it. Adapters for external runtimes
//! and the native collector both emit this type; the graph builder and the
//! Tier-3 engine consume it.
//!
//! Timestamps are epoch seconds (`f64`), matching the wire format of the
//! external runtime artifacts. Within each event sequence, timestamps are
//! monotonically non-decreasing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::JudgeError;

fn default_agent_id() -> String {
    "unknown".to_string()
}

fn default_tool_name() -> String {
    "unknown_tool".to_string()
}

/// A single agent-to-agent message or handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInteraction {
    /// Source agent id
    #[serde(default = "default_agent_id")]
    pub from: String,

    /// Target agent id
    #[serde(default = "default_agent_id")]
    pub to: String,

    /// Interaction kind (e.g., "delegation", "response", "handoff")
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Epoch seconds, if the runtime recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Free-form payload attached by the runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A single tool invocation by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Calling agent id
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Tool identifier
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Whether the call succeeded
    #[serde(default)]
    pub success: bool,

    /// Wall-clock duration in seconds
    #[serde(default)]
    pub duration: f64,

    /// Epoch seconds, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Short human-readable context (task title, query, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A delegation or assignment event emitted by a coordinating agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationEvent {
    /// Agent that issued the coordination action
    #[serde(default = "default_agent_id")]
    pub manager: String,

    /// Coordination kind (e.g., "delegation", "assignment")
    #[serde(default)]
    pub coordination_type: String,

    /// Agents the action was directed at
    #[serde(default)]
    pub target_agents: Vec<String>,

    /// Epoch seconds, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Free-form payload attached by the runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Run-level timing boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimingData {
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
}

impl TimingData {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Normalized execution trace for a single agent run.
///
/// Created empty by [`TraceRecord::new`], mutated only by the collector
/// while the run is live, then frozen and persisted under its
/// `execution_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Unique id for the run
    pub execution_id: String,

    /// Ordered agent-to-agent events
    #[serde(default)]
    pub agent_interactions: Vec<AgentInteraction>,

    /// Ordered tool invocations
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Ordered delegation/assignment events
    #[serde(default)]
    pub coordination_events: Vec<CoordinationEvent>,

    /// Run start/end boundaries
    #[serde(default)]
    pub timing_data: TimingData,
}

impl TraceRecord {
    /// Create an empty trace for the given execution id.
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            agent_interactions: Vec::new(),
            tool_calls: Vec::new(),
            coordination_events: Vec::new(),
            timing_data: TimingData::default(),
        }
    }

    /// Distinct agent ids seen across tool calls and interactions.
    pub fn unique_agent_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for call in &self.tool_calls {
            if !call.agent_id.is_empty() {
                ids.insert(call.agent_id.clone());
            }
        }
        for interaction in &self.agent_interactions {
            if !interaction.from.is_empty() {
                ids.insert(interaction.from.clone());
            }
            if !interaction.to.is_empty() {
                ids.insert(interaction.to.clone());
            }
        }
        ids
    }

    /// Whether this trace describes a single-agent run.
    ///
    /// Requires both: no coordination events, and at most one unique agent
    /// id across tool calls and interactions. A trace with interactions
    /// between two agents is multi-agent even when no coordination events
    /// were recorded.
    pub fn is_single_agent(&self) -> bool {
        self.coordination_events.is_empty() && self.unique_agent_ids().len() <= 1
    }

    /// Total number of recorded events across all sequences.
    pub fn total_events(&self) -> usize {
        self.agent_interactions.len() + self.tool_calls.len() + self.coordination_events.len()
    }

    /// Check structural invariants: per-sequence monotonic timestamps and
    /// `start_time <= end_time`.
    pub fn validate(&self) -> Result<(), JudgeError> {
        if self.timing_data.start_time > self.timing_data.end_time {
            return Err(JudgeError::Validation(format!(
                "timing_data start {} exceeds end {}",
                self.timing_data.start_time, self.timing_data.end_time
            )));
        }

        check_monotonic(
            "agent_interactions",
            self.agent_interactions.iter().map(|i| i.timestamp),
        )?;
        check_monotonic("tool_calls", self.tool_calls.iter().map(|c| c.timestamp))?;
        check_monotonic(
            "coordination_events",
            self.coordination_events.iter().map(|e| e.timestamp),
        )?;

        Ok(())
    }
}

fn check_monotonic(
    sequence: &str,
    timestamps: impl Iterator<Item = Option<f64>>,
) -> Result<(), JudgeError> {
    let mut previous: Option<f64> = None;
    for (index, timestamp) in timestamps.enumerate() {
        let Some(ts) = timestamp else { continue };
        if let Some(prev) = previous {
            if ts < prev {
                return Err(JudgeError::Validation(format!(
                    "{sequence}[{index}] timestamp {ts} precedes {prev}"
                )));
            }
        }
        previous = Some(ts);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> TraceRecord {
        TraceRecord {
            execution_id: "exec-1".to_string(),
            agent_interactions: vec![AgentInteraction {
                from: "manager".to_string(),
                to: "researcher".to_string(),
                kind: "delegation".to_string(),
                timestamp: Some(1.0),
                data: None,
            }],
            tool_calls: vec![ToolCall {
                agent_id: "researcher".to_string(),
                tool_name: "fetch_paper".to_string(),
                success: true,
                duration: 0.4,
                timestamp: Some(2.0),
                context: None,
            }],
            coordination_events: vec![CoordinationEvent {
                manager: "manager".to_string(),
                coordination_type: "delegation".to_string(),
                target_agents: vec!["researcher".to_string()],
                timestamp: Some(1.0),
                data: None,
            }],
            timing_data: TimingData {
                start_time: 0.0,
                end_time: 3.0,
            },
        }
    }

    #[test]
    fn test_json_round_trip_is_identity() {
        let trace = sample_trace();
        let json = serde_json::to_string(&trace).unwrap();
        let back: TraceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trace, back);
    }

    #[test]
    fn test_missing_keys_default_to_unknown() {
        let interaction: AgentInteraction = serde_json::from_str(r#"{"type": "handoff"}"#).unwrap();
        assert_eq!(interaction.from, "unknown");
        assert_eq!(interaction.to, "unknown");

        let call: ToolCall = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(call.agent_id, "unknown");
        assert_eq!(call.tool_name, "unknown_tool");
    }

    #[test]
    fn test_unique_agent_ids_spans_calls_and_interactions() {
        let trace = sample_trace();
        let ids = trace.unique_agent_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("manager"));
        assert!(ids.contains("researcher"));
    }

    #[test]
    fn test_single_agent_requires_no_coordination_and_one_id() {
        let mut trace = TraceRecord::new("solo");
        trace.tool_calls.push(ToolCall {
            agent_id: "agent-1".to_string(),
            tool_name: "tool1".to_string(),
            success: true,
            duration: 0.1,
            timestamp: Some(1.0),
            context: None,
        });
        assert!(trace.is_single_agent());

        // Interactions between two agents break single-agent mode even
        // without coordination events.
        trace.agent_interactions.push(AgentInteraction {
            from: "agent-1".to_string(),
            to: "agent-2".to_string(),
            kind: "handoff".to_string(),
            timestamp: Some(2.0),
            data: None,
        });
        assert!(!trace.is_single_agent());
    }

    #[test]
    fn test_empty_trace_is_single_agent() {
        assert!(TraceRecord::new("empty").is_single_agent());
    }

    #[test]
    fn test_validate_rejects_inverted_timing() {
        let mut trace = TraceRecord::new("bad");
        trace.timing_data = TimingData {
            start_time: 5.0,
            end_time: 1.0,
        };
        assert!(trace.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_monotonic_timestamps() {
        let mut trace = TraceRecord::new("bad");
        for ts in [3.0, 1.0] {
            trace.tool_calls.push(ToolCall {
                agent_id: "a".to_string(),
                tool_name: "t".to_string(),
                success: true,
                duration: 0.0,
                timestamp: Some(ts),
                context: None,
            });
        }
        assert!(trace.validate().is_err());
    }

    #[test]
    fn test_validate_ignores_missing_timestamps() {
        let mut trace = TraceRecord::new("sparse");
        trace.tool_calls.push(ToolCall {
            agent_id: "a".to_string(),
            tool_name: "t1".to_string(),
            success: true,
            duration: 0.0,
            timestamp: Some(1.0),
            context: None,
        });
        trace.tool_calls.push(ToolCall {
            agent_id: "a".to_string(),
            tool_name: "t2".to_string(),
            success: true,
            duration: 0.0,
            timestamp: None,
            context: None,
        });
        trace.tool_calls.push(ToolCall {
            agent_id: "a".to_string(),
            tool_name: "t3".to_string(),
            success: true,
            duration: 0.0,
            timestamp: Some(2.0),
            context: None,
        });
        assert!(trace.validate().is_ok());
    }
}
