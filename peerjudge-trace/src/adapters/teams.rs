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

//! Agent-teams artifact parsing.
//!
//! Layout:
//! - `config.json`: `{team_name, members: [...], ...}` (required)
//! - `inboxes/*.json`: one message per file `{from, to, type, timestamp}`
//! - tasks directory (resolved by the adapter): `*.json` task records
//!
//! Inbox messages are the coordination channel in this runtime: each
//! message becomes both an agent interaction and a coordination event.
//! Completed tasks stand in for tool calls (`tool_name = "task_<id>"`),
//! since the runtime does not export per-tool telemetry.

use peerjudge_core::{
    AgentInteraction, CoordinationEvent, JudgeError, TimingData, ToolCall, TraceRecord,
};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use super::sorted_files_with_extension;

#[derive(Debug, Deserialize)]
struct TeamConfig {
    #[serde(default = "unknown_team")]
    team_name: String,
    #[serde(default)]
    #[allow(dead_code)]
    members: Vec<serde_json::Value>,
}

fn unknown_team() -> String {
    "unknown-team".to_string()
}

#[derive(Debug, Deserialize)]
struct InboxMessage {
    #[serde(default = "unknown_agent")]
    from: String,
    #[serde(default = "unknown_agent")]
    to: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

fn unknown_agent() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(default = "unknown_id")]
    id: String,
    #[serde(default = "unknown_agent")]
    owner: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: f64,
    #[serde(default)]
    completed_at: Option<f64>,
    #[serde(default)]
    title: Option<String>,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

pub(super) fn parse(
    artifacts_dir: &Path,
    tasks_dir: Option<&Path>,
) -> Result<TraceRecord, JudgeError> {
    let config_path = artifacts_dir.join("config.json");
    if !config_path.exists() {
        return Err(JudgeError::MalformedArtifact(
            "no team artifacts found: config.json missing".to_string(),
        ));
    }

    let contents = std::fs::read_to_string(&config_path)?;
    let config: TeamConfig = serde_json::from_str(&contents)
        .map_err(|e| JudgeError::MalformedArtifact(format!("failed to parse config.json: {e}")))?;

    let messages = parse_inbox_messages(artifacts_dir);
    let tool_calls = parse_team_tasks(tasks_dir);
    let timing_data = derive_timing(&messages, &tool_calls);

    let mut record = TraceRecord::new(config.team_name);
    record.coordination_events = messages
        .iter()
        .map(|message| CoordinationEvent {
            manager: message.from.clone(),
            coordination_type: message.kind.clone(),
            target_agents: vec![message.to.clone()],
            timestamp: message.timestamp,
            data: message.content.clone(),
        })
        .collect();
    record.agent_interactions = messages
        .into_iter()
        .map(|message| AgentInteraction {
            from: message.from,
            to: message.to,
            kind: message.kind,
            timestamp: message.timestamp,
            data: message.content,
        })
        .collect();
    record.tool_calls = tool_calls;
    record.timing_data = timing_data;

    Ok(record)
}

/// Messages from `inboxes/*.json`, ordered by timestamp. Malformed files
/// are logged and skipped; a missing directory yields no messages.
fn parse_inbox_messages(artifacts_dir: &Path) -> Vec<InboxMessage> {
    let inboxes_dir = artifacts_dir.join("inboxes");
    let mut messages: Vec<InboxMessage> = Vec::new();

    for path in sorted_files_with_extension(&inboxes_dir, "json") {
        match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<InboxMessage>(&text).map_err(|e| e.to_string()))
        {
            Ok(message) => messages.push(message),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping malformed inbox message"),
        }
    }

    messages.sort_by(|a, b| {
        let ta = a.timestamp.unwrap_or(0.0);
        let tb = b.timestamp.unwrap_or(0.0);
        ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
    });
    messages
}

/// Completed tasks become tool-call proxies. Tasks in any other status are
/// ignored; malformed task files are logged and skipped.
fn parse_team_tasks(tasks_dir: Option<&Path>) -> Vec<ToolCall> {
    let Some(tasks_dir) = tasks_dir else {
        return Vec::new();
    };

    let mut calls: Vec<ToolCall> = Vec::new();
    for path in sorted_files_with_extension(tasks_dir, "json") {
        let task = match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<TaskRecord>(&text).map_err(|e| e.to_string()))
        {
            Ok(task) => task,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping malformed task record");
                continue;
            }
        };

        if task.status != "completed" {
            continue;
        }

        let completed_at = task.completed_at.unwrap_or(task.created_at);
        calls.push(ToolCall {
            agent_id: task.owner,
            tool_name: format!("task_{}", task.id),
            success: true,
            duration: (completed_at - task.created_at).max(0.0),
            timestamp: Some(completed_at),
            context: task.title,
        });
    }

    calls.sort_by(|a, b| {
        let ta = a.timestamp.unwrap_or(0.0);
        let tb = b.timestamp.unwrap_or(0.0);
        ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
    });
    calls
}

/// Run boundaries from the first and last timestamp across messages and
/// tool-call proxies.
fn derive_timing(messages: &[InboxMessage], tool_calls: &[ToolCall]) -> TimingData {
    let timestamps: Vec<f64> = messages
        .iter()
        .filter_map(|m| m.timestamp)
        .chain(tool_calls.iter().filter_map(|c| c.timestamp))
        .collect();

    match (
        timestamps.iter().cloned().reduce(f64::min),
        timestamps.iter().cloned().reduce(f64::max),
    ) {
        (Some(start), Some(end)) => TimingData {
            start_time: start,
            end_time: end,
        },
        _ => TimingData::default(),
    }
}
