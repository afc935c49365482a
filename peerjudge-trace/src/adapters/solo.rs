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

//! Solo-session artifact parsing.
//!
//! Layout:
//! - `metadata.json`: `{session_id, start_time, end_time, ...}` (required)
//! - `tool_calls.jsonl`: one tool-call object per line (optional)
//!
//! Solo sessions have no agent-to-agent traffic, so the resulting record
//! has empty interaction and coordination sequences.

use peerjudge_core::{JudgeError, TimingData, ToolCall, TraceRecord};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct SessionMetadata {
    #[serde(default = "unknown_session")]
    session_id: String,
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    end_time: f64,
}

fn unknown_session() -> String {
    "unknown-session".to_string()
}

pub(super) fn parse(artifacts_dir: &Path) -> Result<TraceRecord, JudgeError> {
    let metadata_path = artifacts_dir.join("metadata.json");
    if !metadata_path.exists() {
        return Err(JudgeError::MalformedArtifact(
            "no solo artifacts found: metadata.json missing".to_string(),
        ));
    }

    let contents = std::fs::read_to_string(&metadata_path)?;
    let metadata: SessionMetadata = serde_json::from_str(&contents).map_err(|e| {
        JudgeError::MalformedArtifact(format!("failed to parse metadata.json: {e}"))
    })?;

    let mut record = TraceRecord::new(metadata.session_id);
    record.timing_data = TimingData {
        start_time: metadata.start_time,
        end_time: metadata.end_time.max(metadata.start_time),
    };
    record.tool_calls = parse_tool_calls(artifacts_dir);

    Ok(record)
}

/// Parse `tool_calls.jsonl` line by line. Malformed lines are logged and
/// skipped; a missing file yields an empty sequence.
fn parse_tool_calls(artifacts_dir: &Path) -> Vec<ToolCall> {
    let path = artifacts_dir.join("tool_calls.jsonl");
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };

    let mut calls: Vec<ToolCall> = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => calls.push(call),
            Err(e) => {
                warn!(line = line_number + 1, error = %e, "skipping malformed tool call line");
            }
        }
    }

    calls.sort_by(|a, b| {
        let ta = a.timestamp.unwrap_or(0.0);
        let tb = b.timestamp.unwrap_or(0.0);
        ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
    });
    calls
}
