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

//! End-to-end adapter tests over realistic directory layouts, including the
//! sibling tasks layout used by the real runtime
//! (`<base>/teams/<name>/` next to `<base>/tasks/<name>/`).

use peerjudge_trace::{AdapterMode, CcTraceAdapter};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_team_config(dir: &Path, team_name: &str) {
    fs::write(
        dir.join("config.json"),
        format!(
            r#"{{
                "team_name": "{team_name}",
                "members": [
                    {{"name": "lead", "agentId": "lead-1", "agentType": "manager"}},
                    {{"name": "writer", "agentId": "writer-1", "agentType": "worker"}}
                ]
            }}"#
        ),
    )
    .unwrap();
}

fn write_inbox_messages(dir: &Path) {
    let inboxes = dir.join("inboxes");
    fs::create_dir(&inboxes).unwrap();
    fs::write(
        inboxes.join("msg-001.json"),
        r#"{"from": "lead", "to": "writer", "type": "task_assignment", "timestamp": 1708000000.0}"#,
    )
    .unwrap();
    fs::write(
        inboxes.join("msg-002.json"),
        r#"{"from": "writer", "to": "lead", "type": "completion", "timestamp": 1708000100.0}"#,
    )
    .unwrap();
}

fn write_task(dir: &Path) {
    fs::write(
        dir.join("1.json"),
        r#"{
            "id": "1", "owner": "writer", "status": "completed",
            "created_at": 1708000010.0, "completed_at": 1708000095.0,
            "title": "Draft review"
        }"#,
    )
    .unwrap();
}

#[test]
fn teams_mode_with_sibling_tasks_layout() {
    // <base>/teams/review-team + <base>/tasks/review-team
    let base = TempDir::new().unwrap();
    let team_dir = base.path().join("teams").join("review-team");
    let tasks_dir = base.path().join("tasks").join("review-team");
    fs::create_dir_all(&team_dir).unwrap();
    fs::create_dir_all(&tasks_dir).unwrap();

    write_team_config(&team_dir, "review-team");
    write_inbox_messages(&team_dir);
    write_task(&tasks_dir);

    let adapter = CcTraceAdapter::new(&team_dir).unwrap();
    assert_eq!(adapter.mode(), AdapterMode::Teams);

    let record = adapter.parse().unwrap();
    assert_eq!(record.execution_id, "review-team");
    assert_eq!(record.agent_interactions.len(), 2);
    assert_eq!(record.tool_calls.len(), 1);
    assert_eq!(record.tool_calls[0].tool_name, "task_1");
    assert_eq!(record.timing_data.start_time, 1708000000.0);
    assert_eq!(record.timing_data.end_time, 1708000100.0);
}

#[test]
fn teams_mode_with_child_tasks_layout() {
    let dir = TempDir::new().unwrap();
    write_team_config(dir.path(), "child-team");
    write_inbox_messages(dir.path());
    let tasks = dir.path().join("tasks");
    fs::create_dir(&tasks).unwrap();
    write_task(&tasks);

    let record = CcTraceAdapter::new(dir.path()).unwrap().parse().unwrap();
    assert_eq!(record.tool_calls.len(), 1);
}

#[test]
fn explicit_tasks_dir_wins_over_discovery() {
    let dir = TempDir::new().unwrap();
    write_team_config(dir.path(), "explicit-team");

    let elsewhere = TempDir::new().unwrap();
    write_task(elsewhere.path());

    let record = CcTraceAdapter::new(dir.path())
        .unwrap()
        .with_tasks_dir(elsewhere.path())
        .parse()
        .unwrap();
    assert_eq!(record.tool_calls.len(), 1);
}

#[test]
fn missing_tasks_dir_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    write_team_config(dir.path(), "taskless");
    write_inbox_messages(dir.path());

    let record = CcTraceAdapter::new(dir.path()).unwrap().parse().unwrap();
    assert!(record.tool_calls.is_empty());
    assert_eq!(record.agent_interactions.len(), 2);
}

#[test]
fn solo_mode_end_to_end() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("metadata.json"),
        r#"{"session_id": "cc-session", "start_time": 10.0, "end_time": 42.0}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("tool_calls.jsonl"),
        r#"{"tool_name": "bash", "timestamp": 11.0, "success": true, "duration": 1.5, "agent_id": "cc"}"#,
    )
    .unwrap();

    let adapter = CcTraceAdapter::new(dir.path()).unwrap();
    assert_eq!(adapter.mode(), AdapterMode::Solo);

    let record = adapter.parse().unwrap();
    assert_eq!(record.execution_id, "cc-session");
    assert!(record.is_single_agent());
    assert!(record.timing_data.start_time <= record.timing_data.end_time);
}

#[test]
fn url_input_reports_url_not_file_not_found() {
    let err = CcTraceAdapter::new("https://example.com/x.pdf").unwrap_err();
    let message = err.to_string().to_lowercase();
    assert!(message.contains("url") || message.contains("http"));
}
