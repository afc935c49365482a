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

//! Adapters for external-runtime trace artifacts.
//!
//! Two artifact layouts are supported and auto-detected from the directory
//! contents:
//!
//! - **Solo**: a session export with `metadata.json` and `tool_calls.jsonl`
//! - **Teams**: a team directory with `config.json`, an `inboxes/` directory
//!   of per-message JSON files, and a tasks directory (sibling or child)
//!
//! Both parse into [`peerjudge_core::TraceRecord`]. Mode is derived, never
//! configured: a `config.json` with a `members` array means teams; a
//! present-but-malformed `config.json` is treated as an attempted teams
//! layout so `parse` surfaces a clear error instead of silently falling
//! back to solo.

mod solo;
mod teams;

use peerjudge_core::{JudgeError, TraceRecord};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Detected artifact layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterMode {
    Solo,
    Teams,
}

impl fmt::Display for AdapterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterMode::Solo => f.write_str("solo"),
            AdapterMode::Teams => f.write_str("teams"),
        }
    }
}

/// Parses external-runtime artifacts into a [`TraceRecord`].
#[derive(Debug)]
pub struct CcTraceAdapter {
    artifacts_dir: PathBuf,
    tasks_dir: Option<PathBuf>,
    mode: AdapterMode,
}

impl CcTraceAdapter {
    /// Create an adapter for the given artifacts directory.
    ///
    /// Fails up front when the path is a URL (artifacts must be local) or
    /// does not exist; mode detection happens here, parsing in
    /// [`CcTraceAdapter::parse`].
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Result<Self, JudgeError> {
        let artifacts_dir = artifacts_dir.into();

        let path_str = artifacts_dir.to_string_lossy();
        if path_str.starts_with("http://") || path_str.starts_with("https://") {
            return Err(JudgeError::MalformedArtifact(format!(
                "artifacts path is a URL, not a local directory: {path_str}"
            )));
        }
        if !artifacts_dir.exists() {
            return Err(JudgeError::MalformedArtifact(format!(
                "artifacts directory does not exist: {}",
                artifacts_dir.display()
            )));
        }

        let mode = detect_mode(&artifacts_dir);
        let tasks_dir = match mode {
            AdapterMode::Teams => resolve_tasks_dir(&artifacts_dir, None),
            AdapterMode::Solo => None,
        };
        debug!(mode = %mode, dir = %artifacts_dir.display(), "trace adapter initialized");

        Ok(Self {
            artifacts_dir,
            tasks_dir,
            mode,
        })
    }

    /// Override tasks-directory auto-discovery with an explicit path.
    pub fn with_tasks_dir(mut self, tasks_dir: impl Into<PathBuf>) -> Self {
        let tasks_dir = tasks_dir.into();
        self.tasks_dir = resolve_tasks_dir(&self.artifacts_dir, Some(tasks_dir));
        self
    }

    pub fn mode(&self) -> AdapterMode {
        self.mode
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Parse the artifacts into a normalized trace record.
    pub fn parse(&self) -> Result<TraceRecord, JudgeError> {
        match self.mode {
            AdapterMode::Teams => teams::parse(&self.artifacts_dir, self.tasks_dir.as_deref()),
            AdapterMode::Solo => solo::parse(&self.artifacts_dir),
        }
    }
}

/// A `config.json` with a `members` array (or at least a `team_name`) means
/// teams mode. Malformed JSON in `config.json` also selects teams so the
/// parse error names the real problem.
fn detect_mode(artifacts_dir: &Path) -> AdapterMode {
    let config_path = artifacts_dir.join("config.json");
    let Ok(contents) = std::fs::read_to_string(&config_path) else {
        return AdapterMode::Solo;
    };

    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(config) => {
            if config.get("members").map(|m| m.is_array()).unwrap_or(false)
                || config.get("team_name").is_some()
            {
                AdapterMode::Teams
            } else {
                AdapterMode::Solo
            }
        }
        Err(_) => AdapterMode::Teams,
    }
}

/// Resolve the tasks directory for teams mode.
///
/// Order: explicit path, then the sibling layout
/// `<parent-of-teams>/tasks/<team-dir-name>`, then the child layout
/// `<artifacts>/tasks`. Absence is not an error; tasks are optional.
fn resolve_tasks_dir(artifacts_dir: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(explicit) = explicit {
        if explicit.exists() {
            return Some(explicit);
        }
        tracing::warn!(
            path = %explicit.display(),
            "explicit tasks directory does not exist; falling back to auto-discovery"
        );
    }

    if let (Some(team_name), Some(grandparent)) = (
        artifacts_dir.file_name(),
        artifacts_dir.parent().and_then(|p| p.parent()),
    ) {
        let sibling = grandparent.join("tasks").join(team_name);
        if sibling.exists() {
            debug!(path = %sibling.display(), "tasks directory found via sibling layout");
            return Some(sibling);
        }
    }

    let child = artifacts_dir.join("tasks");
    if child.exists() {
        debug!(path = %child.display(), "tasks directory found via child layout");
        return Some(child);
    }

    debug!("no tasks directory found (sibling or child layout)");
    None
}

/// Files in a directory with the given extension, sorted by file name for
/// deterministic parse order.
pub(crate) fn sorted_files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map(|e| e == extension).unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_url_path_is_rejected_before_io() {
        let err = CcTraceAdapter::new("https://example.com/artifacts").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("URL"));
        assert!(!message.contains("does not exist"));
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let err = CcTraceAdapter::new("/nonexistent/peerjudge/artifacts").unwrap_err();
        assert!(matches!(err, JudgeError::MalformedArtifact(_)));
    }

    #[test]
    fn test_mode_detection_solo_without_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metadata.json"),
            r#"{"session_id": "s", "start_time": 0.0, "end_time": 1.0}"#,
        )
        .unwrap();

        let adapter = CcTraceAdapter::new(dir.path()).unwrap();
        assert_eq!(adapter.mode(), AdapterMode::Solo);
    }

    #[test]
    fn test_mode_detection_teams_with_members() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"team_name": "alpha", "members": []}"#,
        )
        .unwrap();

        let adapter = CcTraceAdapter::new(dir.path()).unwrap();
        assert_eq!(adapter.mode(), AdapterMode::Teams);
    }

    #[test]
    fn test_malformed_config_treated_as_teams() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();

        let adapter = CcTraceAdapter::new(dir.path()).unwrap();
        assert_eq!(adapter.mode(), AdapterMode::Teams);
        // And parsing surfaces the malformed artifact.
        assert!(adapter.parse().is_err());
    }

    #[test]
    fn test_config_without_members_or_team_name_is_solo() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"other": 1}"#).unwrap();
        fs::write(
            dir.path().join("metadata.json"),
            r#"{"session_id": "s", "start_time": 0.0, "end_time": 1.0}"#,
        )
        .unwrap();

        let adapter = CcTraceAdapter::new(dir.path()).unwrap();
        assert_eq!(adapter.mode(), AdapterMode::Solo);
    }
}
