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

//! Error taxonomy for the judge subsystem.
//!
//! Tier failures are not represented here: the orchestrator is the error
//! boundary for tier execution and converts failures into null results or
//! fallbacks. What remains are errors that must surface to callers.

use thiserror::Error;

/// Errors surfaced by judge components.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Input size, range, or shape violates the schema.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or unparseable required adapter input.
    #[error("malformed artifact: {0}")]
    MalformedArtifact(String),

    /// No usable configuration (e.g., unknown provider name).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No tier produced a result; the composite cannot be computed.
    #[error("cannot score: {0}")]
    CannotScore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
