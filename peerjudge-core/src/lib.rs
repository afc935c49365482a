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

//! # PeerJudge Core
//!
//! Shared data model for the three-tier review evaluation framework:
//!
//! - Execution traces ([`TraceRecord`]) captured from agent runtimes
//! - Per-tier results ([`Tier1Result`], [`Tier2Result`], [`Tier3Result`])
//! - The composite verdict ([`CompositeResult`]) and cross-runtime diffs
//!   ([`BaselineComparison`])
//! - Judge configuration ([`JudgeConfig`]) and the error taxonomy
//!   ([`JudgeError`])
//!
//! Every public type is `serde`-serializable; trace records round-trip
//! through JSON without loss so they can be persisted and replayed.

pub mod config;
pub mod error;
pub mod results;
pub mod trace;
pub mod validation;

pub use config::{
    CompositeConfig, FallbackStrategy, InputLimits, JudgeConfig, SimilarityWeights, Tier1Config,
    Tier2Config, Tier3Config,
};
pub use error::JudgeError;
pub use results::{
    BaselineComparison, CompositeResult, EvaluationResults, Recommendation, Tier1Result,
    Tier2Result, Tier3Result,
};
pub use trace::{AgentInteraction, CoordinationEvent, TimingData, ToolCall, TraceRecord};
pub use validation::validate_evaluation_input;
