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

//! # PeerJudge Evaluation Framework
//!
//! Three-tier evaluation of agent-generated peer reviews:
//!
//! - **Tier 1** ([`tier1::SimilarityEngine`]): lexical/semantic similarity
//!   against ground-truth reviews (TF-IDF cosine, Jaccard, optional
//!   embedding similarity)
//! - **Tier 2** ([`tier2::LlmJudgeEngine`]): LLM-as-judge quality scoring
//!   with deterministic fallbacks
//! - **Tier 3** ([`tier3::GraphAnalysisEngine`]): coordination metrics over
//!   the execution graph
//!
//! Tiers are plugins behind the [`TierPlugin`] trait, executed in tier
//! order by the [`orchestrator::JudgeAgent`] with per-tier timeouts and
//! failure isolation. The [`scorer::CompositeScorer`] folds tier outputs
//! into a single recommendation with dynamic weight redistribution, and
//! [`baseline`] diffs composite results across runtimes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use peerjudge_evals::orchestrator::JudgeAgent;
//! use peerjudge_core::JudgeConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let judge = JudgeAgent::new(JudgeConfig::default());
//!     let result = judge
//!         .evaluate_comprehensive(paper, review, Some(trace), references)
//!         .await
//!         .unwrap();
//!     println!("{} ({:.3})", result.recommendation, result.composite_score);
//! }
//! ```

use async_trait::async_trait;
use peerjudge_core::{Tier1Result, Tier2Result, Tier3Result, TraceRecord};
use thiserror::Error;

pub mod baseline;
pub mod cache;
pub mod llm_client;
pub mod monitor;
pub mod orchestrator;
pub mod registry;
pub mod scorer;
pub mod testing;
pub mod tier1;
pub mod tier2;
pub mod tier3;

pub use baseline::{compare, compare_all};
pub use cache::{CacheStats, CompositeCache};
pub use monitor::{ExecutionStats, PerformanceMonitor, TierFailureKind};
pub use orchestrator::JudgeAgent;
pub use registry::PluginRegistry;
pub use scorer::CompositeScorer;

/// Input shared by every tier plugin.
#[derive(Debug, Clone)]
pub struct TierInput {
    /// Paper text (already truncated to the configured excerpt length)
    pub paper: String,
    /// The review under evaluation (also the agent output for Tier 1)
    pub review: String,
    /// Ground-truth reviews for similarity comparison
    pub reference_reviews: Vec<String>,
    /// Execution trace, when one is available
    pub trace: Option<TraceRecord>,
    /// Wall-clock start of the evaluated run (epoch seconds)
    pub start_time: f64,
    /// Wall-clock end of the evaluated run (epoch seconds)
    pub end_time: f64,
}

/// Results from earlier tiers, passed to later ones.
#[derive(Debug, Clone, Default)]
pub struct TierContext {
    pub tier1: Option<Tier1Result>,
    pub tier2: Option<Tier2Result>,
}

/// Output of a single tier plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutput {
    Tier1(Tier1Result),
    Tier2(Tier2Result),
    Tier3(Tier3Result),
}

impl TierOutput {
    pub fn tier_number(&self) -> u8 {
        match self {
            TierOutput::Tier1(_) => 1,
            TierOutput::Tier2(_) => 2,
            TierOutput::Tier3(_) => 3,
        }
    }
}

/// A pluggable tier evaluator.
///
/// Plugins are registered with a [`PluginRegistry`] and executed in
/// ascending `tier_number` order. CPU-bound plugins must offload their
/// compute (`tokio::task::spawn_blocking`) so they cannot stall the
/// scheduler; the orchestrator only supplies the timeout.
#[async_trait]
pub trait TierPlugin: Send + Sync {
    /// Stable identifier, e.g. "traditional_metrics"
    fn name(&self) -> &str;

    /// Tier number controlling execution order
    fn tier_number(&self) -> u8;

    /// Whether the plugin can run at all (e.g., an LLM tier with no
    /// provider configured reports unavailable and is skipped).
    fn is_available(&self) -> bool {
        true
    }

    /// Evaluate the input, optionally consulting earlier tier results.
    async fn evaluate(
        &self,
        input: &TierInput,
        context: &TierContext,
    ) -> Result<TierOutput, EvalError>;
}

/// Errors raised inside tier evaluation.
///
/// These never cross the orchestrator boundary: a failing tier is recorded
/// and replaced with a null result or fallback.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("LLM client error: {0}")]
    LlmClient(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("evaluation timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
