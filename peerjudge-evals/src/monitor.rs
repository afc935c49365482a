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

//! Per-tier performance monitoring.
//!
//! Records tier start/stop, timeouts, and failures for the reporting layer.
//! The monitor carries no control-flow responsibility; it observes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Why a tier produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierFailureKind {
    Timeout,
    Error,
    Unavailable,
}

/// One recorded tier failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierFailure {
    pub tier: u8,
    pub kind: TierFailureKind,
    pub elapsed_seconds: f64,
    pub message: String,
}

/// Aggregated execution statistics for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Per-tier wall-clock seconds
    pub tier_times: BTreeMap<u8, f64>,
    /// Tiers that produced a result, in execution order
    pub tiers_executed: Vec<u8>,
    pub failures: Vec<TierFailure>,
    pub total_time: f64,
    pub fallback_used: bool,
}

/// Collects timing and failure records during orchestration.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    total_budget_seconds: f64,
    stats: Mutex<ExecutionStats>,
}

impl PerformanceMonitor {
    pub fn new(total_budget_seconds: f64) -> Self {
        Self {
            total_budget_seconds,
            stats: Mutex::new(ExecutionStats::default()),
        }
    }

    /// Clear all records before a new run.
    pub fn reset(&self) {
        *self.stats.lock() = ExecutionStats::default();
    }

    /// Record a tier that completed with a result.
    pub fn record_tier_execution(&self, tier: u8, elapsed_seconds: f64) {
        let mut stats = self.stats.lock();
        stats.tier_times.insert(tier, elapsed_seconds);
        stats.tiers_executed.push(tier);
    }

    /// Record a tier that produced no result.
    pub fn record_tier_failure(
        &self,
        tier: u8,
        kind: TierFailureKind,
        elapsed_seconds: f64,
        message: impl Into<String>,
    ) {
        let mut stats = self.stats.lock();
        stats.tier_times.insert(tier, elapsed_seconds);
        stats.failures.push(TierFailure {
            tier,
            kind,
            elapsed_seconds,
            message: message.into(),
        });
    }

    /// Mark that a fallback substitution was applied.
    pub fn record_fallback(&self) {
        self.stats.lock().fallback_used = true;
    }

    /// Record the total run time; warns when the global budget is
    /// exceeded (the budget never cancels in-flight work).
    pub fn finalize(&self, total_seconds: f64) {
        let mut stats = self.stats.lock();
        stats.total_time = total_seconds;
        if self.total_budget_seconds > 0.0 && total_seconds > self.total_budget_seconds {
            warn!(
                total = total_seconds,
                budget = self.total_budget_seconds,
                "evaluation exceeded the global time budget"
            );
        }
    }

    /// Snapshot of the current statistics.
    pub fn stats(&self) -> ExecutionStats {
        self.stats.lock().clone()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let stats = self.stats.lock();
        format!(
            "tiers={:?} failures={} total={:.2}s fallback={}",
            stats.tiers_executed,
            stats.failures.len(),
            stats.total_time,
            stats.fallback_used
        )
    }
}
