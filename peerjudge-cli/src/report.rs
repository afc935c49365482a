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

//! Markdown rendering of evaluation results.

use peerjudge_core::{BaselineComparison, CompositeResult};
use std::fmt::Write;

/// Render a composite result (and optional baseline comparisons) as a
/// markdown report.
pub fn render(result: &CompositeResult, comparisons: &[BaselineComparison]) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "# Review Evaluation Report\n");
    let _ = writeln!(
        report,
        "**Recommendation:** {} (weight {:+.1})",
        result.recommendation, result.recommendation_weight
    );
    let _ = writeln!(
        report,
        "**Composite score:** {:.3}\n",
        result.composite_score
    );

    let _ = writeln!(report, "## Tier scores\n");
    let _ = writeln!(report, "| Tier | Score |");
    let _ = writeln!(report, "|---|---|");
    let _ = writeln!(report, "| 1 (similarity) | {:.3} |", result.tier1_score);
    match result.tier2_score {
        Some(score) => {
            let _ = writeln!(report, "| 2 (LLM judge) | {score:.3} |");
        }
        None => {
            let _ = writeln!(report, "| 2 (LLM judge) | skipped |");
        }
    }
    let _ = writeln!(report, "| 3 (graph) | {:.3} |\n", result.tier3_score);

    let _ = writeln!(report, "## Metrics\n");
    let _ = writeln!(report, "| Metric | Value | Weight |");
    let _ = writeln!(report, "|---|---|---|");
    for (metric, value) in &result.metric_scores {
        let weight = result.weights_used.get(metric).copied().unwrap_or(0.0);
        let _ = writeln!(report, "| {metric} | {value:.3} | {weight:.3} |");
    }
    let _ = writeln!(report);

    let mut flags: Vec<&str> = Vec::new();
    if !result.evaluation_complete {
        flags.push("incomplete evaluation");
    }
    if result.single_agent_mode {
        flags.push("single-agent mode");
    }
    if result.fallback_used {
        flags.push("fallback used");
    }
    if !flags.is_empty() {
        let _ = writeln!(report, "> Degradation: {}\n", flags.join(", "));
    }

    if !comparisons.is_empty() {
        let _ = writeln!(report, "## Baseline comparison\n");
        for comparison in comparisons {
            let _ = writeln!(report, "- {}", comparison.summary);
        }
        let _ = writeln!(report);
    }

    report
}
