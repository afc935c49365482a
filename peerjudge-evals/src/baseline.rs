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

//! Baseline comparison across agent runtimes.
//!
//! Diffs composite results pairwise: per-metric deltas over the metrics
//! both sides report, per-tier deltas (null when either side skipped the
//! tier), and a one-line summary. Deltas are purely numeric; recommendation
//! agreement is approximated by comparing scores, not by matching
//! recommendation text.
//!
//! Antisymmetry holds by construction: `compare(b, a)` negates every delta
//! of `compare(a, b)`.

use peerjudge_core::{BaselineComparison, CompositeResult};
use std::collections::BTreeMap;

/// Standard run labels for the three supported runtimes.
pub const LABEL_PYDANTIC_AI: &str = "PydanticAI";
pub const LABEL_CC_SOLO: &str = "CC-solo";
pub const LABEL_CC_TEAMS: &str = "CC-teams";

/// Pairwise diff of two composite results.
pub fn compare(
    result_a: &CompositeResult,
    result_b: &CompositeResult,
    label_a: &str,
    label_b: &str,
) -> BaselineComparison {
    let mut metric_deltas: BTreeMap<String, f64> = BTreeMap::new();
    for (metric, score_a) in &result_a.metric_scores {
        if let Some(score_b) = result_b.metric_scores.get(metric) {
            metric_deltas.insert(metric.clone(), score_a - score_b);
        }
    }

    let mut tier_deltas: BTreeMap<String, Option<f64>> = BTreeMap::new();
    tier_deltas.insert(
        "tier1".to_string(),
        Some(result_a.tier1_score - result_b.tier1_score),
    );
    tier_deltas.insert(
        "tier2".to_string(),
        match (result_a.tier2_score, result_b.tier2_score) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        },
    );
    tier_deltas.insert(
        "tier3".to_string(),
        Some(result_a.tier3_score - result_b.tier3_score),
    );

    let summary = summarize(label_a, label_b, &metric_deltas);

    BaselineComparison {
        label_a: label_a.to_string(),
        label_b: label_b.to_string(),
        result_a: result_a.clone(),
        result_b: result_b.clone(),
        metric_deltas,
        tier_deltas,
        summary,
    }
}

/// Three-way comparison across the standard runtimes. Pairs with a missing
/// side are skipped, so the result holds between zero and three entries.
pub fn compare_all(
    pydantic_ai: &CompositeResult,
    cc_solo: Option<&CompositeResult>,
    cc_teams: Option<&CompositeResult>,
) -> Vec<BaselineComparison> {
    let mut comparisons = Vec::new();

    if let Some(solo) = cc_solo {
        comparisons.push(compare(pydantic_ai, solo, LABEL_PYDANTIC_AI, LABEL_CC_SOLO));
    }
    if let Some(teams) = cc_teams {
        comparisons.push(compare(
            pydantic_ai,
            teams,
            LABEL_PYDANTIC_AI,
            LABEL_CC_TEAMS,
        ));
    }
    if let (Some(solo), Some(teams)) = (cc_solo, cc_teams) {
        comparisons.push(compare(solo, teams, LABEL_CC_SOLO, LABEL_CC_TEAMS));
    }

    comparisons
}

// Average guarded against an empty delta set; no division by zero.
fn summarize(label_a: &str, label_b: &str, metric_deltas: &BTreeMap<String, f64>) -> String {
    if metric_deltas.is_empty() {
        return format!("{label_a} vs {label_b}: no overlapping metrics to compare");
    }

    let average: f64 = metric_deltas.values().sum::<f64>() / metric_deltas.len() as f64;
    let (largest_metric, largest_delta) = metric_deltas
        .iter()
        .max_by(|a, b| {
            a.1.abs()
                .partial_cmp(&b.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(metric, delta)| (metric.as_str(), *delta))
        .unwrap_or(("none", 0.0));

    format!(
        "{label_a} scored {average:+.2} on average vs {label_b}; largest gap: {largest_metric} ({largest_delta:+.2})"
    )
}
