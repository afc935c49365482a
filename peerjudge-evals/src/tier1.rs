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

//! Tier 1: lexical/semantic similarity engine.
//!
//! Deterministic text metrics comparing the agent review against
//! ground-truth reviews:
//!
//! - **Cosine**: TF-IDF over unigrams+bigrams with stop-word removal and a
//!   feature cap
//! - **Jaccard**: word-set intersection over union
//! - **Semantic**: embedding similarity when a client is configured,
//!   otherwise the cosine score (documented reduction)
//!
//! Each scalar takes the best match across all references. Every score is
//! clamped to [0,1] before the result is constructed; an individual metric
//! that cannot be computed contributes 0.0 with a warning, and the engine
//! itself never errors.

use async_trait::async_trait;
use peerjudge_core::{Tier1Config, Tier1Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm_client::EmbeddingClient;
use crate::{EvalError, TierContext, TierInput, TierOutput, TierPlugin};

/// Stop words removed before TF-IDF vectorization.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "if",
    "in", "into", "is", "it", "its", "of", "on", "or", "such", "that", "the", "their", "then",
    "there", "these", "they", "this", "to", "was", "were", "will", "with",
];

/// Similarity scalars for one comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimilarityScores {
    pub cosine: f64,
    pub jaccard: f64,
    pub semantic: f64,
}

/// Deterministic similarity engine.
pub struct SimilarityEngine {
    config: Tier1Config,
    embedding_client: Option<Arc<dyn EmbeddingClient>>,
}

impl SimilarityEngine {
    pub fn new(config: Tier1Config) -> Self {
        Self {
            config,
            embedding_client: None,
        }
    }

    /// Enable embedding-based semantic similarity.
    pub fn with_embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding_client = Some(client);
        self
    }

    pub fn has_embedding_client(&self) -> bool {
        self.embedding_client.is_some()
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|word| !word.is_empty() && !STOP_WORDS.contains(&word.as_str()))
            .collect()
    }

    /// Unigrams plus bigrams from the filtered token stream.
    fn terms(tokens: &[String]) -> Vec<String> {
        let mut terms: Vec<String> = tokens.to_vec();
        terms.extend(tokens.windows(2).map(|pair| pair.join(" ")));
        terms
    }

    /// TF-IDF cosine similarity between two texts.
    ///
    /// Identical texts score 1.0 (including two empty strings); one empty
    /// text scores 0.0.
    pub fn compute_cosine_similarity(&self, text1: &str, text2: &str) -> f64 {
        if text1.trim().is_empty() || text2.trim().is_empty() {
            return if text1 == text2 { 1.0 } else { 0.0 };
        }

        let terms1 = Self::terms(&Self::tokenize(text1));
        let terms2 = Self::terms(&Self::tokenize(text2));
        if terms1.is_empty() || terms2.is_empty() {
            warn!("cosine similarity over stop-word-only text; scoring 0.0");
            return 0.0;
        }

        let mut counts1: BTreeMap<&str, f64> = BTreeMap::new();
        for term in &terms1 {
            *counts1.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
        let mut counts2: BTreeMap<&str, f64> = BTreeMap::new();
        for term in &terms2 {
            *counts2.entry(term.as_str()).or_insert(0.0) += 1.0;
        }

        // Vocabulary capped by total frequency, ties broken lexicographically.
        let mut vocabulary: Vec<&str> = counts1
            .keys()
            .chain(counts2.keys())
            .copied()
            .collect::<HashSet<&str>>()
            .into_iter()
            .collect();
        vocabulary.sort_unstable();
        if vocabulary.len() > self.config.max_features {
            vocabulary.sort_by(|a, b| {
                let freq_a = counts1.get(a).unwrap_or(&0.0) + counts2.get(a).unwrap_or(&0.0);
                let freq_b = counts1.get(b).unwrap_or(&0.0) + counts2.get(b).unwrap_or(&0.0);
                freq_b
                    .partial_cmp(&freq_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.cmp(b))
            });
            vocabulary.truncate(self.config.max_features);
        }

        // Smoothed idf over the two-document corpus, as in the usual
        // vectorizer: ln((1+n)/(1+df)) + 1.
        let n_docs = 2.0;
        let (mut vec1, mut vec2) = (Vec::new(), Vec::new());
        for term in &vocabulary {
            let tf1 = counts1.get(term).copied().unwrap_or(0.0);
            let tf2 = counts2.get(term).copied().unwrap_or(0.0);
            let df = (tf1 > 0.0) as u32 + (tf2 > 0.0) as u32;
            let idf = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
            vec1.push(tf1 * idf);
            vec2.push(tf2 * idf);
        }

        cosine(&vec1, &vec2)
    }

    /// Word-level Jaccard similarity after lowercasing.
    /// Two empty word sets score 1.0; exactly one empty scores 0.0.
    pub fn compute_jaccard_similarity(&self, text1: &str, text2: &str) -> f64 {
        let words1: HashSet<String> = text1.to_lowercase().split_whitespace().map(String::from).collect();
        let words2: HashSet<String> = text2.to_lowercase().split_whitespace().map(String::from).collect();

        if words1.is_empty() && words2.is_empty() {
            return 1.0;
        }

        let intersection = words1.intersection(&words2).count();
        let union = words1.union(&words2).count();
        if union == 0 {
            return 0.0;
        }
        intersection as f64 / union as f64
    }

    /// Semantic similarity without an embedding client: the cosine score
    /// stands in (documented reduction).
    pub fn compute_semantic_similarity(&self, text1: &str, text2: &str) -> f64 {
        debug!("no embedding client; semantic similarity reduces to TF-IDF cosine");
        self.compute_cosine_similarity(text1, text2)
    }

    /// Semantic similarity via the embedding client when configured.
    /// Embedding failures log and fall back to the cosine reduction.
    pub async fn compute_semantic_async(&self, text1: &str, text2: &str) -> f64 {
        let Some(client) = &self.embedding_client else {
            return self.compute_semantic_similarity(text1, text2);
        };

        match client.embed_batch(&[text1.to_string(), text2.to_string()]).await {
            Ok(embeddings) if embeddings.len() == 2 => {
                cosine(&embeddings[0], &embeddings[1]).clamp(0.0, 1.0)
            }
            Ok(_) => {
                warn!("embedding client returned wrong batch size; using cosine fallback");
                self.compute_cosine_similarity(text1, text2)
            }
            Err(e) => {
                warn!(error = %e, "embedding failed; using cosine fallback");
                self.compute_cosine_similarity(text1, text2)
            }
        }
    }

    /// Exponential time decay clamped to [0,1]. Durations below 1 ms are
    /// floored to keep the score finite.
    pub fn measure_time_score(start_time: f64, end_time: f64) -> f64 {
        let duration = (end_time - start_time).max(1e-3);
        (-duration).exp().clamp(0.0, 1.0)
    }

    /// Best similarity scores across all references (maximum per scalar).
    pub fn find_best_match(&self, agent_output: &str, reference_texts: &[String]) -> SimilarityScores {
        let mut best = SimilarityScores::default();
        for reference in reference_texts {
            let scores = SimilarityScores {
                cosine: self.compute_cosine_similarity(agent_output, reference),
                jaccard: self.compute_jaccard_similarity(agent_output, reference),
                semantic: self.compute_semantic_similarity(agent_output, reference),
            };
            best.cosine = best.cosine.max(scores.cosine);
            best.jaccard = best.jaccard.max(scores.jaccard);
            best.semantic = best.semantic.max(scores.semantic);
        }
        best
    }

    fn weighted_similarity(&self, scores: &SimilarityScores) -> f64 {
        let weights = &self.config.success_weights;
        scores.semantic * weights.semantic
            + scores.cosine * weights.cosine
            + scores.jaccard * weights.jaccard
    }

    fn build_result(
        &self,
        scores: SimilarityScores,
        start_time: f64,
        end_time: f64,
    ) -> Tier1Result {
        let time_score = Self::measure_time_score(start_time, end_time);
        let task_success = if self.weighted_similarity(&scores) >= self.config.similarity_threshold
        {
            1.0
        } else {
            0.0
        };

        let weights = &self.config.overall_weights;
        let overall_score = scores.semantic * weights.semantic
            + scores.cosine * weights.cosine
            + scores.jaccard * weights.jaccard
            + time_score * self.config.time_weight;

        Tier1Result::clamped(
            scores.cosine,
            scores.jaccard,
            scores.semantic,
            time_score,
            task_success,
            overall_score,
            (end_time - start_time).max(1e-3),
        )
    }

    /// Full Tier-1 evaluation (synchronous path, cosine-reduced semantic).
    pub fn evaluate(
        &self,
        agent_output: &str,
        reference_texts: &[String],
        start_time: f64,
        end_time: f64,
    ) -> Tier1Result {
        let scores = self.find_best_match(agent_output, reference_texts);
        self.build_result(scores, start_time, end_time)
    }

    /// Full Tier-1 evaluation using embeddings for the semantic scalar
    /// when a client is configured.
    pub async fn evaluate_async(
        &self,
        agent_output: &str,
        reference_texts: &[String],
        start_time: f64,
        end_time: f64,
    ) -> Tier1Result {
        if self.embedding_client.is_none() {
            return self.evaluate(agent_output, reference_texts, start_time, end_time);
        }

        let mut scores = self.find_best_match(agent_output, reference_texts);
        let semantic_scores = futures::future::join_all(
            reference_texts
                .iter()
                .map(|reference| self.compute_semantic_async(agent_output, reference)),
        )
        .await;
        scores.semantic = semantic_scores.into_iter().fold(0.0, f64::max);
        self.build_result(scores, start_time, end_time)
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(Tier1Config::default())
    }
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Tier-1 plugin wrapping the similarity engine.
///
/// The lexical metrics are CPU-bound and run on a worker thread via
/// `spawn_blocking`; the embedding path is network-bound and stays on the
/// scheduler.
pub struct SimilarityPlugin {
    engine: Arc<SimilarityEngine>,
}

impl SimilarityPlugin {
    pub fn new(engine: SimilarityEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[async_trait]
impl TierPlugin for SimilarityPlugin {
    fn name(&self) -> &str {
        "traditional_metrics"
    }

    fn tier_number(&self) -> u8 {
        1
    }

    async fn evaluate(
        &self,
        input: &TierInput,
        _context: &TierContext,
    ) -> Result<TierOutput, EvalError> {
        if self.engine.has_embedding_client() {
            let result = self
                .engine
                .evaluate_async(
                    &input.review,
                    &input.reference_reviews,
                    input.start_time,
                    input.end_time,
                )
                .await;
            return Ok(TierOutput::Tier1(result));
        }

        let engine = self.engine.clone();
        let review = input.review.clone();
        let references = input.reference_reviews.clone();
        let (start_time, end_time) = (input.start_time, input.end_time);
        let result =
            tokio::task::spawn_blocking(move || engine.evaluate(&review, &references, start_time, end_time))
                .await
                .map_err(|e| EvalError::Internal(format!("tier 1 worker panicked: {e}")))?;
        Ok(TierOutput::Tier1(result))
    }
}
