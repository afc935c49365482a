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

//! Caching layer for composite results.
//!
//! Re-evaluating an unchanged (paper, review, references, trace) tuple is
//! wasted LLM spend; sweep runners hit the same inputs repeatedly. Keys
//! are content hashes, so any input change misses.

use moka::future::Cache;
use peerjudge_core::CompositeResult;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// TTL cache of composite results keyed by input content.
pub struct CompositeCache {
    cache: Cache<CacheKey, CompositeResult>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CompositeCache {
    /// Create a cache with the given TTL in seconds.
    pub fn new(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Compute the cache key for an evaluation input.
    pub fn compute_key(
        &self,
        paper: &str,
        review: &str,
        reference_reviews: &[String],
        execution_id: Option<&str>,
    ) -> CacheKey {
        CacheKey::new(paper, review, reference_reviews, execution_id)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CompositeResult> {
        match self.cache.get(key).await {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set(&self, key: CacheKey, result: CompositeResult) {
        self.cache.insert(key, result).await;
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.cache.entry_count(),
        }
    }
}

/// Content-hash key over the evaluation inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    input_hash: u64,
    trace_hash: u64,
}

impl CacheKey {
    pub fn new(
        paper: &str,
        review: &str,
        reference_reviews: &[String],
        execution_id: Option<&str>,
    ) -> Self {
        use std::collections::hash_map::DefaultHasher;

        let mut hasher = DefaultHasher::new();
        paper.hash(&mut hasher);
        review.hash(&mut hasher);
        for reference in reference_reviews {
            reference.hash(&mut hasher);
        }
        let input_hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        execution_id.unwrap_or("").hash(&mut hasher);
        let trace_hash = hasher.finish();

        Self {
            input_hash,
            trace_hash,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entry_count: u64,
}
