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

//! Process-wide trace storage.
//!
//! The store owns every frozen [`TraceRecord`], keyed by execution id. A
//! single lock guards all mutation and `clear`; readers take the same lock
//! briefly. Persistence is in-memory only; the store lives for the process
//! lifetime.
//!
//! Tests that run in parallel should use isolated instances via
//! [`TraceStore::new`] rather than the global store.

use parking_lot::RwLock;
use peerjudge_core::TraceRecord;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL_STORE: OnceLock<Arc<TraceStore>> = OnceLock::new();

/// In-memory mapping of `execution_id -> TraceRecord`.
#[derive(Debug, Default)]
pub struct TraceStore {
    records: RwLock<HashMap<String, TraceRecord>>,
}

impl TraceStore {
    /// Create an isolated store instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store, initialized on first use.
    pub fn global() -> Arc<TraceStore> {
        GLOBAL_STORE
            .get_or_init(|| Arc::new(TraceStore::new()))
            .clone()
    }

    /// Persist a record under its execution id, replacing any previous
    /// record with the same id.
    pub fn insert(&self, record: TraceRecord) {
        let mut records = self.records.write();
        records.insert(record.execution_id.clone(), record);
    }

    /// Look up a record by execution id. Returns `None` on miss.
    pub fn load_trace(&self, execution_id: &str) -> Option<TraceRecord> {
        self.records.read().get(execution_id).cloned()
    }

    /// Remove every stored record.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Execution ids currently stored, in unspecified order.
    pub fn execution_ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }
}
