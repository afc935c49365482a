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

//! In-memory capture of agent interactions during a live run.
//!
//! The collector owns at most one active [`TraceRecord`] at a time. Log
//! calls append to the active record with a monotonic timestamp; calls made
//! while no execution is active are dropped with a warning. Nothing here
//! ever returns an error to the caller: tracing must not be able to break
//! the run it observes.

use parking_lot::Mutex;
use peerjudge_core::{
    AgentInteraction, CoordinationEvent, TimingData, ToolCall, TraceRecord,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::TraceStore;

struct CollectorState {
    active: Option<TraceRecord>,
    last_timestamp: f64,
}

/// Collects trace events for one execution at a time and persists the
/// frozen record into a [`TraceStore`].
pub struct TraceCollector {
    store: Arc<TraceStore>,
    state: Mutex<CollectorState>,
}

impl TraceCollector {
    /// Collector backed by the process-wide store.
    pub fn new() -> Self {
        Self::with_store(TraceStore::global())
    }

    /// Collector backed by an isolated store (parallel tests).
    pub fn with_store(store: Arc<TraceStore>) -> Self {
        Self {
            store,
            state: Mutex::new(CollectorState {
                active: None,
                last_timestamp: 0.0,
            }),
        }
    }

    /// Begin a new execution. An already-active execution is replaced with
    /// a warning; its partial record is discarded.
    pub fn start_execution(&self, execution_id: impl Into<String>) {
        let execution_id = execution_id.into();
        let execution_id = if execution_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            execution_id
        };

        let mut state = self.state.lock();
        if let Some(previous) = &state.active {
            warn!(
                previous = %previous.execution_id,
                replacement = %execution_id,
                "start_execution called while another execution is active; replacing"
            );
        }

        let now = epoch_seconds();
        let mut record = TraceRecord::new(&execution_id);
        record.timing_data = TimingData {
            start_time: now,
            end_time: now,
        };
        state.active = Some(record);
        state.last_timestamp = now;
        debug!(execution_id = %execution_id, "trace collection started");
    }

    /// Record an agent-to-agent interaction.
    pub fn log_agent_interaction(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        let mut state = self.state.lock();
        let timestamp = next_timestamp(&mut state);
        let Some(record) = state.active.as_mut() else {
            warn!("log_agent_interaction with no active execution; dropped");
            return;
        };
        record.agent_interactions.push(AgentInteraction {
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
            timestamp: Some(timestamp),
            data,
        });
    }

    /// Record a tool invocation.
    pub fn log_tool_call(
        &self,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
        success: bool,
        duration: f64,
        context: Option<String>,
    ) {
        let mut state = self.state.lock();
        let timestamp = next_timestamp(&mut state);
        let Some(record) = state.active.as_mut() else {
            warn!("log_tool_call with no active execution; dropped");
            return;
        };
        record.tool_calls.push(ToolCall {
            agent_id: agent_id.into(),
            tool_name: tool_name.into(),
            success,
            duration: duration.max(0.0),
            timestamp: Some(timestamp),
            context,
        });
    }

    /// Record a delegation/assignment event.
    pub fn log_coordination_event(
        &self,
        manager: impl Into<String>,
        coordination_type: impl Into<String>,
        target_agents: Vec<String>,
        data: Option<serde_json::Value>,
    ) {
        let mut state = self.state.lock();
        let timestamp = next_timestamp(&mut state);
        let Some(record) = state.active.as_mut() else {
            warn!("log_coordination_event with no active execution; dropped");
            return;
        };
        record.coordination_events.push(CoordinationEvent {
            manager: manager.into(),
            coordination_type: coordination_type.into(),
            target_agents,
            timestamp: Some(timestamp),
            data,
        });
    }

    /// Finalize timing, persist the record, and return it.
    ///
    /// Returns `None` (with a warning) when no execution is active.
    pub fn end_execution(&self) -> Option<TraceRecord> {
        let mut state = self.state.lock();
        let Some(mut record) = state.active.take() else {
            warn!("end_execution with no active execution");
            return None;
        };

        let now = epoch_seconds().max(state.last_timestamp);
        record.timing_data.end_time = now.max(record.timing_data.start_time);
        state.last_timestamp = now;
        drop(state);

        debug!(
            execution_id = %record.execution_id,
            interactions = record.agent_interactions.len(),
            tool_calls = record.tool_calls.len(),
            "trace collection finished"
        );
        self.store.insert(record.clone());
        Some(record)
    }

    /// Clone of the in-progress record, if any. Readers may observe a
    /// prefix of the sequences still being appended to.
    pub fn snapshot(&self) -> Option<TraceRecord> {
        self.state.lock().active.clone()
    }

    /// Whether an execution is currently active.
    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }
}

impl Default for TraceCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

// The wall clock can step backwards; event timestamps must not.
fn next_timestamp(state: &mut CollectorState) -> f64 {
    let now = epoch_seconds().max(state.last_timestamp);
    state.last_timestamp = now;
    now
}
