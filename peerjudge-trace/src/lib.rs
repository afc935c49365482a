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

//! # PeerJudge Trace
//!
//! Capture and normalization of agent execution traces:
//!
//! - [`TraceCollector`] records interactions, tool calls, and coordination
//!   events during a live run and freezes them into a
//!   [`peerjudge_core::TraceRecord`]
//! - [`TraceStore`] is the process-wide map of persisted records
//! - [`CcTraceAdapter`] parses external-runtime artifacts (solo sessions and
//!   agent teams) into the same record type
//!
//! Log calls on the collector never fail; errors are logged and swallowed so
//! tracing can never break the run it observes.

pub mod adapters;
pub mod collector;
pub mod store;

pub use adapters::{AdapterMode, CcTraceAdapter};
pub use collector::TraceCollector;
pub use store::TraceStore;
