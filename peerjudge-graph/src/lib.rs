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

//! # PeerJudge Graph
//!
//! Directed interaction graphs built from execution traces, plus the
//! coordination metrics computed over them for Tier-3 analysis.
//!
//! The graph is deliberately simple (no parallel edges): a repeated
//! `(source, target)` pair overwrites the previous edge's attributes.
//! Tests pin this merge behavior so a future multigraph upgrade is a
//! deliberate semantic change, not an accident.

pub mod builder;
pub mod graph;
pub mod metrics;

pub use builder::build_interaction_graph;
pub use graph::{EdgeAttributes, InteractionGraph, NodeType};
