// BgpSim: BGP Network Simulator written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Convenience re-export of common members.

pub use crate::calls::{Call, CallState, Route};
pub use crate::config::{BitrateProfile, LinkConfig, NodeConfig, SimulationConfig, TopologyConfig};
pub use crate::context::SimulationContext;
pub use crate::error::{BlockCause, ConfigError, NumericError, RmsaError};
pub use crate::event::{BasicEventQueue, Event, EventKind, EventQueue};
pub use crate::metrics::{CallOutcome, SimulationResult};
pub use crate::modulation::ModulationScheme;
pub use crate::regenerator::RegeneratorAssignment;
pub use crate::rmsa::Rmsa;
pub use crate::routing::RoutingAlgorithm;
pub use crate::simulation::{CallGenerator, NetworkSimulator};
pub use crate::spectrum::SpectrumAssignment;
pub use crate::topology::{LinkId, Node, NodeId, NodeType, Topology};
