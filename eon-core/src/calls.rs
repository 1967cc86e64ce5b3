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

//! Calls, routes, and transparent segments (spec §3).

use crate::modulation::ModulationScheme;
use crate::topology::{LinkId, NodeId};

/// A call's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Generated but not yet handed to the RMSA pipeline.
    Pending,
    /// Admitted and holding its reservation.
    Active,
    /// Admission failed; no reservation held.
    Blocked,
    /// Departed; reservation released.
    Cleared,
}

/// A single call request.
#[derive(Debug, Clone)]
pub struct Call {
    /// Unique identifier, used as the slot/regenerator reservation key.
    pub id: u64,
    /// Source node.
    pub source: NodeId,
    /// Destination node.
    pub destination: NodeId,
    /// Requested bitrate, Gb/s.
    pub bitrate_gbps: f64,
    /// Arrival time, simulation time units.
    pub arrival_time: f64,
    /// Holding duration, simulation time units (exponentially distributed).
    pub duration: f64,
    /// Current lifecycle state.
    pub state: CallState,
}

/// A maximal sub-path without regeneration: the unit the regenerator
/// assignment algorithms carve a route into.
#[derive(Debug, Clone)]
pub struct TransparentSegment {
    /// Links traversed by this segment, in order.
    pub links: Vec<LinkId>,
    /// Node where the segment starts (a regenerator site or the call source).
    pub start: NodeId,
    /// Node where the segment ends (a regenerator site or the call destination).
    pub end: NodeId,
    /// Modulation scheme selected for this segment.
    pub scheme: ModulationScheme,
    /// Slot indices reserved on every link of this segment.
    pub slots: Vec<u32>,
    /// Number of regenerators consumed at `end` (0 for the call's final segment).
    pub regenerators_used: u32,
}

/// A fully routed and resourced call: an ordered link list partitioned into
/// transparent segments.
#[derive(Debug, Clone)]
pub struct Route {
    /// All links traversed, in order, across every segment.
    pub links: Vec<LinkId>,
    /// The transparent segments this route was partitioned into.
    pub segments: Vec<TransparentSegment>,
}

impl Route {
    /// Total regenerators consumed along this route.
    pub fn total_regenerators(&self) -> u32 {
        self.segments.iter().map(|s| s.regenerators_used).sum()
    }
}
