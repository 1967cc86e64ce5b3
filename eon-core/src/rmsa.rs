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

//! The RMSA pipeline: routing, modulation, spectrum assignment and
//! regenerator assignment composed into a single per-call operation.

use crate::calls::{Call, Route};
use crate::context::SimulationContext;
use crate::error::{BlockCause, RmsaError};
use crate::regenerator::RegeneratorAssignment;
use crate::routing::RoutingAlgorithm;
use crate::spectrum::SpectrumAssignment;
use crate::topology::Topology;

/// The algorithm set a simulation run is configured with, bundled so
/// `assign_call` has a single thing to hold rather than three loose enums.
#[derive(Debug, Clone)]
pub struct Rmsa {
    /// Routing policy.
    pub routing: RoutingAlgorithm,
    /// Spectrum assignment policy.
    pub spectrum: SpectrumAssignment,
    /// Regenerator assignment policy.
    pub regenerator: RegeneratorAssignment,
}

impl Rmsa {
    /// Construct a pipeline from its three component algorithms.
    pub fn new(
        routing: RoutingAlgorithm,
        spectrum: SpectrumAssignment,
        regenerator: RegeneratorAssignment,
    ) -> Self {
        Rmsa {
            routing,
            spectrum,
            regenerator,
        }
    }

    /// Route and resource a call: find a path, partition it into
    /// transparent segments each under a feasible modulation scheme, and
    /// reserve spectrum/regenerators along the way. On success the
    /// reservation is committed to `topology`; on [`BlockCause`] failure
    /// nothing is reserved.
    pub fn assign_call(
        &self,
        topology: &mut Topology,
        ctx: &mut SimulationContext,
        call: &Call,
    ) -> Result<Route, RmsaError> {
        if self.routing.is_state_dependent() {
            topology.invalidate_cost_cache();
        }
        let links = self
            .routing
            .route(topology, call)
            .ok_or(BlockCause::NoRoute(call.source, call.destination))?;

        self.regenerator.assign(topology, ctx, self.spectrum, &links, call)
    }

    /// Release a previously committed route's slots and regenerators (spec
    /// §4.6: "departures release slots and decrement regenerator usage").
    pub fn release(&self, topology: &mut Topology, route: &Route) {
        for segment in &route.segments {
            for &link in &segment.links {
                if let Some(l) = topology.link_mut(link) {
                    l.release_slots(&segment.slots);
                }
            }
            if segment.regenerators_used > 0 {
                topology.release_regenerators_unchecked(segment.end, segment.regenerators_used);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallState;
    use crate::devices::AmplifierParams;
    use crate::topology::Node;

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    #[test]
    fn assign_then_release_restores_full_availability() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let mut ctx = SimulationContext::new(11);
        let call = Call {
            id: 1,
            source: a,
            destination: b,
            bitrate_gbps: 100.0,
            arrival_time: 0.0,
            duration: 1.0,
            state: CallState::Pending,
        };
        let rmsa = Rmsa::new(
            RoutingAlgorithm::ShortestPathLength,
            SpectrumAssignment::FirstFit,
            RegeneratorAssignment::NoRegeneration,
        );

        let route = rmsa.assign_call(&mut t, &mut ctx, &call).unwrap();
        assert!(t.link(route.links[0]).unwrap().availability() < 16);
        rmsa.release(&mut t, &route);
        assert_eq!(t.link(route.links[0]).unwrap().availability(), 16);
        t.check_slot_invariant().unwrap();
    }

    #[test]
    fn unreachable_destination_is_no_route_block_cause() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let mut ctx = SimulationContext::new(11);
        let call = Call {
            id: 1,
            source: a,
            destination: b,
            bitrate_gbps: 100.0,
            arrival_time: 0.0,
            duration: 1.0,
            state: CallState::Pending,
        };
        let rmsa = Rmsa::new(
            RoutingAlgorithm::ShortestPathLength,
            SpectrumAssignment::FirstFit,
            RegeneratorAssignment::NoRegeneration,
        );

        let err = rmsa.assign_call(&mut t, &mut ctx, &call).unwrap_err();
        assert_eq!(err.block_cause(), Some(BlockCause::NoRoute(a, b)));
    }
}
