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

//! Routing algorithms (spec §4.3): static shortest-path variants (cached)
//! and cost-based Dijkstra variants that depend on call/link state and must
//! re-run every call.

use petgraph::algo::astar;

use crate::calls::Call;
use crate::error::ConfigError;
use crate::topology::{LinkId, NodeId, Topology};

/// A routing algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingAlgorithm {
    /// Static shortest path by physical length, cached per (src, dst).
    ShortestPathLength,
    /// Static shortest path by hop count, cached per (src, dst).
    ShortestPathHops,
    /// Cost-based Dijkstra: prefers longer paths on idle links, to reserve
    /// short links for future short calls (spec §4.3).
    LengthOccupationAvailability,
    /// Cost-based Dijkstra with a weighted sum of link/call features. The
    /// weight vector is the PSO decision variable in spec §4.7.
    PowerSeries {
        /// Per-feature coefficients, in the order
        /// `[length, occupancy, contiguity, fragmentation]`.
        betas: Vec<f64>,
    },
}

impl RoutingAlgorithm {
    /// Resolve a routing algorithm by its configuration nickname. Power
    /// series weights are not resolvable by nickname alone (they are set
    /// explicitly by an optimiser), hence no `"power-series"` case here.
    pub fn from_nickname(name: &str) -> Result<Self, ConfigError> {
        match name {
            "shortest-path-length" | "ShortestPath" => Ok(RoutingAlgorithm::ShortestPathLength),
            "shortest-path-hops" | "MinimumHops" => Ok(RoutingAlgorithm::ShortestPathHops),
            "length-occupation-availability" | "LORa" => {
                Ok(RoutingAlgorithm::LengthOccupationAvailability)
            }
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }

    /// Whether this algorithm's cost depends on simulation state and must be
    /// re-run (and its cache invalidated) for every call.
    pub fn is_state_dependent(&self) -> bool {
        !matches!(
            self,
            RoutingAlgorithm::ShortestPathLength | RoutingAlgorithm::ShortestPathHops
        )
    }

    /// Compute an ordered list of links from `call.source` to
    /// `call.destination`, or `None` if no path exists.
    pub fn route(&self, topology: &mut Topology, call: &Call) -> Option<Vec<LinkId>> {
        if !self.is_state_dependent() {
            if let Some(cached) = topology.cached_path(call.source, call.destination) {
                return Some(cached.clone());
            }
        }

        let path = dijkstra_path(topology, call.source, call.destination, |topology, link| {
            self.cost(topology, link, call)
        })?;

        if !self.is_state_dependent() {
            topology.cache_path(call.source, call.destination, path.clone());
        }
        Some(path)
    }

    fn cost(&self, topology: &Topology, link: LinkId, call: &Call) -> f64 {
        match self {
            RoutingAlgorithm::ShortestPathLength => topology.link(link).unwrap().length_km(),
            RoutingAlgorithm::ShortestPathHops => 1.0,
            RoutingAlgorithm::LengthOccupationAvailability => {
                let l = topology.link(link).unwrap();
                let n_slots = topology.n_slots() as f64;
                let lmax = topology.longest_link_length_km().max(1e-9);
                1.0 + l.length_km() / lmax + (l.availability() as f64) / n_slots
            }
            RoutingAlgorithm::PowerSeries { betas } => {
                let features = link_features(topology, link, call);
                features
                    .iter()
                    .zip(betas.iter())
                    .map(|(phi, beta)| beta * phi)
                    .sum()
            }
        }
    }
}

/// `[length, occupancy, contiguity, fragmentation]` features of a link,
/// relative to the call requesting it, for [`RoutingAlgorithm::PowerSeries`].
fn link_features(topology: &Topology, link: LinkId, call: &Call) -> [f64; 4] {
    let l = topology.link(link).unwrap();
    let n_slots = topology.n_slots() as f64;
    let lmax = topology.longest_link_length_km().max(1e-9);
    let length = l.length_km() / lmax;
    let occupancy = 1.0 - (l.availability() as f64) / n_slots;

    let bitmap = l.freeness_bitmap();
    let runs = free_run_lengths(&bitmap);
    let longest_run = runs.iter().copied().max().unwrap_or(0) as f64;
    let contiguity = longest_run / n_slots;
    let fragmentation = if runs.is_empty() {
        0.0
    } else {
        runs.len() as f64 / n_slots
    };
    let _ = call; // reserved for call-dependent features (e.g. bitrate pressure)
    [length, occupancy, contiguity, fragmentation]
}

fn free_run_lengths(bitmap: &[bool]) -> Vec<u32> {
    let mut runs = Vec::new();
    let mut current = 0u32;
    for &free in bitmap {
        if free {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    runs
}

/// Dijkstra shortest path via `petgraph::algo::astar` with a zero heuristic,
/// reconstructing the link (not just node) path.
fn dijkstra_path(
    topology: &Topology,
    source: NodeId,
    destination: NodeId,
    mut cost: impl FnMut(&Topology, LinkId) -> f64,
) -> Option<Vec<LinkId>> {
    let graph = topology.graph();
    let (_, node_path) = astar(
        graph,
        source,
        |n| n == destination,
        |e| cost(topology, *e.weight()),
        |_| 0.0,
    )?;

    let mut links = Vec::with_capacity(node_path.len().saturating_sub(1));
    for window in node_path.windows(2) {
        let edge = graph.find_edge(window[0], window[1])?;
        links.push(*graph.edge_weight(edge)?);
    }
    Some(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::AmplifierParams;
    use crate::topology::Node;

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    fn sample_call(source: NodeId, destination: NodeId) -> Call {
        Call {
            id: 1,
            source,
            destination,
            bitrate_gbps: 100.0,
            arrival_time: 0.0,
            duration: 1.0,
            state: crate::calls::CallState::Pending,
        }
    }

    #[test]
    fn shortest_path_by_length_prefers_direct_link() {
        let mut t = Topology::new(8);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let c = t.add_node(Node::transparent());
        t.add_link(a, c, 200.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.add_link(a, b, 50.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.add_link(b, c, 50.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();

        let call = sample_call(a, c);
        let path = RoutingAlgorithm::ShortestPathLength
            .route(&mut t, &call)
            .unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn no_route_returns_none() {
        let mut t = Topology::new(8);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let call = sample_call(a, b);
        assert!(RoutingAlgorithm::ShortestPathLength.route(&mut t, &call).is_none());
    }
}
