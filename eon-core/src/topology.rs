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

//! # Topology
//!
//! [`Topology`] exclusively owns nodes and links (cyclic-ownership Design
//! Note: "model with a central arena owning nodes/links by index; all
//! cross-references are integer handles"). The physical graph is a
//! `petgraph` [`StableGraph`] with [`NodeId`]/[`LinkId`] handles, exactly
//! the shape of `bgpsim::types::IgpNetwork`: graph node/edge weights carry
//! only the handle, the real payload (`Node`/`Link`) lives in a side
//! `HashMap` on `Topology`.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use crate::devices::{build_fiber_chain, chain_fiber_length_km, AmplifierParams, Device};
use crate::error::{ConfigError, NumericError};

/// Handle to a node in a [`Topology`].
pub type NodeId = NodeIndex<u32>;
/// Handle to a (directed) link in a [`Topology`].
pub type LinkId = EdgeIndex<u32>;

/// How a node participates in regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// No regeneration capability; transparent segments pass through freely.
    Transparent,
    /// Equipped with a finite number of OEO regenerators.
    Translucent,
    /// Every call passing through is regenerated (unlimited capacity).
    Opaque,
}

/// A network node and its regenerator bookkeeping.
#[derive(Debug, Clone)]
pub struct Node {
    node_type: NodeType,
    regenerators_total: u32,
    regenerators_used: u32,
    max_simultaneous_used: u32,
}

impl Node {
    /// A transparent node (no regenerators).
    pub fn transparent() -> Self {
        Node {
            node_type: NodeType::Transparent,
            regenerators_total: 0,
            regenerators_used: 0,
            max_simultaneous_used: 0,
        }
    }

    /// A translucent node with `count` regenerators installed.
    pub fn translucent(count: u32) -> Self {
        Node {
            node_type: NodeType::Translucent,
            regenerators_total: count,
            regenerators_used: 0,
            max_simultaneous_used: 0,
        }
    }

    /// An opaque node: every call is regenerated, capacity unlimited.
    pub fn opaque() -> Self {
        Node {
            node_type: NodeType::Opaque,
            regenerators_total: 0,
            regenerators_used: 0,
            max_simultaneous_used: 0,
        }
    }

    /// This node's regeneration capability.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Regenerators currently in use.
    pub fn regenerators_used(&self) -> u32 {
        self.regenerators_used
    }

    /// Regenerators installed (meaningless for [`NodeType::Opaque`], which
    /// has unlimited capacity).
    pub fn regenerators_total(&self) -> u32 {
        self.regenerators_total
    }

    /// Peak simultaneous regenerator usage observed so far.
    pub fn max_simultaneous_used(&self) -> u32 {
        self.max_simultaneous_used
    }

    /// Free regenerator count (translucent nodes only; always `u32::MAX`
    /// for opaque, zero for transparent).
    pub fn free_regenerators(&self) -> u32 {
        match self.node_type {
            NodeType::Transparent => 0,
            NodeType::Opaque => u32::MAX,
            NodeType::Translucent => self.regenerators_total - self.regenerators_used,
        }
    }

    /// Reserve `count` regenerators. Returns `Err((used, total))` if the
    /// node cannot supply them (callers must check
    /// [`Node::free_regenerators`] first; this only guards the invariant).
    /// Opaque nodes have unlimited capacity but still accumulate usage and
    /// peak-simultaneous-use statistics, since those drive regenerator
    /// placement on an all-opaque baseline run.
    /// Topology-level callers attach the node handle to build a
    /// [`NumericError::RegeneratorOverflow`].
    pub fn reserve_regenerators(&mut self, count: u32) -> Result<(), (u32, u32)> {
        self.regenerators_used += count;
        self.max_simultaneous_used = self.max_simultaneous_used.max(self.regenerators_used);
        if self.node_type != NodeType::Opaque && self.regenerators_used > self.regenerators_total {
            return Err((self.regenerators_used, self.regenerators_total));
        }
        Ok(())
    }

    /// Release `count` previously reserved regenerators.
    pub fn release_regenerators(&mut self, count: u32) {
        self.regenerators_used = self.regenerators_used.saturating_sub(count);
    }

    /// Make this node translucent with `count` regenerators (used by
    /// regenerator-placement algorithms to mutate the topology between
    /// simulation runs).
    pub fn set_translucent(&mut self, count: u32) {
        self.node_type = NodeType::Translucent;
        self.regenerators_total = count;
        self.regenerators_used = 0;
        self.max_simultaneous_used = 0;
    }

    /// Make this node opaque.
    pub fn set_opaque(&mut self) {
        self.node_type = NodeType::Opaque;
        self.regenerators_total = 0;
        self.regenerators_used = 0;
        self.max_simultaneous_used = 0;
    }
}

/// A single spectrum slot on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    index: u32,
    held_by: Option<u64>,
}

impl Slot {
    fn new(index: u32) -> Self {
        Slot {
            index,
            held_by: None,
        }
    }

    /// This slot's index within the link's grid.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether no active call currently holds this slot.
    pub fn is_free(&self) -> bool {
        self.held_by.is_none()
    }
}

/// A directed physical link between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    from: NodeId,
    to: NodeId,
    length_km: f64,
    span_length_km: f64,
    slots: Vec<Slot>,
    devices: Vec<Device>,
    /// Per-slot historical usage count, for Most/Least-Used spectrum
    /// assignment policies.
    usage_count: Vec<u64>,
}

impl Link {
    /// The link's source node.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// The link's destination node.
    pub fn to(&self) -> NodeId {
        self.to
    }

    /// Physical length, km.
    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    /// Amplifier span length, km.
    pub fn span_length_km(&self) -> f64 {
        self.span_length_km
    }

    /// The device chain a signal traverses on this link.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// All slots on this link.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of free slots on this link.
    pub fn availability(&self) -> u32 {
        self.slots.iter().filter(|s| s.is_free()).count() as u32
    }

    /// Historical usage count for a given slot index.
    pub fn usage_count(&self, slot: u32) -> u64 {
        self.usage_count[slot as usize]
    }

    /// A bitmap of slot freeness (index = slot index), for continuity
    /// checks across a transparent segment.
    pub fn freeness_bitmap(&self) -> Vec<bool> {
        self.slots.iter().map(|s| s.is_free()).collect()
    }

    /// Reserve the given slots for `call_id`. Returns `Err` if any requested
    /// slot is not free (callers must have checked continuity/contiguity
    /// first); Topology-level callers attach the link handle to build a
    /// [`NumericError::SlotCountDrift`].
    pub fn reserve_slots(&mut self, indices: &[u32], call_id: u64) -> Result<(), ()> {
        if indices.iter().any(|&i| !self.slots[i as usize].is_free()) {
            return Err(());
        }
        for &i in indices {
            self.slots[i as usize].held_by = Some(call_id);
            self.usage_count[i as usize] += 1;
        }
        Ok(())
    }

    /// Release the slots held by `call_id`.
    pub fn release_slots(&mut self, indices: &[u32]) {
        for &i in indices {
            self.slots[i as usize].held_by = None;
        }
    }

    /// Rebuild the device chain after a span-length change (spec §3:
    /// "devices rebuilt when span length changes").
    pub fn rebuild_devices(
        &mut self,
        span_length_km: f64,
        booster: AmplifierParams,
        inline_amp: AmplifierParams,
        pre_amp: AmplifierParams,
    ) {
        self.span_length_km = span_length_km;
        self.devices = build_fiber_chain(self.length_km, span_length_km, booster, inline_amp, pre_amp);
    }

    /// Verifies the device-chain fibre-length invariant holds.
    pub fn device_chain_matches_length(&self) -> bool {
        (chain_fiber_length_km(&self.devices) - self.length_km).abs() < 1e-6
    }
}

/// The physical topology: nodes, links, slot grids, and the shortest-path
/// cache. Exclusively owns everything reachable through a [`NodeId`]/
/// [`LinkId`] handle.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: StableGraph<(), LinkId, Directed, u32>,
    nodes: HashMap<NodeId, Node>,
    links: HashMap<LinkId, Link>,
    n_slots: u32,
    path_cache: HashMap<(NodeId, NodeId), Vec<LinkId>>,
}

impl Topology {
    /// An empty topology with the given per-link slot count.
    pub fn new(n_slots: u32) -> Self {
        Topology {
            graph: StableGraph::default(),
            nodes: HashMap::new(),
            links: HashMap::new(),
            n_slots,
            path_cache: HashMap::new(),
        }
    }

    /// Configured slot count per link.
    pub fn n_slots(&self) -> u32 {
        self.n_slots
    }

    /// Add a node of the given type, returning its handle.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let idx = self.graph.add_node(());
        self.nodes.insert(idx, node);
        idx
    }

    /// Add a directed link `from -> to`, building its device chain.
    pub fn add_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        length_km: f64,
        span_length_km: f64,
        booster: AmplifierParams,
        inline_amp: AmplifierParams,
        pre_amp: AmplifierParams,
    ) -> Result<LinkId, ConfigError> {
        if length_km <= 0.0 {
            return Err(ConfigError::InvalidTopology(format!(
                "link {from:?} -> {to:?} has non-positive length {length_km}"
            )));
        }
        let devices = build_fiber_chain(length_km, span_length_km, booster, inline_amp, pre_amp);
        let slots = (0..self.n_slots).map(Slot::new).collect();
        let link = Link {
            from,
            to,
            length_km,
            span_length_km,
            slots,
            devices,
            usage_count: vec![0; self.n_slots as usize],
        };
        let edge_idx = self.graph.add_edge(from, to, LinkId::new(0));
        self.links.insert(edge_idx, link);
        // the edge weight doubles as its own handle once petgraph has
        // minted the index.
        if let Some(w) = self.graph.edge_weight_mut(edge_idx) {
            *w = edge_idx;
        }
        self.invalidate_cost_cache();
        Ok(edge_idx)
    }

    /// Immutable access to a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Immutable access to a link.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Mutable access to a link.
    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(&id)
    }

    /// All node handles.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// All link handles.
    pub fn link_ids(&self) -> Vec<LinkId> {
        self.links.keys().copied().collect()
    }

    /// The outgoing links from a node.
    pub fn out_links(&self, node: NodeId) -> Vec<LinkId> {
        self.graph
            .edges(node)
            .map(|e| *e.weight())
            .collect()
    }

    /// The longest link length in the topology (used by cost functions that
    /// normalise by it, e.g. `LengthOccupationAvailability`).
    pub fn longest_link_length_km(&self) -> f64 {
        self.links
            .values()
            .map(|l| l.length_km)
            .fold(0.0, f64::max)
    }

    /// Invalidate the shortest-path cache (call whenever link costs change).
    pub fn invalidate_cost_cache(&mut self) {
        self.path_cache.clear();
    }

    /// Look up a cached shortest path, if present.
    pub fn cached_path(&self, from: NodeId, to: NodeId) -> Option<&Vec<LinkId>> {
        self.path_cache.get(&(from, to))
    }

    /// Store a computed shortest path in the cache.
    pub fn cache_path(&mut self, from: NodeId, to: NodeId, path: Vec<LinkId>) {
        self.path_cache.insert((from, to), path);
    }

    /// The underlying graph, for algorithms (Dijkstra, BFS) that want direct
    /// `petgraph` access.
    pub fn graph(&self) -> &StableGraph<(), LinkId, Directed, u32> {
        &self.graph
    }

    /// Reserve `indices` on `link` for `call_id`, raising a
    /// [`NumericError::SlotCountDrift`] (rather than a plain blocking cause)
    /// if the caller asked for a slot that turned out not to be free --
    /// callers are expected to have already verified continuity/contiguity,
    /// so this only fires on an actual accounting bug.
    pub fn reserve_slots(
        &mut self,
        link: LinkId,
        indices: &[u32],
        call_id: u64,
    ) -> Result<(), NumericError> {
        let l = self.links.get_mut(&link).expect("link handle out of topology");
        l.reserve_slots(indices, call_id).map_err(|_| NumericError::SlotCountDrift {
            link,
            free: l.availability(),
            held: l.slots.len() as u32 - l.availability(),
            total: l.slots.len() as u32,
        })
    }

    /// Reserve `count` regenerators on `node`, raising a
    /// [`NumericError::RegeneratorOverflow`] on capacity breach.
    pub fn reserve_regenerators(&mut self, node: NodeId, count: u32) -> Result<(), NumericError> {
        let n = self.nodes.get_mut(&node).expect("node handle out of topology");
        n.reserve_regenerators(count)
            .map_err(|(used, total)| NumericError::RegeneratorOverflow { node, used, total })
    }

    /// Release `count` previously reserved regenerators on `node`. Never
    /// fails: release is always safe once reservation has been recorded.
    pub fn release_regenerators_unchecked(&mut self, node: NodeId, count: u32) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.release_regenerators(count);
        }
    }

    /// Verify the universal per-link slot-count invariant (spec §8): for
    /// every link, free + held == total.
    pub fn check_slot_invariant(&self) -> Result<(), NumericError> {
        for (&id, link) in &self.links {
            let free = link.availability();
            let held = link.slots.len() as u32 - free;
            if free + held != link.slots.len() as u32 {
                return Err(NumericError::SlotCountDrift {
                    link: id,
                    free,
                    held,
                    total: link.slots.len() as u32,
                });
            }
        }
        Ok(())
    }

    /// Verify the universal per-node regenerator invariant (spec §8):
    /// `used <= total`, `max_simultaneous >= used`.
    pub fn check_regenerator_invariant(&self) -> Result<(), NumericError> {
        for (&id, node) in &self.nodes {
            if node.node_type == NodeType::Translucent {
                if node.regenerators_used > node.regenerators_total {
                    return Err(NumericError::RegeneratorOverflow {
                        node: id,
                        used: node.regenerators_used,
                        total: node.regenerators_total,
                    });
                }
                if node.max_simultaneous_used < node.regenerators_used {
                    return Err(NumericError::RegeneratorOverflow {
                        node: id,
                        used: node.regenerators_used,
                        total: node.max_simultaneous_used,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    #[test]
    fn slot_reserve_and_release_round_trips() {
        let mut t = Topology::new(8);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let link = t
            .add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0))
            .unwrap();
        assert_eq!(t.link(link).unwrap().availability(), 8);
        t.reserve_slots(link, &[0, 1, 2, 3], 1).unwrap();
        assert_eq!(t.link(link).unwrap().availability(), 4);
        t.check_slot_invariant().unwrap();
        t.link_mut(link).unwrap().release_slots(&[0, 1, 2, 3]);
        assert_eq!(t.link(link).unwrap().availability(), 8);
        t.check_slot_invariant().unwrap();
    }

    #[test]
    fn regenerator_reservation_respects_capacity() {
        let mut t = Topology::new(8);
        let a = t.add_node(Node::translucent(2));
        t.reserve_regenerators(a, 2).unwrap();
        assert_eq!(t.node(a).unwrap().free_regenerators(), 0);
        assert!(t.reserve_regenerators(a, 1).is_err());
    }

    #[test]
    fn zero_length_link_is_rejected() {
        let mut t = Topology::new(8);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        assert!(t
            .add_link(a, b, 0.0, 80.0, amp(16.0), amp(20.0), amp(16.0))
            .is_err());
    }
}
