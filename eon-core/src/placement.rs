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

//! Regenerator placement: measure where regeneration pressure concentrates,
//! then decide which nodes are worth equipping as translucent sites.
//!
//! Not part of the distilled RMSA loop itself -- a genetic search over
//! per-node regenerator counts needs a seed individual, and the natural one
//! is "wherever an all-opaque network regenerates the most calls at once".

use rand::Rng;

use crate::context::SimulationContext;
use crate::topology::{NodeId, Topology};

/// Make every node opaque, run `run_baseline` once (a full network
/// simulation), then greedily equip the `n` nodes with the highest observed
/// peak simultaneous regenerator usage as translucent sites with `x`
/// regenerators each, leaving every other node transparent. Ties among
/// maximal nodes are broken by a uniform draw over the maximal set, routed
/// through `ctx`'s seeded PRNG rather than a fresh unseeded generator.
pub fn most_simultaneously_used<F>(
    topology: &mut Topology,
    ctx: &mut SimulationContext,
    n: u32,
    x: u32,
    run_baseline: F,
) where
    F: FnOnce(&mut Topology, &mut SimulationContext),
{
    for node in topology.node_ids() {
        topology.node_mut(node).unwrap().set_opaque();
    }

    run_baseline(topology, ctx);

    // capture peak usage before resetting node types -- `set_translucent`
    // zeroes it.
    let mut usage: Vec<(NodeId, u32)> = topology
        .node_ids()
        .into_iter()
        .map(|node| (node, topology.node(node).unwrap().max_simultaneous_used()))
        .collect();

    for node in topology.node_ids() {
        topology.node_mut(node).unwrap().set_translucent(0);
    }

    for _ in 0..n {
        if usage.is_empty() {
            break;
        }
        let max_used = usage.iter().map(|&(_, u)| u).max().unwrap_or(0);
        let maximal: Vec<usize> = usage
            .iter()
            .enumerate()
            .filter(|(_, &(_, u))| u == max_used)
            .map(|(i, _)| i)
            .collect();

        let pick = maximal[ctx.rng_mut().gen_range(0..maximal.len())];
        let (chosen, _) = usage.swap_remove(pick);
        topology.node_mut(chosen).unwrap().set_translucent(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::AmplifierParams;
    use crate::topology::{Node, NodeType};

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    #[test]
    fn places_translucent_sites_at_the_busiest_nodes() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let c = t.add_node(Node::transparent());
        t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.add_link(b, c, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let mut ctx = SimulationContext::new(3);

        most_simultaneously_used(&mut t, &mut ctx, 1, 4, |topo, _| {
            topo.reserve_regenerators(b, 3).unwrap();
        });

        assert_eq!(t.node(b).unwrap().node_type(), NodeType::Translucent);
        assert_eq!(t.node(b).unwrap().regenerators_total(), 4);
        assert_eq!(t.node(a).unwrap().node_type(), NodeType::Transparent);
        assert_eq!(t.node(c).unwrap().node_type(), NodeType::Transparent);
    }
}
