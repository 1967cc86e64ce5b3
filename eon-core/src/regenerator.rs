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

//! Regenerator assignment (spec §4.5): partition a routed link list into
//! transparent segments, each reachable under some modulation scheme with
//! acceptable OSNR and contiguous free spectrum, regenerating at translucent
//! nodes between segments.

use crate::calls::{Call, Route, TransparentSegment};
use crate::context::SimulationContext;
use crate::error::{BlockCause, ConfigError, RmsaError};
use crate::modulation::{self, ModulationScheme};
use crate::spectrum::SpectrumAssignment;
use crate::topology::{LinkId, NodeId, NodeType, Topology};
use crate::units::Signal;

/// Regenerators required to carry `bitrate_gbps`, per the
/// `RegeneratorBitrate = 100 Gb/s` reference rate.
pub fn regenerators_needed(bitrate_gbps: f64) -> u32 {
    (bitrate_gbps / 100.0).ceil().max(1.0) as u32
}

/// A regenerator-assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegeneratorAssignment {
    /// First-Longest-Reach / First-Narrowest-Segment: greedily extend each
    /// segment as far as feasibility allows, backtracking one hop on
    /// failure.
    Flr,
    /// Dynamic-programming scan minimising the number of segments.
    FirstNarrowestRegeneratable,
    /// No regeneration: a single segment must span the whole path.
    NoRegeneration,
}

impl RegeneratorAssignment {
    /// Resolve a policy by its configuration nickname.
    pub fn from_nickname(name: &str) -> Result<Self, ConfigError> {
        match name {
            "flr" | "fns" | "FLR" | "FNS" => Ok(RegeneratorAssignment::Flr),
            "first-narrowest-regeneratable" | "FirstNarrowestRegeneratable" => {
                Ok(RegeneratorAssignment::FirstNarrowestRegeneratable)
            }
            "no-regeneration" | "NoRegeneration" => Ok(RegeneratorAssignment::NoRegeneration),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }

    /// Partition `links` (source to destination, in order) into transparent
    /// segments and reserve their spectrum, per this policy.
    pub fn assign(
        &self,
        topology: &mut Topology,
        ctx: &mut SimulationContext,
        spectrum: SpectrumAssignment,
        links: &[LinkId],
        call: &Call,
    ) -> Result<Route, RmsaError> {
        let boundaries = match self {
            RegeneratorAssignment::Flr => assign_flr(topology, ctx, spectrum, links, call)?,
            RegeneratorAssignment::FirstNarrowestRegeneratable => {
                assign_first_narrowest(topology, ctx, spectrum, links, call)?
            }
            RegeneratorAssignment::NoRegeneration => {
                let feasible = segment_feasible(topology, ctx, spectrum, links, call)?;
                vec![(links.len(), feasible)]
            }
        };

        build_route(topology, links, call, boundaries)
    }
}

/// `(scheme, slot_window_start, slot_window_width)` feasible over `links`.
type Feasible = (ModulationScheme, u32, u32);

/// Check whether `links` (a candidate transparent segment) is feasible:
/// a modulation scheme meets the end-to-end OSNR, and a contiguous window
/// of the scheme's required width is free across every link in the segment.
/// Returns the narrowest (most spectrally efficient) feasible scheme and the
/// chosen slot window, without reserving anything. The two ways a segment
/// can be infeasible are reported as distinct [`BlockCause`]s: no modulation
/// scheme clears the OSNR threshold, versus no free spectrum window of the
/// required width exists once a scheme has been chosen.
fn segment_feasible(
    topology: &Topology,
    ctx: &mut SimulationContext,
    spectrum: SpectrumAssignment,
    links: &[LinkId],
    call: &Call,
) -> Result<Feasible, RmsaError> {
    if links.is_empty() {
        return Err(BlockCause::NoRoute(call.source, call.destination).into());
    }
    let osnr = propagate_osnr(topology, ctx, links)?;
    let scheme = *modulation::select_scheme(osnr.db()).ok_or(BlockCause::OsnrFailure)?;
    let width = scheme.num_slots(call.bitrate_gbps, (ctx.slot_width_hz() / 1e9).max(1e-9));

    let n_slots = topology.n_slots();
    let mut bitmap = vec![true; n_slots as usize];
    let mut usage = vec![0u64; n_slots as usize];
    for &link in links {
        let l = topology.link(link).expect("link handle out of topology");
        for (i, free) in l.freeness_bitmap().into_iter().enumerate() {
            bitmap[i] = bitmap[i] && free;
            usage[i] += l.usage_count(i as u32);
        }
    }
    let start = spectrum.select(&bitmap, width, &usage, ctx).ok_or(BlockCause::NoSpectrum)?;
    Ok((scheme, start, width))
}

/// End-to-end OSNR of a signal propagated (no density tracking -- admission
/// decisions depend only on the ASE budget, which is independent of the
/// allocated slot count) through every device of every link in order.
fn propagate_osnr(
    topology: &Topology,
    ctx: &SimulationContext,
    links: &[LinkId],
) -> Result<crate::units::Gain, crate::error::NumericError> {
    let mut signal = Signal::new(ctx, 1)?;
    for &link in links {
        let l = topology.link(link).expect("link handle out of topology");
        for device in l.devices() {
            device.propagate(&mut signal, ctx)?;
        }
    }
    Ok(signal.osnr())
}

/// Whether `node` can host the regenerators a segment boundary needs.
fn can_regenerate(topology: &Topology, node: NodeId, needed: u32) -> bool {
    match topology.node(node).map(|n| n.node_type()) {
        Some(NodeType::Opaque) => true,
        Some(NodeType::Translucent) => topology.node(node).unwrap().free_regenerators() >= needed,
        _ => false,
    }
}

/// Greedy-extend-then-backtrack (spec §4.5 FLR/FNS): extend each segment one
/// hop at a time while feasible (OSNR, spectrum are monotonically
/// non-improving with path length in this model), then cut the segment at
/// the longest feasible boundary that is either the destination or a
/// translucent/opaque node with enough free regenerators.
fn assign_flr(
    topology: &Topology,
    ctx: &mut SimulationContext,
    spectrum: SpectrumAssignment,
    links: &[LinkId],
    call: &Call,
) -> Result<Vec<(usize, Feasible)>, RmsaError> {
    let needed = regenerators_needed(call.bitrate_gbps);
    let mut boundaries = Vec::new();
    let mut pos = 0usize;

    while pos < links.len() {
        let mut max_feasible_end = None;
        let mut break_cause = BlockCause::OsnrFailure;
        for end in (pos + 1)..=links.len() {
            match segment_feasible(topology, ctx, spectrum, &links[pos..end], call) {
                Ok(feasible) => max_feasible_end = Some((end, feasible)),
                Err(RmsaError::Blocked(cause)) => {
                    break_cause = cause;
                    break;
                }
                Err(RmsaError::Numeric(e)) => return Err(e.into()),
            }
        }
        let (end, feasible) = max_feasible_end.ok_or(break_cause)?;

        let mut cut = end;
        loop {
            let node_at_cut = topology.link(links[cut - 1]).unwrap().to();
            if cut == links.len() || can_regenerate(topology, node_at_cut, needed) {
                break;
            }
            if cut == pos + 1 {
                return Err(BlockCause::NoRegenerator.into());
            }
            cut -= 1;
        }

        let feasible = if cut == end {
            feasible
        } else {
            segment_feasible(topology, ctx, spectrum, &links[pos..cut], call)?
        };
        boundaries.push((cut, feasible));
        pos = cut;
    }
    Ok(boundaries)
}

/// Dynamic-programming scan (spec §4.5 FirstNarrowestRegeneratable):
/// minimise the number of segments covering the whole path, among
/// partitions whose every intermediate boundary can host a regenerator.
fn assign_first_narrowest(
    topology: &Topology,
    ctx: &mut SimulationContext,
    spectrum: SpectrumAssignment,
    links: &[LinkId],
    call: &Call,
) -> Result<Vec<(usize, Feasible)>, RmsaError> {
    let needed = regenerators_needed(call.bitrate_gbps);
    let n = links.len();
    // dp[i] = Some((segment_count, predecessor, feasible-segment-covering predecessor..i))
    let mut dp: Vec<Option<(u32, usize, Feasible)>> = vec![None; n + 1];
    dp[0] = Some((0, 0, (modulation::SCHEMES[0], 0, 0)));

    for i in 0..n {
        if dp[i].is_none() {
            continue;
        }
        let (cost, ..) = dp[i].unwrap();
        for j in (i + 1)..=n {
            let node_ok = j == n || can_regenerate(topology, topology.link(links[j - 1]).unwrap().to(), needed);
            if !node_ok {
                continue;
            }
            match segment_feasible(topology, ctx, spectrum, &links[i..j], call) {
                Ok(feasible) => {
                    let candidate = cost + 1;
                    if dp[j].map(|(c, ..)| candidate < c).unwrap_or(true) {
                        dp[j] = Some((candidate, i, feasible));
                    }
                }
                Err(RmsaError::Numeric(e)) => return Err(e.into()),
                Err(RmsaError::Blocked(_)) => {}
            }
        }
    }

    let mut boundaries = Vec::new();
    let mut cur = n;
    while cur != 0 {
        let (_, prev, feasible) = dp[cur].ok_or(BlockCause::NoRegenerator)?;
        boundaries.push((cur, feasible));
        cur = prev;
    }
    boundaries.reverse();
    if boundaries.is_empty() {
        return Err(BlockCause::NoRoute(call.source, call.destination).into());
    }
    Ok(boundaries)
}

/// Reserve slots and regenerators for every segment and assemble the
/// [`Route`]. Rolls back nothing on partial failure -- regenerator/slot
/// reservation can only fail here on an accounting bug (feasibility was
/// already checked), which is fatal per [`crate::error::NumericError`].
fn build_route(
    topology: &mut Topology,
    links: &[LinkId],
    call: &Call,
    boundaries: Vec<(usize, Feasible)>,
) -> Result<Route, RmsaError> {
    let needed = regenerators_needed(call.bitrate_gbps);
    let mut segments = Vec::with_capacity(boundaries.len());
    let mut pos = 0usize;
    let mut start_node = call.source;

    for (end, (scheme, slot_start, width)) in boundaries {
        let seg_links = links[pos..end].to_vec();
        let slots: Vec<u32> = (slot_start..slot_start + width).collect();
        for &link in &seg_links {
            topology.reserve_slots(link, &slots, call.id)?;
        }
        let end_node = topology.link(*seg_links.last().unwrap()).unwrap().to();
        let is_last = end == links.len();
        let regenerators_used = if is_last {
            0
        } else {
            topology.reserve_regenerators(end_node, needed)?;
            needed
        };
        segments.push(TransparentSegment {
            links: seg_links,
            start: start_node,
            end: end_node,
            scheme,
            slots,
            regenerators_used,
        });
        start_node = end_node;
        pos = end;
    }

    Ok(Route {
        links: links.to_vec(),
        segments,
    })
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

    fn sample_call(source: NodeId, destination: NodeId, bitrate_gbps: f64) -> Call {
        Call {
            id: 1,
            source,
            destination,
            bitrate_gbps,
            arrival_time: 0.0,
            duration: 1.0,
            state: CallState::Pending,
        }
    }

    #[test]
    fn regenerators_needed_rounds_up_to_100gbps_units() {
        assert_eq!(regenerators_needed(50.0), 1);
        assert_eq!(regenerators_needed(100.0), 1);
        assert_eq!(regenerators_needed(150.0), 2);
    }

    #[test]
    fn no_regeneration_assigns_single_segment_on_short_link() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let link = t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let mut ctx = SimulationContext::new(7);
        let call = sample_call(a, b, 100.0);

        let route = RegeneratorAssignment::NoRegeneration
            .assign(&mut t, &mut ctx, SpectrumAssignment::FirstFit, &[link], &call)
            .unwrap();
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.total_regenerators(), 0);
    }

    #[test]
    fn osnr_failure_is_distinguished_from_no_spectrum() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let link = t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let call = sample_call(a, b, 100.0);

        let mut starved_osnr = SimulationContext::new(7).with_input_osnr(crate::units::Gain::from_db(-10.0));
        match segment_feasible(&t, &mut starved_osnr, SpectrumAssignment::FirstFit, &[link], &call) {
            Err(RmsaError::Blocked(BlockCause::OsnrFailure)) => {}
            other => panic!("expected OsnrFailure, got {other:?}"),
        }
    }

    #[test]
    fn no_spectrum_is_distinguished_from_osnr_failure() {
        let mut t = Topology::new(1);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        let link = t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.reserve_slots(link, &[0], 999).unwrap();
        let mut ctx = SimulationContext::new(7);
        let call = sample_call(a, b, 100.0);

        match segment_feasible(&t, &mut ctx, SpectrumAssignment::FirstFit, &[link], &call) {
            Err(RmsaError::Blocked(BlockCause::NoSpectrum)) => {}
            other => panic!("expected NoSpectrum, got {other:?}"),
        }
    }

    #[test]
    fn flr_places_no_regenerator_when_whole_path_is_feasible() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::translucent(4));
        let c = t.add_node(Node::transparent());
        let l1 = t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let l2 = t.add_link(b, c, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        let mut ctx = SimulationContext::new(7);
        let call = sample_call(a, c, 50.0);

        let route = RegeneratorAssignment::Flr
            .assign(&mut t, &mut ctx, SpectrumAssignment::FirstFit, &[l1, l2], &call)
            .unwrap();
        assert_eq!(route.links, vec![l1, l2]);
        assert_eq!(route.total_regenerators(), 0);
    }
}
