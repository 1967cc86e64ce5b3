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

//! The call-level discrete-event simulation (spec §4.6): a Poisson call
//! generator feeding the RMSA pipeline through a time-ordered event queue.

use std::collections::HashMap;

use log::{debug, trace};
use ordered_float::NotNan;
use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::calls::{Call, CallState, Route};
use crate::context::SimulationContext;
use crate::error::{NumericError, RmsaError};
use crate::event::{BasicEventQueue, Event, EventKind, EventQueue};
use crate::metrics::SimulationResult;
use crate::rmsa::Rmsa;
use crate::topology::{NodeId, Topology};

/// Generates call arrivals and holding times per spec §4.6: Poisson
/// arrivals at rate `load * mu`, exponential holding times with mean `1/mu`.
#[derive(Debug, Clone)]
pub struct CallGenerator {
    lambda: f64,
    mu: f64,
    /// Cumulative `(bitrate_gbps, cumulative_probability)`, probabilities
    /// normalised and strictly increasing; the last entry's probability is 1.0.
    bitrate_cdf: Vec<(f64, f64)>,
    nodes: Vec<NodeId>,
    next_id: u64,
}

impl CallGenerator {
    /// Build a generator drawing bitrates uniformly from `bitrates_gbps`,
    /// over `nodes` as candidate source/destination pairs, for an offered
    /// `load` (Erlang) at holding rate `mu` (1.0 by convention).
    pub fn new(load: f64, mu: f64, bitrates_gbps: Vec<f64>, nodes: Vec<NodeId>) -> Self {
        let n = bitrates_gbps.len() as f64;
        let uniform = bitrates_gbps
            .into_iter()
            .map(|gbps| (gbps, 1.0 / n))
            .collect();
        Self::new_weighted(load, mu, uniform, nodes)
    }

    /// Build a generator drawing bitrates by the given `(gbps, probability)`
    /// weights (spec §6: "number of bitrates with probabilities");
    /// probabilities are renormalised to sum to 1.
    pub fn new_weighted(load: f64, mu: f64, weighted_bitrates: Vec<(f64, f64)>, nodes: Vec<NodeId>) -> Self {
        let total: f64 = weighted_bitrates.iter().map(|&(_, w)| w).sum();
        let mut cumulative = 0.0;
        let bitrate_cdf = weighted_bitrates
            .into_iter()
            .map(|(gbps, w)| {
                cumulative += w / total;
                (gbps, cumulative)
            })
            .collect();
        CallGenerator {
            lambda: load * mu,
            mu,
            bitrate_cdf,
            nodes,
            next_id: 0,
        }
    }

    fn sample_bitrate(&self, ctx: &mut SimulationContext) -> f64 {
        let draw = ctx.sample_uniform();
        self.bitrate_cdf
            .iter()
            .find(|&&(_, cum)| draw <= cum)
            .map(|&(gbps, _)| gbps)
            .unwrap_or_else(|| self.bitrate_cdf.last().unwrap().0)
    }

    /// Draw the next call, with arrival time `after + Exp(lambda)`.
    pub fn next_call(&mut self, ctx: &mut SimulationContext, after: f64) -> Call {
        let inter_arrival = Exp::new(self.lambda).unwrap().sample(ctx.rng_mut());
        let duration = Exp::new(self.mu).unwrap().sample(ctx.rng_mut());

        let src_idx = ctx.rng_mut().gen_range(0..self.nodes.len());
        let mut dst_idx = ctx.rng_mut().gen_range(0..self.nodes.len());
        while dst_idx == src_idx && self.nodes.len() > 1 {
            dst_idx = ctx.rng_mut().gen_range(0..self.nodes.len());
        }
        let bitrate_gbps = self.sample_bitrate(ctx);

        let id = self.next_id;
        self.next_id += 1;
        Call {
            id,
            source: self.nodes[src_idx],
            destination: self.nodes[dst_idx],
            bitrate_gbps,
            arrival_time: after + inter_arrival,
            duration,
            state: CallState::Pending,
        }
    }
}

/// Drives the event loop: pops arrivals/departures, dispatches admitted
/// calls through [`Rmsa::assign_call`], and accumulates a
/// [`SimulationResult`].
#[derive(Debug, Clone)]
pub struct NetworkSimulator {
    rmsa: Rmsa,
    record_trace: bool,
}

impl NetworkSimulator {
    /// Build a simulator around a fixed RMSA algorithm set. Per-call outcome
    /// tracing is off by default (spec §6: memory is a real concern at call
    /// counts in the millions).
    pub fn new(rmsa: Rmsa) -> Self {
        NetworkSimulator {
            rmsa,
            record_trace: false,
        }
    }

    /// Enable or disable per-call outcome tracing
    /// (`SimulationConfig::record_trace`), populating
    /// [`SimulationResult::outcomes`] when set.
    pub fn with_trace(mut self, record_trace: bool) -> Self {
        self.record_trace = record_trace;
        self
    }

    /// Run `num_calls` arrivals to completion (all departures drained),
    /// mutating `topology` in place. Returns the accumulated result, or the
    /// first fatal [`NumericError`] encountered -- per spec §7, invariant
    /// violations must propagate, never be swallowed as a blocking outcome.
    pub fn run(
        &self,
        topology: &mut Topology,
        ctx: &mut SimulationContext,
        generator: &mut CallGenerator,
        num_calls: u64,
    ) -> Result<SimulationResult, NumericError> {
        let mut queue = BasicEventQueue::new();
        let mut seq = 0u64;
        let mut generated = 0u64;
        let mut active_routes: HashMap<u64, Route> = HashMap::new();
        let mut result = SimulationResult::default();

        if generated < num_calls {
            let call = generator.next_call(ctx, 0.0);
            seq = enqueue_arrival(&mut queue, call, seq);
            generated += 1;
        }

        while let Some(event) = queue.pop() {
            match event.kind {
                EventKind::Arrival(call) => {
                    let call_id = call.id;
                    let bitrate = call.bitrate_gbps;
                    let arrival_time = call.arrival_time;
                    let departure_time = arrival_time + call.duration;
                    result.record_arrival(bitrate);

                    match self.rmsa.assign_call(topology, ctx, &call) {
                        Ok(route) => {
                            trace!("call {call_id} admitted with {} regenerators", route.total_regenerators());
                            result.record_admission(call_id, route.total_regenerators(), self.record_trace);
                            active_routes.insert(call_id, route);
                            queue.push(Event {
                                time: NotNan::new(departure_time).map_err(|_| {
                                    NumericError::NonFinite {
                                        context: "Event::time (departure)",
                                        value: departure_time,
                                    }
                                })?,
                                seq,
                                kind: EventKind::Departure(call_id),
                            });
                            seq += 1;
                        }
                        Err(RmsaError::Blocked(cause)) => {
                            debug!("call {call_id} blocked: {cause}");
                            result.record_block(call_id, bitrate, cause, self.record_trace);
                        }
                        Err(RmsaError::Numeric(e)) => return Err(e),
                    }

                    if generated < num_calls {
                        let next = generator.next_call(ctx, arrival_time);
                        seq = enqueue_arrival(&mut queue, next, seq);
                        generated += 1;
                    }
                }
                EventKind::Departure(call_id) => {
                    if let Some(route) = active_routes.remove(&call_id) {
                        self.rmsa.release(topology, &route);
                    }
                    topology.check_slot_invariant()?;
                    topology.check_regenerator_invariant()?;
                }
            }
        }

        result.finalize(topology);
        Ok(result)
    }
}

fn enqueue_arrival(queue: &mut BasicEventQueue, call: Call, seq: u64) -> u64 {
    let time = NotNan::new(call.arrival_time).unwrap_or_else(|_| NotNan::new(0.0).unwrap());
    queue.push(Event {
        time,
        seq,
        kind: EventKind::Arrival(call),
    });
    seq + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::AmplifierParams;
    use crate::regenerator::RegeneratorAssignment;
    use crate::routing::RoutingAlgorithm;
    use crate::spectrum::SpectrumAssignment;
    use crate::topology::Node;

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    #[test]
    fn run_completes_and_respects_invariants() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.add_link(b, a, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();

        let mut ctx = SimulationContext::new(42);
        let mut generator = CallGenerator::new(2.0, 1.0, vec![50.0, 100.0], vec![a, b]);
        let rmsa = Rmsa::new(
            RoutingAlgorithm::ShortestPathLength,
            SpectrumAssignment::FirstFit,
            RegeneratorAssignment::NoRegeneration,
        );
        let sim = NetworkSimulator::new(rmsa);

        let result = sim.run(&mut t, &mut ctx, &mut generator, 50).unwrap();
        assert_eq!(result.total_calls, 50);
        assert!(result.outcomes.is_empty());
        t.check_slot_invariant().unwrap();
        t.check_regenerator_invariant().unwrap();
    }

    #[test]
    fn with_trace_populates_per_call_outcomes() {
        let mut t = Topology::new(16);
        let a = t.add_node(Node::transparent());
        let b = t.add_node(Node::transparent());
        t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
        t.add_link(b, a, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();

        let mut ctx = SimulationContext::new(42);
        let mut generator = CallGenerator::new(2.0, 1.0, vec![50.0, 100.0], vec![a, b]);
        let rmsa = Rmsa::new(
            RoutingAlgorithm::ShortestPathLength,
            SpectrumAssignment::FirstFit,
            RegeneratorAssignment::NoRegeneration,
        );
        let sim = NetworkSimulator::new(rmsa).with_trace(true);

        let result = sim.run(&mut t, &mut ctx, &mut generator, 20).unwrap();
        assert_eq!(result.outcomes.len(), 20);
    }

    #[test]
    fn same_seed_reproduces_identical_outcomes() {
        let build = || {
            let mut t = Topology::new(16);
            let a = t.add_node(Node::transparent());
            let b = t.add_node(Node::transparent());
            t.add_link(a, b, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
            t.add_link(b, a, 80.0, 80.0, amp(16.0), amp(20.0), amp(16.0)).unwrap();
            (t, a, b)
        };

        let run = |seed: u64| {
            let (mut t, a, b) = build();
            let mut ctx = SimulationContext::new(seed);
            let mut generator = CallGenerator::new(2.0, 1.0, vec![50.0, 100.0], vec![a, b]);
            let rmsa = Rmsa::new(
                RoutingAlgorithm::ShortestPathLength,
                SpectrumAssignment::FirstFit,
                RegeneratorAssignment::NoRegeneration,
            );
            NetworkSimulator::new(rmsa).run(&mut t, &mut ctx, &mut generator, 30).unwrap()
        };

        let r1 = run(99);
        let r2 = run(99);
        assert_eq!(r1.total_calls, r2.total_calls);
        assert_eq!(r1.blocked_calls, r2.blocked_calls);
        assert_eq!(r1.regenerators_used_total, r2.regenerators_used_total);
    }
}
