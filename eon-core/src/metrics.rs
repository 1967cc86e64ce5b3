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

//! Per-run simulation results (spec §6 result format).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::BlockCause;
use crate::topology::{NodeId, Topology};

/// The admission outcome of a single call, kept for the property that
/// replaying a simulation with the same seed yields bit-identical outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Admitted, with the regenerators it consumed.
    Admitted {
        /// Call identifier.
        call_id: u64,
        /// Regenerators consumed along the route.
        regenerators_used: u32,
    },
    /// Blocked, with the recorded cause.
    Blocked {
        /// Call identifier.
        call_id: u64,
        /// Why admission failed.
        cause: String,
    },
}

/// A completed simulation run's statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationResult {
    /// Calls offered.
    pub total_calls: u64,
    /// Calls blocked.
    pub blocked_calls: u64,
    /// Total offered bandwidth, Gb/s (sum over all arrivals).
    pub total_bandwidth_gbps: f64,
    /// Bandwidth blocked, Gb/s.
    pub blocked_bandwidth_gbps: f64,
    /// Total regenerators consumed across all admitted calls (not a
    /// point-in-time count: summed over the run's admissions).
    pub regenerators_used_total: u64,
    /// Peak simultaneous regenerator usage observed per node.
    pub regenerators_max_simultaneous_per_node: HashMap<NodeId, u32>,
    /// Blocking causes tallied by kind.
    pub block_causes: HashMap<&'static str, u64>,
    /// Mean spectrum utilisation across all links at the end of the run.
    pub spectrum_utilization: f64,
    /// Capital expenditure of the final device/regenerator configuration.
    pub capex: f64,
    /// Operational expenditure per unit time of the final configuration.
    pub opex: f64,
    /// Per-call admission outcomes, in arrival order. Only populated when
    /// the run was started with tracing enabled
    /// (`NetworkSimulator::with_trace`); empty otherwise.
    pub outcomes: Vec<CallOutcome>,
}

impl SimulationResult {
    /// Call-blocking probability, `P_block`.
    pub fn call_blocking_probability(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.blocked_calls as f64 / self.total_calls as f64
        }
    }

    /// Bandwidth-blocking probability, `P_bb`.
    pub fn bandwidth_blocking_probability(&self) -> f64 {
        if self.total_bandwidth_gbps == 0.0 {
            0.0
        } else {
            self.blocked_bandwidth_gbps / self.total_bandwidth_gbps
        }
    }

    /// Mean regenerators used per admitted call.
    pub fn mean_regenerators_used(&self) -> f64 {
        let admitted = self.total_calls - self.blocked_calls;
        if admitted == 0 {
            0.0
        } else {
            self.regenerators_used_total as f64 / admitted as f64
        }
    }

    pub(crate) fn record_arrival(&mut self, bitrate_gbps: f64) {
        self.total_calls += 1;
        self.total_bandwidth_gbps += bitrate_gbps;
    }

    pub(crate) fn record_admission(&mut self, call_id: u64, regenerators_used: u32, record_trace: bool) {
        self.regenerators_used_total += regenerators_used as u64;
        if record_trace {
            self.outcomes.push(CallOutcome::Admitted {
                call_id,
                regenerators_used,
            });
        }
    }

    pub(crate) fn record_block(&mut self, call_id: u64, bitrate_gbps: f64, cause: BlockCause, record_trace: bool) {
        self.blocked_calls += 1;
        self.blocked_bandwidth_gbps += bitrate_gbps;
        *self.block_causes.entry(cause_name(cause)).or_insert(0) += 1;
        if record_trace {
            self.outcomes.push(CallOutcome::Blocked {
                call_id,
                cause: cause.to_string(),
            });
        }
    }

    /// Snapshot final-topology quantities: per-node peak regenerator usage,
    /// mean spectrum utilisation, and capex/opex of the installed device and
    /// regenerator inventory.
    pub(crate) fn finalize(&mut self, topology: &Topology) {
        for node in topology.node_ids() {
            let n = topology.node(node).unwrap();
            self.regenerators_max_simultaneous_per_node
                .insert(node, n.max_simultaneous_used());
            self.capex += (n.regenerators_total() as f64) * 3.0;
        }

        let mut total_slots = 0u64;
        let mut free_slots = 0u64;
        for link in topology.link_ids() {
            let l = topology.link(link).unwrap();
            total_slots += l.slots().len() as u64;
            free_slots += l.availability() as u64;
            for device in l.devices() {
                self.capex += device.capex();
                self.opex += device.opex();
            }
        }
        self.spectrum_utilization = if total_slots == 0 {
            0.0
        } else {
            1.0 - (free_slots as f64 / total_slots as f64)
        };
    }
}

fn cause_name(cause: BlockCause) -> &'static str {
    match cause {
        BlockCause::NoRoute(..) => "no_route",
        BlockCause::NoSpectrum => "no_spectrum",
        BlockCause::OsnrFailure => "osnr_failure",
        BlockCause::NoRegenerator => "no_regenerator",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_probabilities_are_zero_on_empty_run() {
        let r = SimulationResult::default();
        assert_eq!(r.call_blocking_probability(), 0.0);
        assert_eq!(r.bandwidth_blocking_probability(), 0.0);
    }

    #[test]
    fn blocking_probabilities_track_recorded_outcomes() {
        let mut r = SimulationResult::default();
        r.record_arrival(100.0);
        r.record_admission(1, 0, false);
        r.record_arrival(200.0);
        r.record_block(2, 200.0, BlockCause::NoSpectrum, false);

        assert!((r.call_blocking_probability() - 0.5).abs() < 1e-12);
        assert!((r.bandwidth_blocking_probability() - (200.0 / 300.0)).abs() < 1e-12);
    }

    #[test]
    fn outcomes_are_only_recorded_when_tracing_is_enabled() {
        let mut untraced = SimulationResult::default();
        untraced.record_arrival(100.0);
        untraced.record_admission(1, 0, false);
        untraced.record_arrival(200.0);
        untraced.record_block(2, 200.0, BlockCause::NoSpectrum, false);
        assert!(untraced.outcomes.is_empty());

        let mut traced = SimulationResult::default();
        traced.record_arrival(100.0);
        traced.record_admission(1, 0, true);
        traced.record_arrival(200.0);
        traced.record_block(2, 200.0, BlockCause::NoSpectrum, true);
        assert_eq!(traced.outcomes.len(), 2);
    }
}
