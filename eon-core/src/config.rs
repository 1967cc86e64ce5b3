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

//! External configuration surface (spec §6): serde-deserialisable topology
//! and simulation config, validated into the types the rest of the crate
//! actually runs on. Unrecognised algorithm nicknames and malformed
//! topologies surface here as [`ConfigError`], not deep inside the pipeline.

use serde::{Deserialize, Serialize};

use crate::devices::AmplifierParams;
use crate::error::ConfigError;
use crate::regenerator::RegeneratorAssignment;
use crate::rmsa::Rmsa;
use crate::routing::RoutingAlgorithm;
use crate::spectrum::SpectrumAssignment;
use crate::topology::{Node, NodeType, Topology};

/// A node in a topology input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// How this node participates in regeneration.
    pub node_type: NodeType,
    /// Installed regenerators, meaningful only for [`NodeType::Translucent`].
    #[serde(default)]
    pub regenerators: u32,
}

/// A directed link in a topology input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Index into the topology's node list.
    pub from: usize,
    /// Index into the topology's node list.
    pub to: usize,
    /// Physical length, km.
    pub length_km: f64,
    /// Amplifier span length, km.
    pub span_length_km: f64,
    /// Booster amplifier parameters.
    pub booster: AmplifierParams,
    /// In-line amplifier parameters.
    pub inline_amp: AmplifierParams,
    /// Pre-amplifier parameters.
    pub pre_amp: AmplifierParams,
}

/// A complete topology input (spec §6: "list of nodes with type, list of
/// links with `(u, v, length_km, span_length_km)`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Per-link slot count.
    pub n_slots: u32,
    /// Nodes, indexed `0..nodes.len()`.
    pub nodes: Vec<NodeConfig>,
    /// Links between node indices.
    pub links: Vec<LinkConfig>,
}

impl TopologyConfig {
    /// Build the runtime [`Topology`], rejecting malformed link endpoints or
    /// non-positive lengths.
    pub fn build(&self) -> Result<Topology, ConfigError> {
        let mut topology = Topology::new(self.n_slots);
        let mut ids = Vec::with_capacity(self.nodes.len());
        for n in &self.nodes {
            let node = match n.node_type {
                NodeType::Transparent => Node::transparent(),
                NodeType::Translucent => Node::translucent(n.regenerators),
                NodeType::Opaque => Node::opaque(),
            };
            ids.push(topology.add_node(node));
        }
        for l in &self.links {
            let &from = ids.get(l.from).ok_or_else(|| {
                ConfigError::InvalidTopology(format!("link references unknown node index {}", l.from))
            })?;
            let &to = ids.get(l.to).ok_or_else(|| {
                ConfigError::InvalidTopology(format!("link references unknown node index {}", l.to))
            })?;
            topology.add_link(from, to, l.length_km, l.span_length_km, l.booster, l.inline_amp, l.pre_amp)?;
        }
        Ok(topology)
    }

    /// Parse a topology config from a JSON document.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::InvalidValue {
            field: "(document)",
            reason: e.to_string(),
        })
    }
}

/// One bitrate class and its offered probability (spec §6: "number of
/// bitrates with probabilities").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BitrateProfile {
    /// Bitrate, Gb/s.
    pub gbps: f64,
    /// Relative probability of offering this bitrate (need not be
    /// pre-normalised).
    pub probability: f64,
}

/// The simulation-level configuration (spec §6: "routing algorithm
/// nickname, spectrum-assignment nickname, regenerator-assignment nickname,
/// call count, offered load (Erlang), number of bitrates with
/// probabilities").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Routing algorithm nickname.
    pub routing_algorithm: String,
    /// Spectrum assignment nickname.
    pub spectrum_assignment: String,
    /// Regenerator assignment nickname.
    pub regenerator_assignment: String,
    /// Number of call arrivals to generate.
    pub call_count: u64,
    /// Offered load, Erlang.
    pub offered_load_erlang: f64,
    /// Holding-time rate `mu` (1.0 by convention).
    #[serde(default = "default_mu")]
    pub mu: f64,
    /// Bitrate classes and their probabilities.
    pub bitrates: Vec<BitrateProfile>,
    /// Whether `NetworkSimulator` should retain a per-call outcome trace
    /// (`SimulationResult::outcomes`). Off by default: memory is a real
    /// concern at call counts in the millions.
    #[serde(default)]
    pub record_trace: bool,
}

fn default_mu() -> f64 {
    1.0
}

impl SimulationConfig {
    /// Resolve algorithm nicknames into an [`Rmsa`] pipeline, or a
    /// [`ConfigError`] on an unrecognised nickname or empty bitrate list.
    pub fn validate(&self) -> Result<Rmsa, ConfigError> {
        if self.bitrates.is_empty() {
            return Err(ConfigError::MissingField("bitrates"));
        }
        if self.call_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "call_count",
                reason: "must be positive".to_string(),
            });
        }
        if self.offered_load_erlang <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "offered_load_erlang",
                reason: "must be positive".to_string(),
            });
        }
        let routing = RoutingAlgorithm::from_nickname(&self.routing_algorithm)?;
        let spectrum = SpectrumAssignment::from_nickname(&self.spectrum_assignment)?;
        let regenerator = RegeneratorAssignment::from_nickname(&self.regenerator_assignment)?;
        Ok(Rmsa::new(routing, spectrum, regenerator))
    }

    /// Parse a simulation config from a JSON document.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::InvalidValue {
            field: "(document)",
            reason: e.to_string(),
        })
    }

    /// Serialise back to JSON, for persisting the resolved config alongside
    /// a run's [`crate::metrics::SimulationResult`].
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "(document)",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> SimulationConfig {
        SimulationConfig {
            routing_algorithm: "shortest-path-length".to_string(),
            spectrum_assignment: "first-fit".to_string(),
            regenerator_assignment: "no-regeneration".to_string(),
            call_count: 100,
            offered_load_erlang: 5.0,
            mu: 1.0,
            bitrates: vec![BitrateProfile {
                gbps: 100.0,
                probability: 1.0,
            }],
            record_trace: false,
        }
    }

    #[test]
    fn valid_config_resolves_to_an_rmsa_pipeline() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn simulation_config_round_trips_through_json() {
        let cfg = sample_config();
        let json = cfg.to_json().unwrap();
        let parsed = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(parsed.routing_algorithm, cfg.routing_algorithm);
        assert_eq!(parsed.call_count, cfg.call_count);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(SimulationConfig::from_json("not json").is_err());
    }

    #[test]
    fn unknown_nickname_is_a_config_error() {
        let mut cfg = sample_config();
        cfg.routing_algorithm = "bogus".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_bitrates_is_a_config_error() {
        let mut cfg = sample_config();
        cfg.bitrates.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn topology_config_rejects_dangling_link_endpoint() {
        let cfg = TopologyConfig {
            n_slots: 8,
            nodes: vec![NodeConfig {
                node_type: NodeType::Transparent,
                regenerators: 0,
            }],
            links: vec![LinkConfig {
                from: 0,
                to: 5,
                length_km: 80.0,
                span_length_km: 80.0,
                booster: AmplifierParams {
                    gain_db: 16.0,
                    noise_figure_db: 5.0,
                },
                inline_amp: AmplifierParams {
                    gain_db: 20.0,
                    noise_figure_db: 5.0,
                },
                pre_amp: AmplifierParams {
                    gain_db: 16.0,
                    noise_figure_db: 5.0,
                },
            }],
        };
        assert!(cfg.build().is_err());
    }
}
