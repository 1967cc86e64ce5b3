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

#![deny(missing_debug_implementations)]

//! `eon-core`: a translucent elastic optical network simulator.
//!
//! This crate models routing, modulation, spectrum assignment, and
//! regenerator placement (RMSA) over an elastic optical network with a
//! mixture of transparent, translucent, and opaque nodes, and drives a
//! Poisson call-arrival discrete-event simulation over it.
//!
//! ## Main Concepts
//!
//! * [`topology::Topology`] holds the network graph: nodes carrying
//!   regenerator capacity ([`topology::Node`]), and links carrying a
//!   physical device chain and a slot-indexed spectrum
//!   ([`topology::Link`]).
//! * [`routing::RoutingAlgorithm`] picks a path; [`spectrum::SpectrumAssignment`]
//!   picks a slot window within a transparent segment of that path;
//!   [`regenerator::RegeneratorAssignment`] partitions the path into
//!   transparent segments joined by regenerators, choosing a
//!   [`modulation::ModulationScheme`] and a spectrum window per segment.
//!   [`rmsa::Rmsa`] composes the three into a single `assign_call`/`release`
//!   pair.
//! * [`context::SimulationContext`] carries the physical defaults and the
//!   seeded PRNG every stochastic draw in the crate goes through, so a run
//!   is reproducible end to end from its seed.
//! * [`simulation::NetworkSimulator`] drives calls generated by
//!   [`simulation::CallGenerator`] through an [`event::EventQueue`] of
//!   arrivals and departures, accumulating a [`metrics::SimulationResult`].
//! * [`placement`] derives a translucent regenerator siting from a baseline
//!   all-opaque run, for use ahead of a full simulation.
//! * [`config`] resolves a serde-deserialised topology and simulation
//!   description into the runtime types above, surfacing [`error::ConfigError`]
//!   on anything invalid.
//!
//! ## Error Handling
//!
//! [`error::BlockCause`] covers call-admission failures recorded as
//! statistics; [`error::NumericError`] covers invariant violations that must
//! propagate out of the event loop rather than be swallowed. See
//! [`error`] for the full taxonomy.
//!
//! ## Example usage
//!
//! ```
//! use eon_core::prelude::*;
//!
//! let mut topology = Topology::new(16);
//! let a = topology.add_node(Node::transparent());
//! let b = topology.add_node(Node::transparent());
//! let amp = eon_core::devices::AmplifierParams { gain_db: 16.0, noise_figure_db: 5.0 };
//! topology.add_link(a, b, 80.0, 80.0, amp, amp, amp).unwrap();
//! topology.add_link(b, a, 80.0, 80.0, amp, amp, amp).unwrap();
//!
//! let mut ctx = SimulationContext::new(7);
//! let mut generator = CallGenerator::new(1.0, 1.0, vec![100.0], vec![a, b]);
//! let rmsa = Rmsa::new(
//!     RoutingAlgorithm::ShortestPathLength,
//!     SpectrumAssignment::FirstFit,
//!     RegeneratorAssignment::NoRegeneration,
//! );
//! let result = NetworkSimulator::new(rmsa)
//!     .run(&mut topology, &mut ctx, &mut generator, 20)
//!     .unwrap();
//! assert_eq!(result.total_calls, 20);
//! ```

pub mod calls;
pub mod config;
pub mod context;
pub mod devices;
pub mod error;
pub mod event;
pub mod metrics;
pub mod modulation;
pub mod placement;
pub mod regenerator;
pub mod rmsa;
pub mod routing;
pub mod simulation;
pub mod spectrum;
pub mod topology;
pub mod units;

pub mod prelude;
