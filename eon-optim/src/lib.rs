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

//! Particle swarm and NSGA-II optimisers that drive `eon-core` simulations
//! as a black-box fitness oracle.
//!
//! [`pso`] tunes a `RoutingAlgorithm::PowerSeries` coefficient vector
//! against blocking probability. [`nsga2`] searches the per-node
//! regenerator-count space, trading installed regenerators against
//! blocking probability as a Pareto front. Both route every fitness
//! evaluation through [`fitness::FitnessProblem`], which clones the base
//! topology and forks the [`eon_core::context::SimulationContext`] per
//! candidate so parallel evaluations (via `rayon`) never share mutable
//! state.

pub mod fitness;
pub mod nsga2;
pub mod pso;
