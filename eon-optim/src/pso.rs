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

//! Particle swarm optimisation over a real-valued routing coefficient
//! vector (spec §4.7), tuning a [`RoutingAlgorithm::PowerSeries`] through
//! blocking-probability feedback from a full simulation.

use eon_core::context::SimulationContext;
use eon_core::routing::RoutingAlgorithm;
use serde::{Deserialize, Serialize};

use crate::fitness::{FitnessProblem, FitnessResult};

/// `c1 = c2`, per spec §4.7.
const C1: f64 = 2.05;
/// `c1 = c2`, per spec §4.7.
const C2: f64 = 2.05;

fn constriction_factor() -> f64 {
    let phi = C1 + C2;
    2.0 / (2.0 - phi - (phi * phi - 4.0 * phi).sqrt()).abs()
}

/// One particle: position/velocity in the `N`-dimensional coefficient box,
/// plus its own best-seen position and fitness.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Current position (routing coefficients).
    pub x: Vec<f64>,
    /// Current velocity.
    pub v: Vec<f64>,
    /// Best position this particle has visited.
    pub best_x: Vec<f64>,
    /// Fitness at `best_x` (lower is better: blocking probability).
    pub best_fit: f64,
    /// Fitness at the current position.
    pub current_fit: f64,
}

/// Swarm configuration: box bounds, velocity clamp, swarm size, and
/// generation budget.
#[derive(Debug, Clone)]
pub struct PsoConfig {
    /// Dimensionality of the coefficient vector.
    pub dimensions: usize,
    /// Per-dimension lower bound.
    pub x_min: f64,
    /// Per-dimension upper bound.
    pub x_max: f64,
    /// Per-dimension velocity lower clamp.
    pub v_min: f64,
    /// Per-dimension velocity upper clamp.
    pub v_max: f64,
    /// Swarm size `P`.
    pub swarm_size: usize,
    /// Generations `G` to run.
    pub generations: u32,
}

/// A completed run: the best coefficient vector found and its fitness (spec
/// §6 optimiser IO: "PSO writes per-generation best coefficients").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsoOutcome {
    /// Best coefficients found across the whole swarm and run.
    pub best_x: Vec<f64>,
    /// Its fitness (blocking probability).
    pub best_fit: f64,
    /// Best coefficients recorded at the end of every generation (spec §6
    /// optimiser IO: "PSO writes per-generation best coefficients").
    pub history: Vec<(Vec<f64>, f64)>,
}

/// Run particle swarm optimisation against `problem`, evaluating fitness as
/// the blocking probability of a full simulation with the candidate's
/// coefficients installed as `RoutingAlgorithm::PowerSeries { betas }`.
pub fn optimize(problem: &FitnessProblem, ctx: &mut SimulationContext, cfg: &PsoConfig) -> PsoOutcome {
    let chi = constriction_factor();
    let mut swarm: Vec<Particle> = (0..cfg.swarm_size)
        .map(|_| {
            let x: Vec<f64> = (0..cfg.dimensions)
                .map(|_| ctx.sample_uniform() * (cfg.x_max - cfg.x_min) + cfg.x_min)
                .collect();
            let v: Vec<f64> = (0..cfg.dimensions)
                .map(|_| ctx.sample_uniform() * (cfg.v_max - cfg.v_min) + cfg.v_min)
                .collect();
            Particle {
                best_x: x.clone(),
                x,
                v,
                best_fit: f64::INFINITY,
                current_fit: f64::INFINITY,
            }
        })
        .collect();

    let mut global_best_x = swarm[0].x.clone();
    let mut global_best_fit = f64::INFINITY;
    let mut history = Vec::with_capacity(cfg.generations as usize);

    for generation in 0..cfg.generations {
        let fitnesses = problem.evaluate_batch(
            ctx,
            &swarm,
            |particle| {
                let mut rmsa = problem.rmsa.clone();
                rmsa.routing = routing_for(particle);
                rmsa
            },
            |_, _topology| {},
        );

        for (particle, fitness) in swarm.iter_mut().zip(fitnesses) {
            let value = match fitness {
                FitnessResult::Completed(result) => result.call_blocking_probability(),
                FitnessResult::Cancelled => continue,
            };
            particle.current_fit = value;
            if value < particle.best_fit {
                particle.best_fit = value;
                particle.best_x = particle.x.clone();
            }
            if value < global_best_fit {
                global_best_fit = value;
                global_best_x = particle.x.clone();
            }
        }

        let p = swarm.len();
        for i in 0..p {
            let left = (i + p - 1) % p;
            let right = (i + 1) % p;
            let neighbour_best = if swarm[left].best_fit <= swarm[right].best_fit {
                swarm[left].best_x.clone()
            } else {
                swarm[right].best_x.clone()
            };

            let particle = &mut swarm[i];
            for d in 0..cfg.dimensions {
                let eps1 = ctx.sample_uniform();
                let eps2 = ctx.sample_uniform();
                let cognitive = C1 * eps1 * (particle.best_x[d] - particle.x[d]);
                let social = C2 * eps2 * (neighbour_best[d] - particle.x[d]);
                particle.v[d] = chi * (particle.v[d] + cognitive + social);
                particle.v[d] = particle.v[d].clamp(cfg.v_min, cfg.v_max);
                particle.x[d] = (particle.x[d] + particle.v[d]).clamp(cfg.x_min, cfg.x_max);
            }
        }

        log::info!(
            "pso generation {generation}/{}: best P_block = {global_best_fit:.6}",
            cfg.generations
        );
        history.push((global_best_x.clone(), global_best_fit));
    }

    PsoOutcome {
        best_x: global_best_x,
        best_fit: global_best_fit,
        history,
    }
}

/// Build the candidate `RoutingAlgorithm` a particle represents. Kept
/// separate from [`optimize`]'s per-particle closure since the RMSA pipeline
/// used for fitness must carry the particle's own coefficients, not the
/// base problem's.
pub fn routing_for(particle: &Particle) -> RoutingAlgorithm {
    RoutingAlgorithm::PowerSeries {
        betas: particle.x.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constriction_factor_matches_the_standard_value() {
        let chi = constriction_factor();
        assert!((chi - 0.7298).abs() < 1e-3);
    }

    #[test]
    fn ring_neighbours_wrap_without_unsigned_underflow() {
        let p = 5usize;
        for i in 0..p {
            let left = (i + p - 1) % p;
            let right = (i + 1) % p;
            assert!(left < p && right < p);
        }
        assert_eq!((0 + p - 1) % p, p - 1);
    }
}
