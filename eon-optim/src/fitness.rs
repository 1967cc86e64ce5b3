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

//! Shared fitness-evaluation plumbing for both optimisers (spec §5: parallel
//! fitness evaluations each own a private cloned topology; no shared
//! mutable state crosses task boundaries).

use eon_core::prelude::*;
use rayon::prelude::*;

/// Everything a fitness evaluation needs, cloned once per candidate so
/// parallel evaluations never share mutable state.
#[derive(Debug, Clone)]
pub struct FitnessProblem {
    /// Base topology, cloned per evaluation before any mutation.
    pub topology: Topology,
    /// RMSA pipeline under test.
    pub rmsa: Rmsa,
    /// Bitrate classes and probabilities offered to the call generator.
    pub bitrates: Vec<(f64, f64)>,
    /// Offered load, Erlang.
    pub offered_load_erlang: f64,
    /// Holding-time rate.
    pub mu: f64,
    /// Calls to simulate per fitness evaluation.
    pub call_count: u64,
    /// Candidate source/destination node pool.
    pub nodes: Vec<NodeId>,
}

/// The outcome of one fitness evaluation. Cancellation (spec §5: "a fitness
/// evaluation is cancellable at arrival-event boundaries ... returns bottom
/// and is retried") is not driven by the cooperative single-threaded core
/// here -- each evaluation runs to completion on its own task -- but the
/// variant is kept so a caller-driven cancel (e.g. a wall-clock budget) has
/// somewhere to land without panicking the fitness loop.
#[derive(Debug, Clone)]
pub enum FitnessResult {
    /// The simulation ran to completion.
    Completed(SimulationResult),
    /// The evaluation was cancelled and should be retried.
    Cancelled,
}

impl FitnessProblem {
    /// Run one simulation over a cloned topology and a forked context.
    /// `configure` mutates the cloned topology before the run (used by
    /// NSGA-II to install a candidate's per-node regenerator genome);
    /// `rmsa` is the pipeline to drive it with (used by PSO to install a
    /// candidate's routing coefficients). Both default to a no-op / the
    /// problem's base pipeline via [`Self::evaluate`].
    pub fn evaluate_with(
        &self,
        ctx: &mut SimulationContext,
        rmsa: &Rmsa,
        configure: impl FnOnce(&mut Topology),
    ) -> FitnessResult {
        let mut topology = self.topology.clone();
        configure(&mut topology);
        let mut child_ctx = ctx.fork();
        let mut generator = CallGenerator::new_weighted(
            self.offered_load_erlang,
            self.mu,
            self.bitrates.clone(),
            self.nodes.clone(),
        );
        match NetworkSimulator::new(rmsa.clone()).run(
            &mut topology,
            &mut child_ctx,
            &mut generator,
            self.call_count,
        ) {
            Ok(result) => FitnessResult::Completed(result),
            Err(e) => {
                log::warn!("fitness evaluation hit a fatal numeric error: {e}");
                FitnessResult::Cancelled
            }
        }
    }

    /// [`Self::evaluate_with`] against the problem's own base pipeline, only
    /// mutating the cloned topology.
    pub fn evaluate(&self, ctx: &mut SimulationContext, configure: impl FnOnce(&mut Topology)) -> FitnessResult {
        self.evaluate_with(ctx, &self.rmsa, configure)
    }

    /// Evaluate a batch of candidates in parallel, one forked context per
    /// candidate, via `rayon::par_iter`. `rmsa_for` builds the pipeline each
    /// candidate should run under (e.g. PSO installs routing coefficients);
    /// `configure` mutates the cloned topology each candidate runs over
    /// (e.g. NSGA-II installs a regenerator genome).
    pub fn evaluate_batch<T: Sync>(
        &self,
        ctx: &mut SimulationContext,
        candidates: &[T],
        rmsa_for: impl Fn(&T) -> Rmsa + Sync,
        configure: impl Fn(&T, &mut Topology) + Sync,
    ) -> Vec<FitnessResult> {
        let forks: Vec<SimulationContext> = candidates.iter().map(|_| ctx.fork()).collect();
        candidates
            .par_iter()
            .zip(forks.into_par_iter())
            .map(|(candidate, mut forked)| {
                let rmsa = rmsa_for(candidate);
                self.evaluate_with(&mut forked, &rmsa, |t| configure(candidate, t))
            })
            .collect()
    }
}
