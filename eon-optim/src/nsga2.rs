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

//! NSGA-II over per-node regenerator-count genomes (spec §4.8): bi-objective
//! search trading installed regenerators against blocking probability.

use eon_core::context::SimulationContext;
use eon_core::topology::{Node, NodeId, Topology};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fitness::{FitnessProblem, FitnessResult};

/// An integer genome: per-node regenerator count, `0..=r_max`.
#[derive(Debug, Clone)]
pub struct Individual {
    /// One entry per node in the problem's topology node order.
    pub genes: Vec<u32>,
    /// `(regenerators_installed, blocking_probability)`, lower is better on
    /// both. `None` until evaluated.
    pub objectives: Option<(f64, f64)>,
    /// Non-dominated rank, `0` is the first (best) front.
    pub rank: usize,
    /// Crowding distance within its front.
    pub crowding: f64,
}

impl Individual {
    fn random(r_max: u32, n_nodes: usize, ctx: &mut SimulationContext) -> Self {
        let genes = (0..n_nodes).map(|_| ctx.rng_mut().gen_range(0..=r_max)).collect();
        Individual {
            genes,
            objectives: None,
            rank: 0,
            crowding: 0.0,
        }
    }

    fn objectives(&self) -> (f64, f64) {
        self.objectives.expect("individual must be evaluated before its objectives are read")
    }
}

/// Upper bound on a node's regenerator count: `N_slots * ceil(B_max / 100)`.
pub fn r_max(n_slots: u32, max_bitrate_gbps: f64) -> u32 {
    n_slots * (max_bitrate_gbps / 100.0).ceil().max(1.0) as u32
}

/// Search configuration.
#[derive(Debug, Clone)]
pub struct Nsga2Config {
    /// Population size `mu`.
    pub population_size: usize,
    /// Offspring per generation `lambda` (typically equal to `population_size`).
    pub offspring_size: usize,
    /// Upper bound on each gene.
    pub r_max: u32,
    /// Maximum generations `G`.
    pub max_generations: u32,
    /// Stall window `K`: stop if the first front hasn't improved in this
    /// many generations.
    pub stall_generations: u32,
    /// SBX distribution index.
    pub crossover_eta: f64,
    /// Polynomial mutation distribution index.
    pub mutation_eta: f64,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
}

impl Default for Nsga2Config {
    fn default() -> Self {
        Nsga2Config {
            population_size: 40,
            offspring_size: 40,
            r_max: 10,
            max_generations: 100,
            stall_generations: 10,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            mutation_rate: 0.1,
        }
    }
}

/// One generation's first Pareto front, for the spec §6 optimiser-IO
/// contract ("NSGA-II writes each generation's first Pareto front as a list
/// of (gene vector, objectives) tuples").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontSnapshot {
    /// Generation index.
    pub generation: u32,
    /// `(genes, objectives)` for every individual on the first front.
    pub front: Vec<(Vec<u32>, (f64, f64))>,
}

/// Run NSGA-II over the per-node regenerator genome, returning the final
/// first front plus a per-generation snapshot history.
pub fn optimize(
    problem: &FitnessProblem,
    ctx: &mut SimulationContext,
    node_order: &[NodeId],
    cfg: &Nsga2Config,
) -> Vec<FrontSnapshot> {
    let n_nodes = node_order.len();
    let mut population: Vec<Individual> = (0..cfg.population_size)
        .map(|_| Individual::random(cfg.r_max, n_nodes, ctx))
        .collect();
    evaluate_population(problem, ctx, node_order, &mut population);
    assign_ranks_and_crowding(&mut population);

    let mut history = Vec::new();
    let mut best_front_size = 0usize;
    let mut stall = 0u32;

    for generation in 0..cfg.max_generations {
        let mut offspring = Vec::with_capacity(cfg.offspring_size);
        while offspring.len() < cfg.offspring_size {
            let parent_a = tournament_select(&population, ctx);
            let parent_b = tournament_select(&population, ctx);
            let (mut child_a, mut child_b) = crossover(parent_a, parent_b, cfg, ctx);
            mutate(&mut child_a, cfg, ctx);
            mutate(&mut child_b, cfg, ctx);
            offspring.push(child_a);
            if offspring.len() < cfg.offspring_size {
                offspring.push(child_b);
            }
        }
        evaluate_population(problem, ctx, node_order, &mut offspring);

        let mut combined: Vec<Individual> = population.into_iter().chain(offspring).collect();
        assign_ranks_and_crowding(&mut combined);
        combined.sort_by(|a, b| a.rank.cmp(&b.rank).then(b.crowding.partial_cmp(&a.crowding).unwrap()));
        combined.truncate(cfg.population_size);
        population = combined;

        let front: Vec<(Vec<u32>, (f64, f64))> = population
            .iter()
            .filter(|ind| ind.rank == 0)
            .map(|ind| (ind.genes.clone(), ind.objectives()))
            .collect();

        log::info!("nsga2 generation {generation}: first front size = {}", front.len());
        let improved = front.len() != best_front_size;
        best_front_size = front.len();
        history.push(FrontSnapshot { generation, front });

        if improved {
            stall = 0;
        } else {
            stall += 1;
            if stall >= cfg.stall_generations {
                log::info!("nsga2 stalled for {stall} generations, stopping early");
                break;
            }
        }
    }

    history
}

fn evaluate_population(
    problem: &FitnessProblem,
    ctx: &mut SimulationContext,
    node_order: &[NodeId],
    population: &mut [Individual],
) {
    let results = problem.evaluate_batch(
        ctx,
        population,
        |_| problem.rmsa.clone(),
        |individual, topology| install_genome(topology, node_order, &individual.genes),
    );
    for (individual, result) in population.iter_mut().zip(results) {
        let regenerators_installed = individual.genes.iter().sum::<u32>() as f64;
        let blocking = match result {
            FitnessResult::Completed(r) => r.call_blocking_probability(),
            FitnessResult::Cancelled => 1.0,
        };
        individual.objectives = Some((regenerators_installed, blocking));
    }
}

fn install_genome(topology: &mut Topology, node_order: &[NodeId], genes: &[u32]) {
    for (&node, &count) in node_order.iter().zip(genes) {
        if let Some(n) = topology.node_mut(node) {
            *n = if count == 0 {
                Node::transparent()
            } else {
                Node::translucent(count)
            };
        }
    }
}

fn dominates(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 <= b.0 && a.1 <= b.1) && (a.0 < b.0 || a.1 < b.1)
}

fn assign_ranks_and_crowding(population: &mut [Individual]) {
    let n = population.len();
    let objectives: Vec<(f64, f64)> = population.iter().map(|i| i.objectives()).collect();

    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(objectives[i], objectives[j]) {
                dominated_by[i].push(j);
            } else if dominates(objectives[j], objectives[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            population[i].rank = 0;
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    population[j].rank = current + 1;
                    next.push(j);
                }
            }
        }
        current += 1;
        fronts.push(next);
    }

    for front in &fronts {
        assign_crowding(population, &objectives, front);
    }
}

fn assign_crowding(population: &mut [Individual], objectives: &[(f64, f64)], front: &[usize]) {
    for &i in front {
        population[i].crowding = 0.0;
    }
    if front.len() <= 2 {
        for &i in front {
            population[i].crowding = f64::INFINITY;
        }
        return;
    }

    for objective_index in 0..2 {
        let mut sorted = front.to_vec();
        sorted.sort_by(|&a, &b| pick(objectives[a], objective_index).partial_cmp(&pick(objectives[b], objective_index)).unwrap());
        let min = pick(objectives[sorted[0]], objective_index);
        let max = pick(objectives[*sorted.last().unwrap()], objective_index);
        let range = (max - min).max(1e-12);

        population[sorted[0]].crowding = f64::INFINITY;
        population[*sorted.last().unwrap()].crowding = f64::INFINITY;
        for w in 1..sorted.len() - 1 {
            let prev = pick(objectives[sorted[w - 1]], objective_index);
            let next = pick(objectives[sorted[w + 1]], objective_index);
            population[sorted[w]].crowding += (next - prev) / range;
        }
    }
}

fn pick(objectives: (f64, f64), index: usize) -> f64 {
    if index == 0 {
        objectives.0
    } else {
        objectives.1
    }
}

fn tournament_select<'a>(population: &'a [Individual], ctx: &mut SimulationContext) -> &'a Individual {
    let a = &population[ctx.rng_mut().gen_range(0..population.len())];
    let b = &population[ctx.rng_mut().gen_range(0..population.len())];
    if a.rank < b.rank || (a.rank == b.rank && a.crowding > b.crowding) {
        a
    } else {
        b
    }
}

fn crossover(
    parent_a: &Individual,
    parent_b: &Individual,
    cfg: &Nsga2Config,
    ctx: &mut SimulationContext,
) -> (Individual, Individual) {
    let n = parent_a.genes.len();
    let mut genes_a = Vec::with_capacity(n);
    let mut genes_b = Vec::with_capacity(n);

    for i in 0..n {
        let x1 = parent_a.genes[i] as f64;
        let x2 = parent_b.genes[i] as f64;
        let u = ctx.sample_uniform();
        let beta = if u <= 0.5 {
            (2.0 * u).powf(1.0 / (cfg.crossover_eta + 1.0))
        } else {
            (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (cfg.crossover_eta + 1.0))
        };
        let child1 = 0.5 * ((1.0 + beta) * x1 + (1.0 - beta) * x2);
        let child2 = 0.5 * ((1.0 - beta) * x1 + (1.0 + beta) * x2);
        genes_a.push(child1.round().clamp(0.0, cfg.r_max as f64) as u32);
        genes_b.push(child2.round().clamp(0.0, cfg.r_max as f64) as u32);
    }

    (
        Individual {
            genes: genes_a,
            objectives: None,
            rank: 0,
            crowding: 0.0,
        },
        Individual {
            genes: genes_b,
            objectives: None,
            rank: 0,
            crowding: 0.0,
        },
    )
}

fn mutate(individual: &mut Individual, cfg: &Nsga2Config, ctx: &mut SimulationContext) {
    for gene in individual.genes.iter_mut() {
        if ctx.sample_uniform() > cfg.mutation_rate {
            continue;
        }
        let x = *gene as f64;
        let r_max = cfg.r_max as f64;
        let u = ctx.sample_uniform();
        let delta = if u < 0.5 {
            let d = (2.0 * u).powf(1.0 / (cfg.mutation_eta + 1.0)) - 1.0;
            d * x
        } else {
            let d = 1.0 - (2.0 * (1.0 - u)).powf(1.0 / (cfg.mutation_eta + 1.0));
            d * (r_max - x)
        };
        *gene = (x + delta).round().clamp(0.0, r_max) as u32;
    }
}

/// Build the candidate node index used to label a fitness run's topology
/// with a genome, in a fixed order matching [`Individual::genes`].
pub fn node_order(topology: &Topology) -> Vec<NodeId> {
    topology.node_ids()
}

/// True if `node`'s installed type in a genome-labelled topology would be
/// translucent (non-zero gene).
pub fn is_translucent_under(genes: &[u32], node_order: &[NodeId], node: NodeId) -> bool {
    node_order
        .iter()
        .position(|&n| n == node)
        .map(|idx| genes[idx] > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_max_rounds_up_bitrate_to_regenerator_units() {
        assert_eq!(r_max(320, 150.0), 320 * 2);
        assert_eq!(r_max(320, 100.0), 320);
    }

    #[test]
    fn dominance_is_strict_in_at_least_one_objective() {
        assert!(dominates((1.0, 1.0), (2.0, 2.0)));
        assert!(!dominates((1.0, 2.0), (1.0, 2.0)));
        assert!(dominates((1.0, 1.0), (1.0, 2.0)));
    }

    #[test]
    fn crossover_children_stay_within_gene_bounds() {
        let cfg = Nsga2Config::default();
        let mut ctx = SimulationContext::new(3);
        let a = Individual {
            genes: vec![0, cfg.r_max],
            objectives: Some((0.0, 0.0)),
            rank: 0,
            crowding: 0.0,
        };
        let b = Individual {
            genes: vec![cfg.r_max, 0],
            objectives: Some((0.0, 0.0)),
            rank: 0,
            crowding: 0.0,
        };
        let (c1, c2) = crossover(&a, &b, &cfg, &mut ctx);
        for gene in c1.genes.iter().chain(c2.genes.iter()) {
            assert!(*gene <= cfg.r_max);
        }
    }
}
