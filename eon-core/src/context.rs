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

//! [`SimulationContext`]: the one place global-looking state (default input
//! power/OSNR, `alphaFiber`, slot count, the PRNG) lives, passed explicitly
//! to every component instead of sitting behind process-wide mutables
//! (Design Note: "avoid process-wide mutables; parallel fitness evaluations
//! stay independent").

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::units::{FrequencyGrid, Gain, Power, B_REF};

/// Default fibre attenuation coefficient, dB/km.
pub const DEFAULT_ALPHA_FIBER_DB_PER_KM: f64 = 0.2;
/// Default slot grid size.
pub const DEFAULT_N_SLOTS: u32 = 320;
/// Default slot width, Hz (one 12.5 GHz ITU-T flex-grid slot).
pub const DEFAULT_SLOT_WIDTH_HZ: f64 = B_REF;

/// Shared simulation parameters and the seeded PRNG every stochastic draw in
/// the crate must route through (spec §5: "fixing a seed reproduces a
/// simulation bit-for-bit").
#[derive(Debug, Clone)]
pub struct SimulationContext {
    alpha_fiber_db_per_km: f64,
    input_power: Power,
    input_osnr: Gain,
    n_slots: u32,
    slot_width_hz: f64,
    consider_filter_imperfection: bool,
    spectral_grid: Arc<FrequencyGrid>,
    rng: StdRng,
}

impl SimulationContext {
    /// Build a context with default physical parameters and the given PRNG
    /// seed.
    pub fn new(seed: u64) -> Self {
        let n_slots = DEFAULT_N_SLOTS;
        SimulationContext {
            alpha_fiber_db_per_km: DEFAULT_ALPHA_FIBER_DB_PER_KM,
            input_power: Power::from_dbm(0.0),
            input_osnr: Gain::from_db(35.0),
            n_slots,
            slot_width_hz: DEFAULT_SLOT_WIDTH_HZ,
            consider_filter_imperfection: false,
            spectral_grid: Arc::new(FrequencyGrid {
                len: (n_slots as usize) * 4,
                resolution_hz: DEFAULT_SLOT_WIDTH_HZ / 4.0,
            }),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Override the fibre loss coefficient, dB/km.
    pub fn with_alpha_fiber(mut self, alpha_db_per_km: f64) -> Self {
        self.alpha_fiber_db_per_km = alpha_db_per_km;
        self
    }

    /// Override the default transmitter input power.
    pub fn with_input_power(mut self, power: Power) -> Self {
        self.input_power = power;
        self
    }

    /// Override the default transmitter input OSNR.
    pub fn with_input_osnr(mut self, osnr: Gain) -> Self {
        self.input_osnr = osnr;
        self
    }

    /// Override the slot grid size. Rebuilds the spectral sampling grid.
    pub fn with_n_slots(mut self, n_slots: u32) -> Self {
        self.n_slots = n_slots;
        self.spectral_grid = Arc::new(FrequencyGrid {
            len: (n_slots as usize) * 4,
            resolution_hz: self.slot_width_hz / 4.0,
        });
        self
    }

    /// Enable or disable filter-imperfection (transfer-function) tracking.
    /// A pure enable switch: when disabled, transfer-function application is
    /// a no-op, never a silent change of numerics (Design Note, §9).
    pub fn with_filter_imperfection(mut self, enabled: bool) -> Self {
        self.consider_filter_imperfection = enabled;
        self
    }

    /// Fibre loss coefficient, dB/km.
    pub fn alpha_fiber(&self) -> f64 {
        self.alpha_fiber_db_per_km
    }

    /// Default transmitter input power.
    pub fn input_power(&self) -> Power {
        self.input_power
    }

    /// Default transmitter input OSNR.
    pub fn input_osnr(&self) -> &Gain {
        &self.input_osnr
    }

    /// Configured slot count per link.
    pub fn n_slots(&self) -> u32 {
        self.n_slots
    }

    /// Width of a single slot, Hz.
    pub fn slot_width_hz(&self) -> f64 {
        self.slot_width_hz
    }

    /// Whether filter-imperfection tracking is enabled.
    pub fn consider_filter_imperfection(&self) -> bool {
        self.consider_filter_imperfection
    }

    /// The process-wide spectral sampling grid.
    pub fn spectral_grid(&self) -> Arc<FrequencyGrid> {
        self.spectral_grid.clone()
    }

    /// Draw a uniform value in `[0, 1)` from the context-owned PRNG. Every
    /// stochastic choice in the crate (call arrivals, holding times, random
    /// spectrum assignment, PSO/NSGA-II sampling) goes through this rather
    /// than `rand::thread_rng()`.
    pub fn sample_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Direct access to the underlying RNG, for distributions that need more
    /// than a single uniform draw (e.g. `rand_distr::Exp`).
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fork an independent context for a parallel fitness evaluation: same
    /// physical parameters, a fresh PRNG stream deterministically derived
    /// from this context's current state (spec §5: "each owning a private
    /// cloned topology; no shared mutable state crosses task boundaries",
    /// while staying reproducible given the parent seed).
    pub fn fork(&mut self) -> SimulationContext {
        let sub_seed: u64 = self.rng.gen();
        let mut child = self.clone();
        child.rng = StdRng::seed_from_u64(sub_seed);
        child
    }
}
