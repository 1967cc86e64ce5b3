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

//! Modulation schemes and selection (spec §4.4).

/// A modulation format: bits per symbol, OSNR threshold, and maximum reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationScheme {
    /// Human-readable name (e.g. "BPSK").
    pub name: &'static str,
    /// Bits carried per symbol.
    pub bits_per_symbol: u8,
    /// Minimum OSNR, dB, this scheme requires to be usable.
    pub osnr_threshold_db: f64,
    /// Maximum reach at which the OSNR threshold is still met, km.
    pub reach_km: f64,
}

impl ModulationScheme {
    /// Number of 12.5 GHz slots this scheme needs to carry `bitrate_gbps`,
    /// at the given slot width (two polarizations, per
    /// `PhysicalConstants::numPolarizations`).
    pub fn num_slots(&self, bitrate_gbps: f64, slot_width_ghz: f64) -> u32 {
        let capacity_per_slot_gbps = (self.bits_per_symbol as f64) * slot_width_ghz * 2.0;
        (bitrate_gbps / capacity_per_slot_gbps).ceil().max(1.0) as u32
    }
}

/// The standard representative modulation ladder, ordered from least to
/// most spectrally efficient.
pub const SCHEMES: &[ModulationScheme] = &[
    ModulationScheme {
        name: "BPSK",
        bits_per_symbol: 1,
        osnr_threshold_db: 6.0,
        reach_km: 4000.0,
    },
    ModulationScheme {
        name: "QPSK",
        bits_per_symbol: 2,
        osnr_threshold_db: 9.0,
        reach_km: 2000.0,
    },
    ModulationScheme {
        name: "8QAM",
        bits_per_symbol: 3,
        osnr_threshold_db: 13.0,
        reach_km: 1000.0,
    },
    ModulationScheme {
        name: "16QAM",
        bits_per_symbol: 4,
        osnr_threshold_db: 16.0,
        reach_km: 500.0,
    },
];

/// Select the most spectrally efficient scheme whose OSNR threshold is met
/// by `osnr_db`. Ties (shouldn't occur with the fixed ladder above, since
/// efficiency is strictly increasing) break lexicographically by table
/// order, i.e. the first (least efficient) match wins among equals.
pub fn select_scheme(osnr_db: f64) -> Option<&'static ModulationScheme> {
    SCHEMES
        .iter()
        .filter(|s| osnr_db >= s.osnr_threshold_db)
        .max_by(|a, b| {
            a.bits_per_symbol
                .cmp(&b.bits_per_symbol)
                .then_with(|| b.name.cmp(a.name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_most_efficient_scheme_meeting_threshold() {
        assert_eq!(select_scheme(5.0), None);
        assert_eq!(select_scheme(6.0).unwrap().name, "BPSK");
        assert_eq!(select_scheme(9.5).unwrap().name, "QPSK");
        assert_eq!(select_scheme(20.0).unwrap().name, "16QAM");
    }

    #[test]
    fn num_slots_for_100gbps_bpsk_is_four() {
        let bpsk = &SCHEMES[0];
        // 1 bit/symbol * 12.5 GHz * 2 pol = 25 Gb/s per slot -> ceil(100/25) = 4
        assert_eq!(bpsk.num_slots(100.0, 12.5), 4);
    }
}
