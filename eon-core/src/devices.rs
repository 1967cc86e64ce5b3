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

//! Polymorphic optical devices. A single tagged enum, per Design Note
//! "polymorphic devices / algorithms: use a tagged-variant enum plus a
//! capability interface"; the capability interface here is the set of
//! inherent methods below rather than a separate trait, since the variant
//! set is closed and every variant needs every method.

use serde::{Deserialize, Serialize};

use crate::context::SimulationContext;
use crate::error::NumericError;
use crate::units::{Gain, Power, TransferFunction, FREQ_CARRIER, NUM_POLARIZATIONS, PLANCK_CONSTANT};
use crate::units::Signal;

/// Gain and noise-figure parameters shared by all amplifier variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplifierParams {
    /// Configured gain, dB.
    pub gain_db: f64,
    /// Noise figure, dB.
    pub noise_figure_db: f64,
}

/// A single optical element in a link's device chain.
#[derive(Debug, Clone)]
pub enum Device {
    /// A span of fibre of the given length, with loss `-alphaFiber * length`.
    Fiber {
        /// Length of this fibre segment, km.
        span_length_km: f64,
    },
    /// Booster amplifier at the transmit end of a link.
    Booster(AmplifierParams),
    /// In-line amplifier compensating a single fibre span.
    InLineAmplifier(AmplifierParams),
    /// Pre-amplifier at the receive end of a link.
    PreAmplifier(AmplifierParams),
    /// Switching element (ROADM/WSS), optionally shaping the spectrum.
    Sss {
        /// Insertion loss of the switching fabric, dB.
        switching_loss_db: f64,
        /// Super-Gaussian filter order of the WSS passband.
        filter_order: u32,
        /// 3 dB filter bandwidth, Hz.
        filter_bandwidth_hz: f64,
    },
    /// An OEO regenerator: resets the signal rather than attenuating it.
    Regenerator,
}

impl Device {
    /// This device's gain (negative for loss), dB-domain.
    pub fn gain(&self, ctx: &SimulationContext) -> Gain {
        match self {
            Device::Fiber { span_length_km } => Gain::from_db(-ctx.alpha_fiber() * span_length_km),
            Device::Booster(p) | Device::InLineAmplifier(p) | Device::PreAmplifier(p) => {
                Gain::from_db(p.gain_db)
            }
            Device::Sss {
                switching_loss_db, ..
            } => Gain::from_db(-switching_loss_db),
            Device::Regenerator => Gain::from_db(0.0),
        }
    }

    /// Additive (ASE) noise power contributed by this device, referenced to
    /// `B_REF`. Only amplifiers contribute noise in this model.
    pub fn noise_power(&self, ctx: &SimulationContext) -> Result<Power, NumericError> {
        match self {
            Device::Booster(p) | Device::InLineAmplifier(p) | Device::PreAmplifier(p) => {
                let gain_linear = Gain::from_db(p.gain_db).linear();
                let nf_linear = Gain::from_db(p.noise_figure_db).linear();
                let watts = PLANCK_CONSTANT
                    * FREQ_CARRIER
                    * (gain_linear - 1.0).max(0.0)
                    * nf_linear
                    * crate::units::B_REF
                    * NUM_POLARIZATIONS;
                Power::new(watts, crate::units::B_REF)
            }
            _ => Power::new(0.0, crate::units::B_REF),
        }
    }

    /// The device's filtering transfer function, if it shapes the spectrum
    /// (only switching elements do in this model).
    pub fn transfer_function(&self) -> Option<TransferFunction> {
        match self {
            Device::Sss {
                filter_order,
                filter_bandwidth_hz,
                ..
            } => Some(TransferFunction {
                center_offset_hz: 0.0,
                bandwidth_hz: *filter_bandwidth_hz,
                order: *filter_order,
            }),
            _ => None,
        }
    }

    /// Capital expenditure of installing this device.
    pub fn capex(&self) -> f64 {
        match self {
            Device::Booster(_) | Device::InLineAmplifier(_) | Device::PreAmplifier(_) => 1.0,
            Device::Regenerator => 3.0,
            Device::Fiber { .. } | Device::Sss { .. } => 0.0,
        }
    }

    /// Operational expenditure per unit time of running this device.
    pub fn opex(&self) -> f64 {
        match self {
            Device::Booster(_) | Device::InLineAmplifier(_) | Device::PreAmplifier(_) => 0.1,
            Device::Regenerator => 0.3,
            Device::Fiber { .. } | Device::Sss { .. } => 0.0,
        }
    }

    /// Propagate a signal through this single device: applies gain, adds
    /// noise, applies the transfer function (a no-op unless filter
    /// imperfection tracking is enabled), or -- for a regenerator --
    /// resets the signal outright.
    pub fn propagate(&self, signal: &mut Signal, ctx: &SimulationContext) -> Result<(), NumericError> {
        if matches!(self, Device::Regenerator) {
            return signal.regenerate(ctx);
        }
        signal.apply_gain(&self.gain(ctx))?;
        signal.add_noise(self.noise_power(ctx)?)?;
        if let Some(tf) = self.transfer_function() {
            signal.apply_transfer_function(&tf, ctx);
        }
        Ok(())
    }
}

/// Build the fixed-order device chain for a link of the given total length,
/// split into spans of `span_length_km` each: booster, then
/// `(fibre + inline amplifier)` repeated per span, then a pre-amplifier
/// (spec §4.1: "booster -> (fibre + inline amp) x k -> pre-amp").
///
/// Device-chain fibre-length sum equals the link length (the invariant
/// tracked in §3's `Link` row): spans are equal-length except a shorter
/// final span absorbing the remainder.
pub fn build_fiber_chain(
    length_km: f64,
    span_length_km: f64,
    booster: AmplifierParams,
    inline_amp: AmplifierParams,
    pre_amp: AmplifierParams,
) -> Vec<Device> {
    let mut devices = vec![Device::Booster(booster)];
    if length_km <= 0.0 || span_length_km <= 0.0 {
        devices.push(Device::PreAmplifier(pre_amp));
        return devices;
    }

    let num_full_spans = (length_km / span_length_km).floor() as u64;
    let remainder = length_km - (num_full_spans as f64) * span_length_km;

    for i in 0..num_full_spans {
        devices.push(Device::Fiber {
            span_length_km,
        });
        // the last full span has no trailing in-line amplifier if no
        // remainder follows; the pre-amp at the link's receive end takes
        // over that role.
        if i + 1 < num_full_spans || remainder > 1e-9 {
            devices.push(Device::InLineAmplifier(inline_amp));
        }
    }
    if remainder > 1e-9 {
        devices.push(Device::Fiber {
            span_length_km: remainder,
        });
    }
    devices.push(Device::PreAmplifier(pre_amp));
    devices
}

/// Sum of the fibre-segment lengths in a device chain, for the
/// "device-chain fibre-length sum = link length" invariant.
pub fn chain_fiber_length_km(devices: &[Device]) -> f64 {
    devices
        .iter()
        .map(|d| match d {
            Device::Fiber { span_length_km } => *span_length_km,
            _ => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amp(gain_db: f64) -> AmplifierParams {
        AmplifierParams {
            gain_db,
            noise_figure_db: 5.0,
        }
    }

    #[test]
    fn chain_fibre_length_matches_link_length() {
        let chain = build_fiber_chain(80.0, 80.0, amp(16.0), amp(20.0), amp(16.0));
        assert!((chain_fiber_length_km(&chain) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn chain_splits_into_equal_spans_with_short_remainder() {
        let chain = build_fiber_chain(170.0, 80.0, amp(16.0), amp(20.0), amp(16.0));
        assert!((chain_fiber_length_km(&chain) - 170.0).abs() < 1e-9);
        let fibers: Vec<f64> = chain
            .iter()
            .filter_map(|d| match d {
                Device::Fiber { span_length_km } => Some(*span_length_km),
                _ => None,
            })
            .collect();
        assert_eq!(fibers, vec![80.0, 80.0, 10.0]);
    }

    #[test]
    fn propagation_order_is_booster_then_fiber_amp_pairs_then_preamp() {
        let chain = build_fiber_chain(80.0, 80.0, amp(16.0), amp(20.0), amp(16.0));
        assert!(matches!(chain.first(), Some(Device::Booster(_))));
        assert!(matches!(chain.last(), Some(Device::PreAmplifier(_))));
    }
}
