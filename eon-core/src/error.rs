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

//! Error taxonomy for the simulator core.
//!
//! [`BlockCause`] covers the four RMSA failure modes that are recorded as
//! call-blocking statistics and never abort the run. [`NumericError`] and
//! the fatal variants of [`RmsaError`]/[`ConfigError`] indicate model misuse
//! or a broken invariant and must propagate out of the event loop.

use thiserror::Error;

use crate::topology::{LinkId, NodeId};

/// Why a call failed admission. Recorded as a statistic, never fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCause {
    /// No path exists from source to destination.
    #[error("no route from {0:?} to {1:?}")]
    NoRoute(NodeId, NodeId),
    /// No contiguous/continuous free spectrum window satisfies the request.
    #[error("no spectrum window of the required width is free along the route")]
    NoSpectrum,
    /// The best available modulation scheme still falls below its OSNR threshold.
    #[error("no modulation scheme meets the OSNR threshold on some segment")]
    OsnrFailure,
    /// Translucent partitioning is infeasible given free regenerators.
    #[error("no regenerator placement makes the path feasible")]
    NoRegenerator,
}

/// Fatal numeric violations: NaN/Inf in a dB quantity, negative power, or
/// slot/regenerator accounting drift. These indicate model misuse and must
/// not be caught by the event loop (spec: "assertion-violations in
/// invariants ... are fatal and must not be catchable").
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    /// A gain or power computation produced NaN or infinity.
    #[error("non-finite value in {context}: {value}")]
    NonFinite {
        /// Where the bad value was produced, for diagnostics.
        context: &'static str,
        /// The offending value.
        value: f64,
    },
    /// A power or gain value that must be non-negative was negative.
    #[error("negative {context}: {value}")]
    Negative {
        /// Which quantity went negative.
        context: &'static str,
        /// The offending value.
        value: f64,
    },
    /// A link's free-slot accounting no longer sums to `N_slots`.
    #[error("slot count drift on {link:?}: free {free} + held {held} != total {total}")]
    SlotCountDrift {
        /// The link whose invariant broke.
        link: LinkId,
        /// Free slots observed.
        free: u32,
        /// Slots held by active calls observed.
        held: u32,
        /// Configured total.
        total: u32,
    },
    /// A node's regenerator usage exceeded its installed count.
    #[error("regenerator overflow on {node:?}: used {used} > total {total}")]
    RegeneratorOverflow {
        /// The node whose invariant broke.
        node: NodeId,
        /// Regenerators currently in use.
        used: u32,
        /// Regenerators installed.
        total: u32,
    },
}

/// Errors surfaced by the RMSA pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RmsaError {
    /// Recorded call-blocking cause; does not terminate the simulation.
    #[error(transparent)]
    Blocked(#[from] BlockCause),
    /// A fatal numeric or invariant violation.
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

impl RmsaError {
    /// The block cause, if this error is a recorded blocking outcome rather
    /// than a fatal numeric error.
    pub fn block_cause(&self) -> Option<BlockCause> {
        match self {
            RmsaError::Blocked(c) => Some(*c),
            RmsaError::Numeric(_) => None,
        }
    }
}

/// Configuration errors, surfaced outside the core (CLI/config-loader
/// collaborators translate these into process exit codes).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An algorithm nickname did not match any registered implementation.
    #[error("unrecognised algorithm nickname: {0:?}")]
    UnknownAlgorithm(String),
    /// A required configuration field was missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// A field held a value outside its valid domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field name.
        field: &'static str,
        /// Why the value is invalid.
        reason: String,
    },
    /// The topology itself is malformed (e.g. dangling endpoint, zero-length span).
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}
