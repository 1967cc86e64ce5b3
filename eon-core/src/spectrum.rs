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

//! Spectrum assignment policies (spec §4.4). Each policy picks a single
//! contiguous window of free slots out of a per-segment continuity bitmap.

use crate::context::SimulationContext;
use crate::error::ConfigError;

/// A spectrum-assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumAssignment {
    /// Lowest-indexed window that fits.
    FirstFit,
    /// Window whose containing maximal free run is exactly the requested
    /// width; falls back to First-Fit when no such run exists.
    ExactFit,
    /// Uniform choice among all fitting windows.
    RandomFit,
    /// Window whose slots have the highest historical usage.
    MostUsed,
    /// Window whose slots have the lowest historical usage.
    LeastUsed,
}

impl SpectrumAssignment {
    /// Resolve a policy by its configuration nickname.
    pub fn from_nickname(name: &str) -> Result<Self, ConfigError> {
        match name {
            "first-fit" | "FirstFit" => Ok(SpectrumAssignment::FirstFit),
            "exact-fit" | "ExactFit" => Ok(SpectrumAssignment::ExactFit),
            "random-fit" | "RandomFit" => Ok(SpectrumAssignment::RandomFit),
            "most-used" | "MostUsed" => Ok(SpectrumAssignment::MostUsed),
            "least-used" | "LeastUsed" => Ok(SpectrumAssignment::LeastUsed),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }

    /// Select a window of `width` contiguous free slots from `bitmap`
    /// (index = slot index, `true` = free across every link of the
    /// segment), using `usage` (per-slot historical reservation counts,
    /// same indexing) for the usage-based policies. Returns the window's
    /// starting index, or `None` if no window of that width exists.
    pub fn select(
        &self,
        bitmap: &[bool],
        width: u32,
        usage: &[u64],
        ctx: &mut SimulationContext,
    ) -> Option<u32> {
        match self {
            SpectrumAssignment::FirstFit => first_fit(bitmap, width),
            SpectrumAssignment::ExactFit => exact_fit(bitmap, width),
            SpectrumAssignment::RandomFit => random_fit(bitmap, width, ctx),
            SpectrumAssignment::MostUsed => usage_extremal(bitmap, width, usage, true),
            SpectrumAssignment::LeastUsed => usage_extremal(bitmap, width, usage, false),
        }
    }
}

/// All starting indices of a width-`width` window that is entirely free.
fn all_windows(bitmap: &[bool], width: u32) -> Vec<u32> {
    let width = width as usize;
    if width == 0 || width > bitmap.len() {
        return Vec::new();
    }
    (0..=bitmap.len() - width)
        .filter(|&start| bitmap[start..start + width].iter().all(|&free| free))
        .map(|start| start as u32)
        .collect()
}

/// The maximal free runs in `bitmap`, as `(start, length)` pairs.
fn maximal_runs(bitmap: &[bool]) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &free) in bitmap.iter().enumerate() {
        match (free, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                runs.push((s as u32, (i - s) as u32));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        runs.push((s as u32, (bitmap.len() - s) as u32));
    }
    runs
}

fn first_fit(bitmap: &[bool], width: u32) -> Option<u32> {
    all_windows(bitmap, width).into_iter().next()
}

fn exact_fit(bitmap: &[bool], width: u32) -> Option<u32> {
    maximal_runs(bitmap)
        .into_iter()
        .find(|&(_, len)| len == width)
        .map(|(start, _)| start)
        .or_else(|| first_fit(bitmap, width))
}

fn random_fit(bitmap: &[bool], width: u32, ctx: &mut SimulationContext) -> Option<u32> {
    let windows = all_windows(bitmap, width);
    if windows.is_empty() {
        return None;
    }
    let pick = (ctx.sample_uniform() * windows.len() as f64).floor() as usize;
    Some(windows[pick.min(windows.len() - 1)])
}

fn usage_extremal(bitmap: &[bool], width: u32, usage: &[u64], most: bool) -> Option<u32> {
    all_windows(bitmap, width)
        .into_iter()
        .map(|start| {
            let sum: u64 = usage[start as usize..(start + width) as usize].iter().sum();
            (start, sum)
        })
        .min_by(|a, b| {
            let (sa, sb) = if most { (b.1, a.1) } else { (a.1, b.1) };
            sa.cmp(&sb).then(a.0.cmp(&b.0))
        })
        .map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_from(free_ranges: &[(u32, u32)], len: u32) -> Vec<bool> {
        let mut bm = vec![false; len as usize];
        for &(s, e) in free_ranges {
            for i in s..=e {
                bm[i as usize] = true;
            }
        }
        bm
    }

    #[test]
    fn first_fit_returns_lowest_window() {
        let bm = bitmap_from(&[(0, 4), (8, 12)], 13);
        assert_eq!(first_fit(&bm, 5), Some(0));
    }

    #[test]
    fn exact_fit_matches_exact_run_then_falls_back() {
        let bm = bitmap_from(&[(0, 4), (8, 12)], 13);
        // both runs are exactly width 5: exact-fit should pick the first one found.
        assert_eq!(exact_fit(&bm, 5), Some(0));

        // no run of exactly width 3 -> falls back to first-fit.
        assert_eq!(exact_fit(&bm, 3), first_fit(&bm, 3));
    }

    #[test]
    fn random_fit_only_offers_maximal_windows_in_disjoint_equal_runs() {
        let bm = bitmap_from(&[(0, 4), (8, 12)], 13);
        let mut ctx = SimulationContext::new(42);
        let windows = all_windows(&bm, 5);
        assert_eq!(windows, vec![0, 8]);
        for _ in 0..20 {
            let choice = random_fit(&bm, 5, &mut ctx).unwrap();
            assert!(choice == 0 || choice == 8);
        }
    }

    #[test]
    fn unknown_nickname_is_config_error() {
        assert!(SpectrumAssignment::from_nickname("bogus").is_err());
    }
}
