//! Log-scale trial plan
//!
//! The x-axis of a speed profile is the number of updates per trial, spaced
//! evenly in log2 with `u_ppo` points per octave. Small axis points are
//! repeated many times to average out timer noise; large ones only a few
//! times. Between `2^lg_min_bpu` and `2^lg_max_bpu` updates the trial count
//! falls linearly in log space from `2^lg_max_t` to `2^lg_min_t`.
//!
//! ```text
//! lg(trials)
//!  lg_max_t ─────┐
//!                 ╲
//!                  ╲
//!  lg_min_t         └──────────
//!           lg_min_bpu  lg_max_bpu   lg(updates)
//! ```

use serde::{Deserialize, Serialize};

/// Next integer of the series `round(2^(i / ppo))` after `cur`
///
/// Always strictly greater than `cur`. Rounding collisions at the low end of
/// the series are skipped, so `ppo = 4` from 1 yields `2 3 4 5 6 ...`.
/// Returns `None` once the next point no longer fits in a `u64`.
pub fn pwr2_series_next(ppo: u32, cur: u64) -> Option<u64> {
    const LIMIT: f64 = 18_446_744_073_709_551_616.0; // 2^64
    let ppo = ppo.max(1) as f64;
    let cur = cur.max(1);
    let mut gi = ((cur as f64).log2() * ppo).round() as i64;
    loop {
        gi += 1;
        let next = (2f64).powf(gi as f64 / ppo).round();
        if next >= LIMIT {
            return None;
        }
        let next = next as u64;
        if next > cur {
            return Some(next);
        }
    }
}

/// Sweep parameters, all exponents of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialPlan {
    pub lg_min_t: u32,
    pub lg_max_t: u32,
    pub lg_min_u: u32,
    pub lg_max_u: u32,
    pub u_ppo: u32,
    pub lg_min_bpu: u32,
    pub lg_max_bpu: u32,
}

impl Default for TrialPlan {
    fn default() -> Self {
        Self {
            lg_min_t: 0,
            lg_max_t: 4,
            lg_min_u: 0,
            lg_max_u: 16,
            u_ppo: 4,
            lg_min_bpu: 4,
            lg_max_bpu: 16,
        }
    }
}

impl TrialPlan {
    /// Axis points from `2^lg_min_u`, continuing while the previous point is
    /// below `2^lg_max_u`
    pub fn axis_points(&self) -> AxisPoints {
        AxisPoints {
            ppo: self.u_ppo,
            min_u: 1u64 << self.lg_min_u,
            max_u: 1u64 << self.lg_max_u,
            last: 0,
        }
    }

    /// Number of trials to run at `updates` per trial
    pub fn num_trials(&self, updates: u64) -> u64 {
        let min_bpu = 1u64 << self.lg_min_bpu;
        let max_bpu = 1u64 << self.lg_max_bpu;
        let max_t = 1u64 << self.lg_max_t;
        let min_t = 1u64 << self.lg_min_t;
        if self.lg_min_t == self.lg_max_t || updates <= min_bpu {
            return max_t;
        }
        if updates >= max_bpu {
            return min_t;
        }
        let lg_updates = (updates as f64).log2();
        let lg_trials = self.slope() * (lg_updates - self.lg_min_bpu as f64) + self.lg_max_t as f64;
        (2f64).powf(lg_trials) as u64
    }

    /// Change in lg(trials) per unit of lg(updates) on the sloped segment
    fn slope(&self) -> f64 {
        (self.lg_max_t as f64 - self.lg_min_t as f64)
            / (self.lg_min_bpu as f64 - self.lg_max_bpu as f64)
    }

    /// Total trials and updates the sweep will perform
    pub fn totals(&self) -> (u64, u64) {
        self.axis_points().fold((0, 0), |(trials, updates), u| {
            let t = self.num_trials(u);
            (trials + t, updates + t * u)
        })
    }
}

/// Iterator over the axis points of a [`TrialPlan`]
#[derive(Debug, Clone)]
pub struct AxisPoints {
    ppo: u32,
    min_u: u64,
    max_u: u64,
    last: u64,
}

impl Iterator for AxisPoints {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.last >= self.max_u {
            return None;
        }
        let next = if self.last == 0 {
            self.min_u
        } else {
            match pwr2_series_next(self.ppo, self.last) {
                Some(next) => next,
                None => {
                    self.last = self.max_u;
                    return None;
                }
            }
        };
        self.last = next;
        Some(next)
    }
}
