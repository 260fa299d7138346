//! Speed profiles
//!
//! A profile measures one configuration of the structure under test across a
//! [`TrialPlan`] sweep. The driver, [`run_profile`], walks the axis points,
//! runs `num_trials(u)` trials at each, folds them into [`PointStats`], and
//! hands every row to a [`PointSink`] as soon as it is complete.
//!
//! # Profiles
//!
//! - **multithreaded**: writer and reader workers against a shared estimator,
//!   driven by the trial coordinator
//! - **update**: single-thread insert baseline with no coordination at all

pub mod multithreaded;
pub mod plan;
pub mod update;

pub use multithreaded::{MultithreadedSettings, MultithreadedSpeedProfile};
pub use plan::{pwr2_series_next, TrialPlan};
pub use update::UpdateSpeedProfile;

use crate::stats::{PointStats, TrialSample};
use crate::util::time::{calculate_rate, format_rate};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// A measurable configuration of the structure under test
pub trait SpeedProfile {
    /// Short identifier used in reports
    fn name(&self) -> &str;

    /// Run one trial of `updates` writer units
    fn do_trial(&mut self, updates: u64) -> Result<TrialSample>;

    /// Release resources; called once after the sweep, even if it failed
    fn cleanup(&mut self) {}
}

/// Receives aggregated rows while a sweep is running
pub trait PointSink {
    fn record_point(&mut self, point: &PointStats) -> Result<()>;
}

impl<F> PointSink for F
where
    F: FnMut(&PointStats) -> Result<()>,
{
    fn record_point(&mut self, point: &PointStats) -> Result<()> {
        self(point)
    }
}

/// Which profile a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Multithreaded,
    Update,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Multithreaded => write!(f, "multithreaded"),
            ProfileKind::Update => write!(f, "update"),
        }
    }
}

impl FromStr for ProfileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Legacy job files give a dotted profile class name
        let name = s.rsplit('.').next().unwrap_or(s).to_lowercase();
        let name = name.strip_suffix("speedprofile").unwrap_or(&name);
        if name.ends_with("multithreaded") {
            Ok(ProfileKind::Multithreaded)
        } else if name.ends_with("update") {
            Ok(ProfileKind::Update)
        } else {
            anyhow::bail!("unknown profile '{}' (expected multithreaded or update)", s)
        }
    }
}

/// Run the full sweep of `plan` against `profile`
///
/// Returns every row. `cleanup` runs whether or not a trial failed.
pub fn run_profile(
    profile: &mut dyn SpeedProfile,
    plan: &TrialPlan,
    sink: &mut dyn PointSink,
) -> Result<Vec<PointStats>> {
    let result = sweep(profile, plan, sink);
    profile.cleanup();
    result
}

fn sweep(
    profile: &mut dyn SpeedProfile,
    plan: &TrialPlan,
    sink: &mut dyn PointSink,
) -> Result<Vec<PointStats>> {
    let (total_trials, total_updates) = plan.totals();
    info!(
        profile = profile.name(),
        total_trials, total_updates, "starting sweep"
    );

    let mut points = Vec::new();
    let mut samples = Vec::new();
    for updates in plan.axis_points() {
        let trials = plan.num_trials(updates);
        samples.clear();
        for t in 0..trials {
            let sample = profile
                .do_trial(updates)
                .with_context(|| format!("trial {} of {} at {} updates", t + 1, trials, updates))?;
            samples.push(sample);
        }

        let point = PointStats::from_samples(updates, &samples);
        let writes: u64 = samples.iter().map(|s| s.writes).sum();
        let elapsed: Duration = samples.iter().map(|s| s.elapsed).sum();
        debug!(
            updates,
            trials,
            ns_per_write = point.mean_ns_per_write,
            writes_per_sec = %format_rate(calculate_rate(writes, elapsed)),
            "axis point done"
        );
        sink.record_point(&point)?;
        points.push(point);
    }
    Ok(points)
}
