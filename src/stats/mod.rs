//! Trial statistics
//!
//! A profile produces one [`TrialSample`] per trial. The samples of one axis
//! point are folded into a [`PointStats`] row:
//!
//! - **Exact mean**: arithmetic mean of per-trial ns/write, computed from the
//!   raw samples
//! - **Quantiles**: median, min, and max from a [`TrialHistogram`]
//! - **Throughput context**: mean writes, reads and elapsed time per trial
//!
//! # Example
//!
//! ```
//! use sketchpulse::stats::{PointStats, TrialSample};
//! use std::time::Duration;
//!
//! let samples = [
//!     TrialSample::new(Duration::from_nanos(1_000), 100, 0),
//!     TrialSample::new(Duration::from_nanos(3_000), 100, 0),
//! ];
//! let stats = PointStats::from_samples(100, &samples);
//! assert_eq!(stats.trials, 2);
//! assert_eq!(stats.mean_ns_per_write, 20.0);
//! ```

pub mod histogram;

use crate::util::time::nanos_per_op;
use histogram::TrialHistogram;
use serde::Serialize;
use std::time::Duration;

/// Result of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrialSample {
    /// Time from trial start to the last writer report
    pub elapsed: Duration,
    /// Units completed by writers
    pub writes: u64,
    /// Units completed by readers
    pub reads: u64,
}

impl TrialSample {
    pub fn new(elapsed: Duration, writes: u64, reads: u64) -> Self {
        Self { elapsed, writes, reads }
    }

    /// Nanoseconds per write; 0 when nothing was written
    pub fn ns_per_write(&self) -> f64 {
        nanos_per_op(self.elapsed, self.writes)
    }
}

/// Aggregated statistics for one axis point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointStats {
    /// Writer units requested per trial
    pub updates: u64,
    pub trials: u64,
    pub mean_ns_per_write: f64,
    pub p50_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_writes: f64,
    pub mean_reads: f64,
    pub mean_elapsed_ns: f64,
}

impl PointStats {
    /// Fold the samples of one axis point
    pub fn from_samples(updates: u64, samples: &[TrialSample]) -> Self {
        let mut hist = TrialHistogram::new();
        let mut sum_ns_per_write = 0.0;
        let mut sum_writes = 0u128;
        let mut sum_reads = 0u128;
        let mut sum_elapsed = 0u128;

        for sample in samples {
            let ns = sample.ns_per_write();
            hist.record_ns(ns);
            sum_ns_per_write += ns;
            sum_writes += sample.writes as u128;
            sum_reads += sample.reads as u128;
            sum_elapsed += sample.elapsed.as_nanos();
        }

        let n = samples.len();
        let mean = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };

        Self {
            updates,
            trials: n as u64,
            mean_ns_per_write: mean(sum_ns_per_write),
            p50_ns: hist.percentile(50.0).unwrap_or(0),
            min_ns: hist.min().unwrap_or(0),
            max_ns: hist.max().unwrap_or(0),
            mean_writes: mean(sum_writes as f64),
            mean_reads: mean(sum_reads as f64),
            mean_elapsed_ns: mean(sum_elapsed as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ns: u64, writes: u64, reads: u64) -> TrialSample {
        TrialSample::new(Duration::from_nanos(ns), writes, reads)
    }

    #[test]
    fn test_ns_per_write() {
        assert_eq!(sample(1_000, 10, 0).ns_per_write(), 100.0);
        assert_eq!(sample(1_000, 0, 5).ns_per_write(), 0.0);
    }

    #[test]
    fn test_point_stats_exact_mean() {
        // 10.0, 15.5 and 20.0 ns/write; histogram would round 15.5
        let samples = [sample(1_000, 100, 4), sample(1_550, 100, 6), sample(2_000, 100, 8)];
        let stats = PointStats::from_samples(100, &samples);

        assert_eq!(stats.trials, 3);
        assert!((stats.mean_ns_per_write - 15.166_666).abs() < 1e-3);
        assert_eq!(stats.min_ns, 10);
        assert_eq!(stats.max_ns, 20);
        assert_eq!(stats.p50_ns, 16);
        assert_eq!(stats.mean_writes, 100.0);
        assert_eq!(stats.mean_reads, 6.0);
        assert!((stats.mean_elapsed_ns - 1_516.666).abs() < 1e-2);
    }

    #[test]
    fn test_point_stats_empty() {
        let stats = PointStats::from_samples(8, &[]);
        assert_eq!(stats.updates, 8);
        assert_eq!(stats.trials, 0);
        assert_eq!(stats.mean_ns_per_write, 0.0);
        assert_eq!(stats.p50_ns, 0);
    }

    #[test]
    fn test_point_stats_serializes() {
        let stats = PointStats::from_samples(4, &[sample(400, 4, 0)]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["updates"], 4);
        assert_eq!(json["mean_ns_per_write"], 100.0);
    }
}
