//! Per-trial timing histogram using HdrHistogram
//!
//! Records one value per trial: the trial's nanoseconds per write. Range is
//! 1 ns to 1 hour with 3 significant digits, so quantiles are accurate to
//! within 0.1%.
//!
//! # Example
//!
//! ```
//! use sketchpulse::stats::histogram::TrialHistogram;
//!
//! let mut hist = TrialHistogram::new();
//! hist.record_ns(120.0);
//! hist.record_ns(80.0);
//! hist.record_ns(100.0);
//!
//! assert_eq!(hist.len(), 3);
//! assert_eq!(hist.percentile(50.0), Some(100));
//! ```

use crate::Result;
use hdrhistogram::Histogram;

/// Largest trackable value: one hour in nanoseconds
const MAX_NS: u64 = 3_600_000_000_000;

/// Histogram of per-trial nanoseconds per write
#[derive(Debug, Clone)]
pub struct TrialHistogram {
    histogram: Histogram<u64>,
}

impl TrialHistogram {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_NS, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record one trial's nanoseconds per write
    ///
    /// Rounded to the nearest nanosecond and clamped to the histogram range.
    #[inline]
    pub fn record_ns(&mut self, ns: f64) {
        let value = if ns.is_finite() { ns.round() as u64 } else { MAX_NS };
        let _ = self.histogram.record(value.clamp(1, MAX_NS));
    }

    /// Value at `percentile` (0.0 - 100.0), or None while empty
    pub fn percentile(&self, percentile: f64) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        Some(self.histogram.value_at_percentile(percentile))
    }

    pub fn min(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        Some(self.histogram.min())
    }

    pub fn max(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        Some(self.histogram.max())
    }

    /// Histogram-quantized mean
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.histogram.mean())
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Merge another histogram into this one
    pub fn merge(&mut self, other: &TrialHistogram) -> Result<()> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| anyhow::anyhow!("Failed to merge histograms: {}", e))?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }
}

impl Default for TrialHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_histogram() {
        let hist = TrialHistogram::new();
        assert_eq!(hist.len(), 0);
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
        assert!(hist.min().is_none());
        assert!(hist.mean().is_none());
    }

    #[test]
    fn test_percentile() {
        let mut hist = TrialHistogram::new();
        for i in 1..=100 {
            hist.record_ns(i as f64 * 10.0);
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();

        assert!((495..=505).contains(&p50), "p50 = {}", p50);
        assert!((985..=995).contains(&p99), "p99 = {}", p99);
    }

    #[test]
    fn test_min_max() {
        let mut hist = TrialHistogram::new();
        hist.record_ns(100.0);
        hist.record_ns(500.0);
        hist.record_ns(200.0);

        assert_eq!(hist.min(), Some(100));
        assert_eq!(hist.max(), Some(500));
    }

    #[test]
    fn test_clamping() {
        let mut hist = TrialHistogram::new();
        hist.record_ns(0.2);
        hist.record_ns(-5.0);
        hist.record_ns(f64::INFINITY);

        assert_eq!(hist.len(), 3);
        assert_eq!(hist.min(), Some(1));
        assert!(hist.max().unwrap() >= MAX_NS - MAX_NS / 1000);
    }

    #[test]
    fn test_merge() {
        let mut a = TrialHistogram::new();
        a.record_ns(100.0);
        let mut b = TrialHistogram::new();
        b.record_ns(200.0);

        a.merge(&b).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.max(), Some(200));

        a.reset();
        assert!(a.is_empty());
    }
}
