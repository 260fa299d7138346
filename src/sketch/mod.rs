//! Structure under test
//!
//! A HyperLogLog cardinality estimator shared by every worker of a
//! multithreaded profile. Writers feed it values; readers query its estimate.
//!
//! # Modes
//!
//! - **Locked**: every insert takes the write lock on the shared estimator.
//! - **Buffered**: each writer inserts into a thread-local estimator and merges
//!   it into the shared one every `flush_every` inserts. Readers see updates
//!   with a delay of at most `flush_every` inserts per writer.
//!
//! # Reset Epoch
//!
//! [`SharedEstimator::reset`] bumps an epoch counter. Writers compare it with
//! the epoch they last saw before every unit; on a change they rewind their
//! value stream and drop local state, so every trial replays identical input.

pub mod units;

pub use units::{
    reader_unit, writer_unit, BufferedWriter, EstimateReader, LockedWriter, MixedWriter,
};

use crate::util::aligned::AlignedU64;
use cardinality_estimator::CardinalityEstimator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

/// Estimator type used throughout the crate (default precision and hasher)
pub type Estimator = CardinalityEstimator<u64>;

/// How writers reach the shared estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SketchMode {
    Locked,
    Buffered { flush_every: u64 },
}

impl SketchMode {
    pub fn kind(&self) -> SketchKind {
        match self {
            SketchMode::Locked => SketchKind::Locked,
            SketchMode::Buffered { .. } => SketchKind::Buffered,
        }
    }
}

impl fmt::Display for SketchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchMode::Locked => write!(f, "locked"),
            SketchMode::Buffered { flush_every } => {
                write!(f, "buffered(flush_every={})", flush_every)
            }
        }
    }
}

/// Mode name as it appears in job files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SketchKind {
    #[default]
    Locked,
    Buffered,
}

impl SketchKind {
    /// Combine with the buffer flush interval
    pub fn with_flush_every(self, flush_every: u64) -> SketchMode {
        match self {
            SketchKind::Locked => SketchMode::Locked,
            SketchKind::Buffered => SketchMode::Buffered { flush_every },
        }
    }
}

impl fmt::Display for SketchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchKind::Locked => write!(f, "locked"),
            SketchKind::Buffered => write!(f, "buffered"),
        }
    }
}

impl FromStr for SketchKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "locked" | "lock" => Ok(SketchKind::Locked),
            "buffered" | "concurrent" => Ok(SketchKind::Buffered),
            _ => anyhow::bail!("unknown sketch mode '{}' (expected locked or buffered)", s),
        }
    }
}

/// Cardinality estimator shared between worker threads
pub struct SharedEstimator {
    inner: RwLock<Estimator>,
    epoch: AlignedU64,
}

impl SharedEstimator {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Estimator::new()),
            epoch: AlignedU64::new(0),
        }
    }

    /// Insert one value under the write lock
    #[inline]
    pub fn insert(&self, value: u64) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(&value);
    }

    /// Merge a writer-local estimator under the write lock
    pub fn merge_from(&self, local: &Estimator) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(local);
    }

    /// Current estimate under the read lock
    #[inline]
    pub fn estimate(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .estimate()
    }

    /// Replace the estimator with an empty one and start a new epoch
    pub fn reset(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Estimator::new();
        self.epoch.set(self.epoch.get() + 1);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.get()
    }
}

impl Default for SharedEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEstimator")
            .field("estimate", &self.estimate())
            .field("epoch", &self.epoch())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(estimate: usize, expected: usize) {
        let error = (estimate as f64 - expected as f64).abs() / expected as f64;
        assert!(error < 0.1, "estimate {} too far from {}", estimate, expected);
    }

    #[test]
    fn test_shared_insert_and_estimate() {
        let sketch = SharedEstimator::new();
        assert_eq!(sketch.estimate(), 0);

        for v in 0..1000u64 {
            sketch.insert(v);
        }
        assert_close(sketch.estimate(), 1000);

        for v in 0..1000u64 {
            sketch.insert(v);
        }
        assert_close(sketch.estimate(), 1000);
    }

    #[test]
    fn test_merge_from_local() {
        let sketch = SharedEstimator::new();
        let mut local = Estimator::new();
        for v in 0..500u64 {
            local.insert(&v);
        }
        sketch.merge_from(&local);
        for v in 500..1000u64 {
            sketch.insert(v);
        }
        assert_close(sketch.estimate(), 1000);
    }

    #[test]
    fn test_estimator_counts_u64_items() {
        let edges = [0u64, 1, 1 << 63, u64::MAX];
        let mut local = Estimator::new();
        for v in edges {
            local.insert(&v);
        }
        let mut other = Estimator::new();
        for v in edges.iter().rev() {
            other.insert(v);
        }
        local.merge(&other);
        assert_eq!(local.estimate(), edges.len());
    }

    #[test]
    fn test_reset_clears_and_bumps_epoch() {
        let sketch = SharedEstimator::new();
        sketch.insert(1);
        sketch.insert(2);
        assert_eq!(sketch.epoch(), 0);

        sketch.reset();
        assert_eq!(sketch.estimate(), 0);
        assert_eq!(sketch.epoch(), 1);
        sketch.reset();
        assert_eq!(sketch.epoch(), 2);
    }

    #[test]
    fn test_sketch_kind_parse() {
        assert_eq!("locked".parse::<SketchKind>().unwrap(), SketchKind::Locked);
        assert_eq!("Buffered".parse::<SketchKind>().unwrap(), SketchKind::Buffered);
        assert!("sharded".parse::<SketchKind>().is_err());
        assert_eq!(
            SketchKind::Buffered.with_flush_every(16),
            SketchMode::Buffered { flush_every: 16 }
        );
        assert_eq!(SketchKind::Locked.with_flush_every(16), SketchMode::Locked);
        assert_eq!(SketchMode::Buffered { flush_every: 8 }.kind(), SketchKind::Buffered);
    }
}
