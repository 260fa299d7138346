//! Single-thread update baseline
//!
//! Times `u` inserts into a fresh estimator on the calling thread. Values keep
//! counting across trials, so every insert of the sweep is distinct.

use super::SpeedProfile;
use crate::distribution::{ValueMode, ValueSource};
use crate::sketch::Estimator;
use crate::stats::TrialSample;
use crate::Result;
use std::hint::black_box;
use std::time::Instant;

pub struct UpdateSpeedProfile {
    values: Box<dyn ValueSource>,
}

impl UpdateSpeedProfile {
    pub fn new(values: ValueMode, seed: u64) -> Self {
        Self {
            values: values.for_writer(0, 1, seed),
        }
    }
}

impl SpeedProfile for UpdateSpeedProfile {
    fn name(&self) -> &str {
        "update"
    }

    fn do_trial(&mut self, updates: u64) -> Result<TrialSample> {
        let mut estimator = Estimator::new();
        let start = Instant::now();
        for _ in 0..updates {
            estimator.insert(&self.values.next_value());
        }
        let elapsed = start.elapsed();
        black_box(estimator.estimate());
        Ok(TrialSample::new(elapsed, updates, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_trial() {
        let mut profile = UpdateSpeedProfile::new(ValueMode::Sequential, 0);
        let sample = profile.do_trial(1000).unwrap();

        assert_eq!(sample.writes, 1000);
        assert_eq!(sample.reads, 0);
        assert!(sample.ns_per_write() >= 0.0);
    }

    #[test]
    fn test_zero_update_trial() {
        let mut profile = UpdateSpeedProfile::new(ValueMode::Uniform, 3);
        let sample = profile.do_trial(0).unwrap();
        assert_eq!(sample.writes, 0);
        assert_eq!(sample.ns_per_write(), 0.0);
    }
}
