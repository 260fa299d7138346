//! Multithreaded speed profile
//!
//! Writers and readers run on their own threads against one
//! [`SharedEstimator`], coordinated trial by trial:
//!
//! ```text
//! sketch.reset -> reset_trial -> run_trial(u) -> wait_for_trial -> snapshot
//! ```
//!
//! Reported time is wall-clock from trial start to the last writer report,
//! divided by the writer units completed.

use super::SpeedProfile;
use crate::coordinator::{FreezeScope, TrialCoordinator, DEFAULT_POLL_INTERVAL};
use crate::distribution::ValueMode;
use crate::sketch::{reader_unit, writer_unit, SharedEstimator, SketchMode};
use crate::stats::TrialSample;
use crate::worker::{Role, Worker};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything needed to build the worker roster
#[derive(Debug, Clone, PartialEq)]
pub struct MultithreadedSettings {
    pub writers: usize,
    pub readers: usize,
    /// Fraction of writer units that are writes; 0 means pure writers
    pub writes_ratio: f64,
    pub mode: SketchMode,
    /// Sleep before each reader query
    pub reader_interval: Option<Duration>,
    pub values: ValueMode,
    pub seed: u64,
    pub freeze: FreezeScope,
    pub poll_interval: Duration,
    pub trial_timeout: Option<Duration>,
}

impl Default for MultithreadedSettings {
    fn default() -> Self {
        Self {
            writers: 1,
            readers: 0,
            writes_ratio: 0.0,
            mode: SketchMode::Locked,
            reader_interval: None,
            values: ValueMode::Sequential,
            seed: 0,
            freeze: FreezeScope::Everyone,
            poll_interval: DEFAULT_POLL_INTERVAL,
            trial_timeout: None,
        }
    }
}

/// Coordinated writer/reader profile
pub struct MultithreadedSpeedProfile {
    sketch: Arc<SharedEstimator>,
    coordinator: TrialCoordinator,
    trial_timeout: Option<Duration>,
}

impl MultithreadedSpeedProfile {
    /// Register every worker and launch their threads
    pub fn new(settings: &MultithreadedSettings) -> Result<Self> {
        let sketch = Arc::new(SharedEstimator::new());
        let mut coordinator = TrialCoordinator::new()
            .with_freeze_scope(settings.freeze)
            .with_poll_interval(settings.poll_interval);

        for index in 0..settings.writers {
            let values = settings.values.for_writer(index, settings.writers, settings.seed);
            let unit = writer_unit(&sketch, settings.mode, values, settings.writes_ratio);
            coordinator.register_writer(Worker::from_boxed(Role::Writer, unit))?;
        }
        for _ in 0..settings.readers {
            let unit = reader_unit(&sketch, settings.reader_interval);
            coordinator.register_reader(Worker::from_boxed(Role::Reader, unit))?;
        }
        coordinator.launch_all().context("Failed to launch workers")?;

        debug!(
            writers = settings.writers,
            readers = settings.readers,
            mode = %settings.mode,
            "multithreaded profile ready"
        );

        Ok(Self {
            sketch,
            coordinator,
            trial_timeout: settings.trial_timeout,
        })
    }

    pub fn coordinator(&self) -> &TrialCoordinator {
        &self.coordinator
    }

    pub fn sketch(&self) -> &SharedEstimator {
        &self.sketch
    }
}

impl SpeedProfile for MultithreadedSpeedProfile {
    fn name(&self) -> &str {
        "multithreaded"
    }

    fn do_trial(&mut self, updates: u64) -> Result<TrialSample> {
        self.sketch.reset();
        self.coordinator.reset_trial()?;
        self.coordinator.run_trial(updates)?;
        match self.trial_timeout {
            Some(timeout) => self.coordinator.wait_for_trial_timeout(timeout)?,
            None => self.coordinator.wait_for_trial()?,
        }

        let snapshot = self.coordinator.snapshot();
        Ok(TrialSample::new(
            snapshot.elapsed.unwrap_or_default(),
            snapshot.writer_ops,
            snapshot.reader_ops,
        ))
    }

    fn cleanup(&mut self) {
        self.sketch.reset();
        self.coordinator.stop_all();
    }
}
