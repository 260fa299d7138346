//! Writer and reader work units for the shared estimator

use super::{Estimator, SharedEstimator, SketchMode};
use crate::distribution::ValueSource;
use crate::worker::WorkUnit;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Tracks the last reset epoch a unit has seen
#[derive(Debug)]
struct EpochWatch {
    seen: u64,
}

impl EpochWatch {
    fn new(sketch: &SharedEstimator) -> Self {
        Self { seen: sketch.epoch() }
    }

    /// True exactly once per reset
    #[inline]
    fn changed(&mut self, sketch: &SharedEstimator) -> bool {
        let epoch = sketch.epoch();
        if epoch != self.seen {
            self.seen = epoch;
            true
        } else {
            false
        }
    }
}

/// Inserts straight into the shared estimator
pub struct LockedWriter {
    sketch: Arc<SharedEstimator>,
    values: Box<dyn ValueSource>,
    epoch: EpochWatch,
}

impl LockedWriter {
    pub fn new(sketch: Arc<SharedEstimator>, values: Box<dyn ValueSource>) -> Self {
        let epoch = EpochWatch::new(&sketch);
        Self { sketch, values, epoch }
    }
}

impl WorkUnit for LockedWriter {
    #[inline]
    fn work(&mut self) {
        if self.epoch.changed(&self.sketch) {
            self.values.rewind();
        }
        self.sketch.insert(self.values.next_value());
    }
}

/// Inserts into a local estimator, merging it into the shared one periodically
///
/// Inserts since the last flush are not visible to readers. They are dropped
/// at the next reset.
pub struct BufferedWriter {
    sketch: Arc<SharedEstimator>,
    values: Box<dyn ValueSource>,
    local: Estimator,
    buffered: u64,
    flush_every: u64,
    epoch: EpochWatch,
}

impl BufferedWriter {
    pub fn new(
        sketch: Arc<SharedEstimator>,
        values: Box<dyn ValueSource>,
        flush_every: u64,
    ) -> Self {
        let epoch = EpochWatch::new(&sketch);
        Self {
            sketch,
            values,
            local: Estimator::new(),
            buffered: 0,
            flush_every: flush_every.max(1),
            epoch,
        }
    }

    fn flush(&mut self) {
        self.sketch.merge_from(&self.local);
        self.local = Estimator::new();
        self.buffered = 0;
    }
}

impl WorkUnit for BufferedWriter {
    #[inline]
    fn work(&mut self) {
        if self.epoch.changed(&self.sketch) {
            self.values.rewind();
            self.local = Estimator::new();
            self.buffered = 0;
        }
        self.local.insert(&self.values.next_value());
        self.buffered += 1;
        if self.buffered >= self.flush_every {
            self.flush();
        }
    }
}

/// Writer that interleaves estimate reads to hold a target write fraction
///
/// Each unit is a write when the writes done so far are below `writes_ratio`
/// of all units done, otherwise a read. Both count toward the worker quota.
pub struct MixedWriter<W: WorkUnit> {
    inner: W,
    sketch: Arc<SharedEstimator>,
    writes_ratio: f64,
    writes: u64,
    reads: u64,
    epoch: EpochWatch,
}

impl<W: WorkUnit> MixedWriter<W> {
    pub fn new(inner: W, sketch: Arc<SharedEstimator>, writes_ratio: f64) -> Self {
        let epoch = EpochWatch::new(&sketch);
        Self {
            inner,
            sketch,
            writes_ratio,
            writes: 0,
            reads: 0,
            epoch,
        }
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl<W: WorkUnit> WorkUnit for MixedWriter<W> {
    #[inline]
    fn work(&mut self) {
        if self.epoch.changed(&self.sketch) {
            self.writes = 0;
            self.reads = 0;
        }
        let total = (self.writes + self.reads) as f64;
        if (self.writes as f64) < self.writes_ratio * total {
            self.inner.work();
            self.writes += 1;
        } else {
            black_box(self.sketch.estimate());
            self.reads += 1;
        }
    }
}

/// Queries the shared estimate, optionally sleeping before each query
pub struct EstimateReader {
    sketch: Arc<SharedEstimator>,
    interval: Option<Duration>,
}

impl EstimateReader {
    pub fn new(sketch: Arc<SharedEstimator>, interval: Option<Duration>) -> Self {
        Self { sketch, interval }
    }
}

impl WorkUnit for EstimateReader {
    #[inline]
    fn work(&mut self) {
        if let Some(interval) = self.interval {
            thread::sleep(interval);
        }
        black_box(self.sketch.estimate());
    }
}

/// Build the writer unit for `mode`
///
/// A `writes_ratio` strictly between 0 and 1 wraps the writer in a
/// [`MixedWriter`]; any other value yields a pure writer.
pub fn writer_unit(
    sketch: &Arc<SharedEstimator>,
    mode: SketchMode,
    values: Box<dyn ValueSource>,
    writes_ratio: f64,
) -> Box<dyn WorkUnit> {
    let mixed = writes_ratio > 0.0 && writes_ratio < 1.0;
    match mode {
        SketchMode::Locked => {
            let writer = LockedWriter::new(Arc::clone(sketch), values);
            if mixed {
                Box::new(MixedWriter::new(writer, Arc::clone(sketch), writes_ratio))
            } else {
                Box::new(writer)
            }
        }
        SketchMode::Buffered { flush_every } => {
            let writer = BufferedWriter::new(Arc::clone(sketch), values, flush_every);
            if mixed {
                Box::new(MixedWriter::new(writer, Arc::clone(sketch), writes_ratio))
            } else {
                Box::new(writer)
            }
        }
    }
}

/// Build a reader unit
pub fn reader_unit(sketch: &Arc<SharedEstimator>, interval: Option<Duration>) -> Box<dyn WorkUnit> {
    Box::new(EstimateReader::new(Arc::clone(sketch), interval))
}
