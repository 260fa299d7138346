//! Coordinator module
//!
//! Orchestrates trial workers and aggregates their completion reports.
//!
//! # Protocol
//!
//! ```text
//! register_writer/register_reader ... launch_all
//!   └─> { reset_trial -> run_trial(n) -> wait_for_trial -> read counters }*
//!         └─> stop_all
//! ```
//!
//! `run_trial` divides `n` evenly among writers (at least one unit each) and
//! gives readers an unbounded quota. The first writer to report completion
//! freezes the other participants so that reader counts cover exactly the
//! timed window. The elapsed time is captured when the last writer reports.
//!
//! # Measurement Precision
//!
//! A reader may be in the middle of a unit when it is paused. That unit
//! finishes and is counted, so reader totals can include at most one unit
//! per reader performed after the freeze instant.
//!
//! # Liveness
//!
//! A panicking work unit kills its worker thread, which then never reports.
//! `wait_for_trial` notices the dead thread and fails with
//! [`TrialError::WorkerExited`] instead of hanging.

mod error;

pub use error::TrialError;

use crate::util::aligned::AlignedFlag;
use crate::worker::{CompletionSink, Role, Slot, Worker, WorkerControl};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default completion poll interval for `wait_for_trial`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Which participants the first finishing writer freezes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeScope {
    /// Pause every other writer and every reader
    ///
    /// Writers that had not reached quota report partial counts, so the
    /// writer total may be less than `writers * quota`.
    #[default]
    Everyone,
    /// Pause readers only; writers always run their full quota
    ReadersOnly,
}

/// Lifecycle of the most recent trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No trial since launch or the last reset
    Ready,
    /// Trial issued, not every worker has reported
    Running,
    /// Every worker has reported; counters are final
    Complete,
}

/// Coordinator state mutated inside the single critical section
#[derive(Debug)]
struct TrialState {
    /// Generation of the current or last trial; 0 before the first trial
    trial: u64,
    phase: Phase,
    trial_start: Option<Instant>,
    elapsed: Option<Duration>,
    writer_ops: u64,
    reader_ops: u64,
    done_writers: usize,
    done_readers: usize,
    writer_reported: Vec<bool>,
    reader_reported: Vec<bool>,
}

impl TrialState {
    fn new(num_writers: usize, num_readers: usize) -> Self {
        Self {
            trial: 0,
            phase: Phase::Ready,
            trial_start: None,
            elapsed: None,
            writer_ops: 0,
            reader_ops: 0,
            done_writers: 0,
            done_readers: 0,
            writer_reported: vec![false; num_writers],
            reader_reported: vec![false; num_readers],
        }
    }

    fn clear_counters(&mut self) {
        self.elapsed = None;
        self.trial_start = None;
        self.writer_ops = 0;
        self.reader_ops = 0;
        self.done_writers = 0;
        self.done_readers = 0;
        self.writer_reported.fill(false);
        self.reader_reported.fill(false);
    }
}

/// Frozen roster plus trial state, shared with every worker thread
struct Board {
    writers: Vec<Arc<WorkerControl>>,
    readers: Vec<Arc<WorkerControl>>,
    freeze: FreezeScope,
    stopped: AlignedFlag,
    state: Mutex<TrialState>,
}

impl Board {
    fn lock(&self) -> MutexGuard<'_, TrialState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pause everyone except the reporter, per the freeze scope
    fn freeze_others(&self, reporter: Slot, trial: u64) {
        if self.freeze == FreezeScope::Everyone {
            for (index, writer) in self.writers.iter().enumerate() {
                if reporter != (Slot { role: Role::Writer, index }) {
                    writer.pause(trial);
                }
            }
        }
        for (index, reader) in self.readers.iter().enumerate() {
            if reporter != (Slot { role: Role::Reader, index }) {
                reader.pause(trial);
            }
        }
    }

    fn controls(&self) -> impl Iterator<Item = (Slot, &Arc<WorkerControl>)> {
        let writers = self
            .writers
            .iter()
            .enumerate()
            .map(|(index, c)| (Slot { role: Role::Writer, index }, c));
        let readers = self
            .readers
            .iter()
            .enumerate()
            .map(|(index, c)| (Slot { role: Role::Reader, index }, c));
        writers.chain(readers)
    }
}

impl CompletionSink for Board {
    fn report_completion(&self, slot: Slot, trial: u64, completed: u64) {
        let mut state = self.lock();
        if state.phase != Phase::Running || state.trial != trial {
            return;
        }

        let reported = match slot.role {
            Role::Writer => &mut state.writer_reported[slot.index],
            Role::Reader => &mut state.reader_reported[slot.index],
        };
        if *reported {
            return;
        }
        *reported = true;

        match slot.role {
            Role::Writer => {
                if state.done_writers == 0 {
                    self.freeze_others(slot, trial);
                }
                state.writer_ops += completed;
                state.done_writers += 1;
                if state.done_writers == self.writers.len() {
                    state.elapsed = state.trial_start.map(|start| start.elapsed());
                }
            }
            Role::Reader => {
                state.reader_ops += completed;
                state.done_readers += 1;
            }
        }

        if state.done_writers == self.writers.len() && state.done_readers == self.readers.len() {
            state.phase = Phase::Complete;
            debug!(
                trial,
                writes = state.writer_ops,
                reads = state.reader_ops,
                elapsed = ?state.elapsed,
                "trial complete"
            );
        }
    }
}

/// Read-only view of the coordinator counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialSnapshot {
    pub trial: u64,
    pub writer_ops: u64,
    pub reader_ops: u64,
    pub done_writers: usize,
    pub done_readers: usize,
    pub elapsed: Option<Duration>,
}

/// Runs writer and reader workers against a shared structure in timed trials
///
/// Registration requires `&mut self`, so it cannot overlap trial execution.
/// Trial operations take `&self`; a coordinator may be shared by reference
/// with another thread that calls `stop_all`.
pub struct TrialCoordinator {
    freeze: FreezeScope,
    poll_interval: Duration,
    writers: Vec<Worker>,
    readers: Vec<Worker>,
    board: Option<Arc<Board>>,
    handles: Vec<(Slot, JoinHandle<()>)>,
}

impl TrialCoordinator {
    pub fn new() -> Self {
        Self {
            freeze: FreezeScope::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            writers: Vec::new(),
            readers: Vec::new(),
            board: None,
            handles: Vec::new(),
        }
    }

    /// Set which participants the first finishing writer freezes
    pub fn with_freeze_scope(mut self, freeze: FreezeScope) -> Self {
        self.freeze = freeze;
        self
    }

    /// Set the completion poll interval used by `wait_for_trial`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Register a writer; only valid before `launch_all`
    pub fn register_writer(&mut self, worker: Worker) -> Result<usize, TrialError> {
        self.register_as(Role::Writer, worker)
    }

    /// Register a reader; only valid before `launch_all`
    pub fn register_reader(&mut self, worker: Worker) -> Result<usize, TrialError> {
        self.register_as(Role::Reader, worker)
    }

    /// Register a worker under the role it was built with
    pub fn register(&mut self, worker: Worker) -> Result<usize, TrialError> {
        self.register_as(worker.role(), worker)
    }

    fn register_as(&mut self, expected: Role, worker: Worker) -> Result<usize, TrialError> {
        if self.board.is_some() {
            return Err(TrialError::RegistrationClosed(expected));
        }
        if worker.role() != expected {
            return Err(TrialError::RoleMismatch {
                expected,
                actual: worker.role(),
            });
        }
        let set = match expected {
            Role::Writer => &mut self.writers,
            Role::Reader => &mut self.readers,
        };
        set.push(worker);
        Ok(set.len() - 1)
    }

    /// Start every registered worker on its own thread; returns immediately
    ///
    /// Freezes the roster: later registrations fail.
    pub fn launch_all(&mut self) -> Result<(), TrialError> {
        if self.board.is_some() {
            return Err(TrialError::AlreadyLaunched);
        }

        let writers = std::mem::take(&mut self.writers);
        let readers = std::mem::take(&mut self.readers);
        let board = Arc::new(Board {
            writers: writers.iter().map(Worker::control).collect(),
            readers: readers.iter().map(Worker::control).collect(),
            freeze: self.freeze,
            stopped: AlignedFlag::new(false),
            state: Mutex::new(TrialState::new(writers.len(), readers.len())),
        });
        self.board = Some(Arc::clone(&board));

        debug!(
            writers = board.writers.len(),
            readers = board.readers.len(),
            freeze = ?self.freeze,
            "launching workers"
        );

        let roster = writers
            .into_iter()
            .enumerate()
            .map(|(index, w)| (Slot { role: Role::Writer, index }, w))
            .chain(
                readers
                    .into_iter()
                    .enumerate()
                    .map(|(index, w)| (Slot { role: Role::Reader, index }, w)),
            );
        for (slot, worker) in roster {
            let handle = worker.spawn(slot, Arc::clone(&board))?;
            self.handles.push((slot, handle));
        }
        Ok(())
    }

    /// Start a trial of `total_ops` writer units; returns the per-writer quota
    ///
    /// Does not block. Fails if the previous trial is still in flight or was
    /// never reset.
    pub fn run_trial(&self, total_ops: u64) -> Result<u64, TrialError> {
        let board = self.board.as_ref().ok_or(TrialError::NotLaunched)?;
        if board.writers.is_empty() {
            return Err(TrialError::NoWriters);
        }

        let mut state = board.lock();
        if board.stopped.get() {
            return Err(TrialError::Stopped(state.trial));
        }
        match state.phase {
            Phase::Running => return Err(TrialError::TrialInFlight(state.trial)),
            Phase::Complete => return Err(TrialError::ResetRequired(state.trial)),
            Phase::Ready => {}
        }

        let quota = per_writer_quota(total_ops, board.writers.len());
        state.trial += 1;
        let trial = state.trial;
        state.clear_counters();
        state.phase = Phase::Running;
        debug!(trial, total_ops, quota, "starting trial");

        state.trial_start = Some(Instant::now());
        for writer in &board.writers {
            writer.resume(quota, trial);
        }
        for reader in &board.readers {
            reader.resume(u64::MAX, trial);
        }
        Ok(quota)
    }

    /// Block until every worker has reported for the current trial
    pub fn wait_for_trial(&self) -> Result<(), TrialError> {
        self.wait(None)
    }

    /// Like [`wait_for_trial`](Self::wait_for_trial), failing after `timeout`
    pub fn wait_for_trial_timeout(&self, timeout: Duration) -> Result<(), TrialError> {
        self.wait(Some(timeout))
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<(), TrialError> {
        let board = self.board.as_ref().ok_or(TrialError::NotLaunched)?;
        let started = Instant::now();
        loop {
            let trial = {
                let state = board.lock();
                match state.phase {
                    Phase::Ready => return Err(TrialError::NoTrialInFlight),
                    Phase::Complete => return Ok(()),
                    Phase::Running => state.trial,
                }
            };

            if board.stopped.get() {
                return Err(TrialError::Stopped(trial));
            }
            if let Some((slot, _)) = self.handles.iter().find(|(_, h)| h.is_finished()) {
                return Err(TrialError::WorkerExited {
                    role: slot.role,
                    index: slot.index,
                    trial,
                });
            }
            if let Some(timeout) = timeout {
                if started.elapsed() >= timeout {
                    return Err(TrialError::Timeout { trial, timeout });
                }
            }

            thread::sleep(self.poll_interval);
        }
    }

    /// Reset every worker and zero all counters
    ///
    /// Every worker must be paused, which holds once the current trial has
    /// fully reported. Nothing is reset unless all workers are idle.
    /// Resetting before launch is a no-op.
    pub fn reset_trial(&self) -> Result<(), TrialError> {
        let Some(board) = self.board.as_ref() else {
            return Ok(());
        };

        let mut state = board.lock();
        if state.phase == Phase::Running {
            return Err(TrialError::TrialInFlight(state.trial));
        }
        for (slot, control) in board.controls() {
            control.check_idle(slot)?;
        }
        for (slot, control) in board.controls() {
            control.reset(slot)?;
        }
        state.clear_counters();
        state.phase = Phase::Ready;
        Ok(())
    }

    /// Stop every worker; idempotent and valid in any state
    pub fn stop_all(&self) {
        match self.board.as_ref() {
            Some(board) => {
                if !board.stopped.get() {
                    debug!("stopping all workers");
                }
                board.stopped.set();
                for (_, control) in board.controls() {
                    control.stop();
                }
            }
            None => {
                for worker in self.writers.iter().chain(&self.readers) {
                    worker.control().stop();
                }
            }
        }
    }

    /// Atomic view of all counters
    pub fn snapshot(&self) -> TrialSnapshot {
        match self.board.as_ref() {
            Some(board) => {
                let state = board.lock();
                TrialSnapshot {
                    trial: state.trial,
                    writer_ops: state.writer_ops,
                    reader_ops: state.reader_ops,
                    done_writers: state.done_writers,
                    done_readers: state.done_readers,
                    elapsed: state.elapsed,
                }
            }
            None => TrialSnapshot::default(),
        }
    }

    pub fn writer_completion_count(&self) -> u64 {
        self.snapshot().writer_ops
    }

    pub fn reader_completion_count(&self) -> u64 {
        self.snapshot().reader_ops
    }

    /// Wall-clock time from `run_trial` to the last writer report
    pub fn trial_elapsed(&self) -> Option<Duration> {
        self.snapshot().elapsed
    }

    pub fn done_writers(&self) -> usize {
        self.snapshot().done_writers
    }

    pub fn done_readers(&self) -> usize {
        self.snapshot().done_readers
    }

    pub fn num_writers(&self) -> usize {
        match self.board.as_ref() {
            Some(board) => board.writers.len(),
            None => self.writers.len(),
        }
    }

    pub fn num_readers(&self) -> usize {
        match self.board.as_ref() {
            Some(board) => board.readers.len(),
            None => self.readers.len(),
        }
    }

    pub fn is_launched(&self) -> bool {
        self.board.is_some()
    }

    pub fn freeze_scope(&self) -> FreezeScope {
        self.freeze
    }
}

impl Default for TrialCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrialCoordinator {
    fn drop(&mut self) {
        self.stop_all();
        for (_, handle) in self.handles.drain(..) {
            // A panicked worker already reported through wait_for_trial.
            let _ = handle.join();
        }
    }
}

/// Units each writer performs for a trial of `total_ops`
///
/// Never less than one, even for a zero-op request.
pub fn per_writer_quota(total_ops: u64, num_writers: usize) -> u64 {
    if num_writers == 0 {
        return total_ops.max(1);
    }
    (total_ops / num_writers as u64).max(1)
}
