//! Trial worker implementation
//!
//! A [`Worker`] is one controllable unit of concurrent execution. It owns a
//! [`WorkUnit`] (the "do one unit of work" hook) and a lock-free control block
//! through which the coordinator hands out quota, pauses, resets, and stops it.
//!
//! # Lifecycle
//!
//! 1. **Creation**: `Worker::writer()` / `Worker::reader()` fixes the role
//! 2. **Registration**: the coordinator takes ownership before launch
//! 3. **Execution**: one thread per worker runs [`run_loop`] until stopped
//!
//! # Hot Path
//!
//! While a worker has quota left it only touches its own control block: one
//! acquire load of `quota` and one release store of `completed` per unit. No
//! locks are taken until the worker reports completion.
//!
//! # Example
//!
//! ```
//! use sketchpulse::worker::{Role, Worker};
//!
//! let mut ops = 0u64;
//! let worker = Worker::writer(move || ops += 1);
//! assert_eq!(worker.role(), Role::Writer);
//! ```

use crate::coordinator::TrialError;
use crate::util::aligned::{AlignedFlag, AlignedU64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pending-report value meaning "nothing to report"
///
/// Trial generations start at 1, so 0 never names a real trial.
pub(crate) const NO_REPORT: u64 = 0;

/// Worker role, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Mutates the structure under test; drives the end of a trial
    Writer,
    /// Observes the structure under test; runs until frozen
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reader => write!(f, "reader"),
        }
    }
}

/// One unit of benchmark work
///
/// Implementations are moved onto the worker's own thread, so they may hold
/// thread-local state freely. A panic inside `work` terminates the worker
/// thread; the coordinator detects this while waiting for the trial.
pub trait WorkUnit: Send + 'static {
    /// Perform exactly one unit of work
    fn work(&mut self);
}

impl<F> WorkUnit for F
where
    F: FnMut() + Send + 'static,
{
    #[inline]
    fn work(&mut self) {
        self()
    }
}

/// Position of a worker inside the coordinator's roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub role: Role,
    pub index: usize,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.role, self.index)
    }
}

/// Receiver of worker completion reports
///
/// Implemented by the coordinator. Reports may arrive more than once per
/// trial and after the trial they name has ended; receivers must ignore
/// duplicates and stale generations.
pub trait CompletionSink: Send + Sync + 'static {
    fn report_completion(&self, slot: Slot, trial: u64, completed: u64);
}

/// Lock-free control block shared between a worker thread and its coordinator
///
/// Field ownership:
/// - `quota`, `pending`, `stopped`: written by the coordinator, read by the worker
/// - `completed`: written by the worker, zeroed by `reset` while the worker is idle
#[derive(Debug, Default)]
pub struct WorkerControl {
    quota: AlignedU64,
    completed: AlignedU64,
    pending: AlignedU64,
    stopped: AlignedFlag,
}

impl WorkerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize `quota` units for `trial` and arm a completion report
    ///
    /// Takes effect asynchronously. Quota is published before the report is
    /// armed, so a worker that sees the arm also sees the new quota.
    pub(crate) fn resume(&self, quota: u64, trial: u64) {
        self.quota.set(quota);
        self.pending.set(trial);
    }

    /// Freeze the worker at its next unit boundary
    pub(crate) fn pause(&self, trial: u64) {
        self.resume(0, trial);
    }

    /// Terminate the execution loop; one-way
    pub(crate) fn stop(&self) {
        self.stopped.set();
        self.quota.set(0);
    }

    /// Fail with [`TrialError::WorkerBusy`] unless the quota is used up
    pub(crate) fn check_idle(&self, slot: Slot) -> Result<(), TrialError> {
        let quota = self.quota.get();
        let completed = self.completed.get();
        if completed < quota {
            return Err(TrialError::WorkerBusy {
                role: slot.role,
                index: slot.index,
                completed,
                quota,
            });
        }
        Ok(())
    }

    /// Zero the completion counter of an idle worker
    pub(crate) fn reset(&self, slot: Slot) -> Result<(), TrialError> {
        self.check_idle(slot)?;
        self.quota.set(0);
        self.completed.set(0);
        self.pending.set(NO_REPORT);
        Ok(())
    }

    pub fn quota(&self) -> u64 {
        self.quota.get()
    }

    pub fn completed(&self) -> u64 {
        self.completed.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// A registered-but-not-yet-launched worker
pub struct Worker {
    role: Role,
    control: Arc<WorkerControl>,
    unit: Box<dyn WorkUnit>,
}

impl Worker {
    /// Create a worker with the given role and work hook
    pub fn new(role: Role, unit: impl WorkUnit) -> Self {
        Self::from_boxed(role, Box::new(unit))
    }

    /// Create a worker from an already boxed work hook
    pub fn from_boxed(role: Role, unit: Box<dyn WorkUnit>) -> Self {
        Self {
            role,
            control: Arc::new(WorkerControl::new()),
            unit,
        }
    }

    /// Create a writer worker
    pub fn writer(unit: impl WorkUnit) -> Self {
        Self::new(Role::Writer, unit)
    }

    /// Create a reader worker
    pub fn reader(unit: impl WorkUnit) -> Self {
        Self::new(Role::Reader, unit)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Shared handle to this worker's control block
    pub fn control(&self) -> Arc<WorkerControl> {
        Arc::clone(&self.control)
    }

    /// Start the execution loop on a dedicated named thread
    pub(crate) fn spawn<S: CompletionSink>(
        self,
        slot: Slot,
        sink: Arc<S>,
    ) -> Result<JoinHandle<()>, TrialError> {
        let Worker { control, mut unit, .. } = self;
        thread::Builder::new()
            .name(slot.to_string())
            .spawn(move || run_loop(&control, unit.as_mut(), slot, sink.as_ref()))
            .map_err(|e| TrialError::Spawn {
                role: slot.role,
                index: slot.index,
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("role", &self.role)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// Worker execution loop
///
/// Runs for the worker's whole lifetime. Performs units while `completed <
/// quota`, re-reading quota after every unit so a pause lands on the next
/// unit boundary. When idle with an armed report, claims the arm and reports
/// `completed` to the sink. Otherwise spins.
pub(crate) fn run_loop<S: CompletionSink + ?Sized>(
    control: &WorkerControl,
    unit: &mut dyn WorkUnit,
    slot: Slot,
    sink: &S,
) {
    while !control.is_stopped() {
        // Quota first: its acquire makes a preceding reset of `completed` visible.
        let mut quota = control.quota.get();
        let mut done = control.completed.get();
        // A reset landed between the two loads; the pair is inconsistent.
        if control.quota.get() != quota {
            continue;
        }
        while done < quota {
            unit.work();
            done += 1;
            control.completed.set(done);
            quota = control.quota.get();
        }

        let trial = control.pending.get();
        if trial != NO_REPORT {
            let quota = control.quota.get();
            let done = control.completed.get();
            if done >= quota && control.pending.claim(trial, NO_REPORT) {
                sink.report_completion(slot, trial, done);
            }
        }

        std::hint::spin_loop();
    }
}
