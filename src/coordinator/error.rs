//! Trial coordination errors
//!
//! Every variant is a caller-side protocol violation or a liveness failure.
//! None of them is retried: a trial that errors is discarded.

use crate::worker::Role;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the trial coordinator and its workers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrialError {
    /// A worker was registered after `launch_all`
    #[error("cannot register a {0} after workers have been launched")]
    RegistrationClosed(Role),

    /// `register_writer` was handed a reader, or the reverse
    #[error("expected a {expected} worker, got a {actual}")]
    RoleMismatch { expected: Role, actual: Role },

    /// `launch_all` was called twice
    #[error("workers have already been launched")]
    AlreadyLaunched,

    /// A trial was requested before `launch_all`
    #[error("workers have not been launched")]
    NotLaunched,

    /// A trial needs at least one writer to define its end
    #[error("no writers registered, a trial would never complete")]
    NoWriters,

    /// The current trial has not been fully reported yet
    #[error("trial {0} is still in flight")]
    TrialInFlight(u64),

    /// The previous trial finished but its counters were never reset
    #[error("trial {0} completed but reset_trial was not called")]
    ResetRequired(u64),

    /// `wait_for_trial` without a preceding `run_trial`
    #[error("no trial has been started since the last reset")]
    NoTrialInFlight,

    /// A worker still had authorized work when it was reset
    #[error("{role} {index} is not paused ({completed} of {quota} units done)")]
    WorkerBusy {
        role: Role,
        index: usize,
        completed: u64,
        quota: u64,
    },

    /// `stop_all` was called before or during the trial
    #[error("workers have been stopped (trial {0})")]
    Stopped(u64),

    /// A worker thread terminated without being stopped
    #[error("{role} {index} exited during trial {trial}")]
    WorkerExited { role: Role, index: usize, trial: u64 },

    /// The trial did not complete within the allotted time
    #[error("trial {trial} did not complete within {timeout:?}")]
    Timeout { trial: u64, timeout: Duration },

    /// The OS refused to spawn a worker thread
    #[error("failed to spawn {role} thread {index}: {reason}")]
    Spawn {
        role: Role,
        index: usize,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_worker() {
        let err = TrialError::WorkerBusy {
            role: Role::Writer,
            index: 2,
            completed: 10,
            quota: 250,
        };
        assert_eq!(err.to_string(), "writer 2 is not paused (10 of 250 units done)");

        let err = TrialError::RegistrationClosed(Role::Reader);
        assert_eq!(
            err.to_string(),
            "cannot register a reader after workers have been launched"
        );
    }
}
