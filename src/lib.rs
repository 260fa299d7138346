//! SketchPulse - speed profiles for concurrent cardinality sketches
//!
//! SketchPulse drives a shared cardinality estimator through log-scale trial
//! sweeps and reports nanoseconds per update at every axis point.
//!
//! # Architecture
//!
//! - **Workers**: one OS thread per writer or reader, each owning a work unit
//!   and a lock-free control block
//! - **Trial coordinator**: issues per-writer quotas, freezes the roster when
//!   the first writer finishes, and records completion counts and elapsed time
//! - **Profiles**: multithreaded (coordinated writers and readers) and a
//!   single-thread update baseline
//! - **Reports**: streaming TSV text report and a JSON summary

pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod output;
pub mod profile;
pub mod sketch;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{TrialCoordinator, TrialError};
pub use worker::{Role, WorkUnit, Worker};

/// Result type used throughout SketchPulse
pub type Result<T> = anyhow::Result<T>;
