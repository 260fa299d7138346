//! CLI argument parsing using clap

use crate::coordinator::FreezeScope;
use crate::distribution::ValueMode;
use crate::profile::ProfileKind;
use crate::sketch::SketchKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Job profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Coordinated writer/reader threads on a shared estimator
    Multithreaded,
    /// Single-thread insert baseline
    Update,
}

/// Writer access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Every insert takes the write lock
    Locked,
    /// Writers buffer locally and merge periodically
    Buffered,
}

/// Freeze scope on first writer completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FreezeArg {
    /// Pause every other worker
    Everyone,
    /// Pause readers only
    ReadersOnly,
}

/// Input value stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValuesArg {
    Sequential,
    Uniform,
}

impl From<ProfileArg> for ProfileKind {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Multithreaded => ProfileKind::Multithreaded,
            ProfileArg::Update => ProfileKind::Update,
        }
    }
}

impl From<ModeArg> for SketchKind {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Locked => SketchKind::Locked,
            ModeArg::Buffered => SketchKind::Buffered,
        }
    }
}

impl From<FreezeArg> for FreezeScope {
    fn from(arg: FreezeArg) -> Self {
        match arg {
            FreezeArg::Everyone => FreezeScope::Everyone,
            FreezeArg::ReadersOnly => FreezeScope::ReadersOnly,
        }
    }
}

impl From<ValuesArg> for ValueMode {
    fn from(arg: ValuesArg) -> Self {
        match arg {
            ValuesArg::Sequential => ValueMode::Sequential,
            ValuesArg::Uniform => ValueMode::Uniform,
        }
    }
}

/// SketchPulse - speed profiles for concurrent cardinality sketches
#[derive(Parser, Debug)]
#[command(name = "sketchpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Job file: `.toml`, or legacy `key=value` properties
    ///
    /// Without a job file the built-in defaults apply.
    #[arg(value_name = "JOB", env = "SKETCHPULSE_JOB")]
    pub job: Option<PathBuf>,

    /// Profile to run
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    // === Concurrency Options ===
    /// Number of writer threads
    #[arg(short = 'w', long)]
    pub writers: Option<usize>,

    /// Number of reader threads
    #[arg(short = 'r', long)]
    pub readers: Option<usize>,

    /// Fraction of writer units that are writes (0 = pure writers)
    #[arg(long)]
    pub writes_ratio: Option<f64>,

    /// Writer access mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Inserts between merges in buffered mode
    #[arg(long)]
    pub flush_every: Option<u64>,

    /// Reader sleep before each query, in microseconds
    #[arg(long, value_name = "US")]
    pub reader_interval: Option<u64>,

    /// Who the first finishing writer pauses
    #[arg(long, value_enum)]
    pub freeze: Option<FreezeArg>,

    /// Abort a trial that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub trial_timeout: Option<u64>,

    // === Sweep Options ===
    /// Smallest axis point, as a power of two
    #[arg(long)]
    pub lg_min_u: Option<u32>,

    /// Largest axis point, as a power of two
    #[arg(long)]
    pub lg_max_u: Option<u32>,

    /// Axis points per octave
    #[arg(long)]
    pub ppo: Option<u32>,

    // === Input Options ===
    /// Input value stream
    #[arg(long, value_enum)]
    pub values: Option<ValuesArg>,

    /// Seed for the uniform value stream
    #[arg(long)]
    pub seed: Option<u64>,

    // === Output Options ===
    /// Text report file path or directory
    #[arg(long)]
    pub text_output: Option<PathBuf>,

    /// JSON report file path or directory
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Do not print the report to stdout
    #[arg(short = 'q', long)]
    pub quiet: bool,

    // === Runtime Options ===
    /// Validate and print the configuration, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["sketchpulse"]).unwrap();
        assert!(cli.profile.is_none());
        assert!(cli.writers.is_none());
        assert!(!cli.quiet);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "sketchpulse",
            "job.toml",
            "--profile",
            "multithreaded",
            "-w",
            "4",
            "--readers",
            "2",
            "--mode",
            "buffered",
            "--freeze",
            "readers-only",
            "--values",
            "uniform",
            "--seed",
            "9",
            "--lg-max-u",
            "20",
            "--trial-timeout",
            "30",
            "--quiet",
        ])
        .unwrap();

        assert_eq!(cli.job, Some(PathBuf::from("job.toml")));
        assert_eq!(cli.profile, Some(ProfileArg::Multithreaded));
        assert_eq!(cli.writers, Some(4));
        assert_eq!(cli.readers, Some(2));
        assert_eq!(cli.mode, Some(ModeArg::Buffered));
        assert_eq!(cli.freeze, Some(FreezeArg::ReadersOnly));
        assert_eq!(cli.values, Some(ValuesArg::Uniform));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.lg_max_u, Some(20));
        assert_eq!(cli.trial_timeout, Some(30));
        assert!(cli.quiet);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["sketchpulse", "--mode", "sharded"]).is_err());
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(ProfileKind::from(ProfileArg::Update), ProfileKind::Update);
        assert_eq!(SketchKind::from(ModeArg::Locked), SketchKind::Locked);
        assert_eq!(FreezeScope::from(FreezeArg::ReadersOnly), FreezeScope::ReadersOnly);
        assert_eq!(ValueMode::from(ValuesArg::Uniform), ValueMode::Uniform);
    }
}
