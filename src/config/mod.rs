//! Configuration module
//!
//! A job is described by a TOML file, a legacy `key=value` property file, or
//! nothing at all (defaults). CLI flags are merged on top, then the result is
//! validated before any worker is started.

pub mod cli;
pub mod properties;
pub mod toml;
pub mod validator;

use crate::coordinator::FreezeScope;
use crate::distribution::ValueMode;
use crate::profile::{MultithreadedSettings, ProfileKind, TrialPlan};
use crate::sketch::SketchKind;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete job configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileKind,
    #[serde(default)]
    pub trials: TrialPlan,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub values: ValuesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Worker roster and coordination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Number of writer threads
    #[serde(default = "default_writers")]
    pub writers: usize,
    /// Number of reader threads
    #[serde(default)]
    pub readers: usize,
    /// Fraction of writer units that are writes (0 = pure writers)
    #[serde(default)]
    pub writes_ratio: f64,
    /// How writers reach the shared estimator
    #[serde(default)]
    pub mode: SketchKind,
    /// Inserts between merges in buffered mode
    #[serde(default = "default_flush_every")]
    pub flush_every: u64,
    /// Reader sleep before each query (microseconds)
    pub reader_interval_us: Option<u64>,
    /// Who the first finishing writer freezes
    #[serde(default)]
    pub freeze: FreezeScope,
    /// Completion poll interval (microseconds)
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
    /// Abort a trial that takes longer than this (seconds)
    pub trial_timeout_secs: Option<u64>,
}

fn default_writers() -> usize {
    1
}

fn default_flush_every() -> u64 {
    64
}

fn default_poll_interval_us() -> u64 {
    1000
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            writers: default_writers(),
            readers: 0,
            writes_ratio: 0.0,
            mode: SketchKind::default(),
            flush_every: default_flush_every(),
            reader_interval_us: None,
            freeze: FreezeScope::default(),
            poll_interval_us: default_poll_interval_us(),
            trial_timeout_secs: None,
        }
    }
}

/// Input value stream settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValuesConfig {
    #[serde(default)]
    pub mode: ValueMode,
    #[serde(default)]
    pub seed: u64,
}

/// Report destinations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Text report file path or directory
    pub text_output: Option<PathBuf>,
    /// JSON report file path or directory
    pub json_output: Option<PathBuf>,
    /// Suppress the report on stdout
    #[serde(default)]
    pub quiet: bool,
}

/// Runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
    /// Validate and print the configuration without running
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Load a job file; `.toml` files are TOML, anything else is a property file
    pub fn load(path: &Path) -> Result<Config> {
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            self::toml::parse_toml_file(path)
        } else {
            properties::parse_properties_file(path)
        }
    }

    /// Settings for the multithreaded profile
    pub fn multithreaded_settings(&self) -> MultithreadedSettings {
        let c = &self.concurrency;
        MultithreadedSettings {
            writers: c.writers,
            readers: c.readers,
            writes_ratio: c.writes_ratio,
            mode: c.mode.with_flush_every(c.flush_every),
            reader_interval: c.reader_interval_us.map(Duration::from_micros),
            values: self.values.mode,
            seed: self.values.seed,
            freeze: c.freeze,
            poll_interval: Duration::from_micros(c.poll_interval_us),
            trial_timeout: c.trial_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Effective configuration as flat `section.key = value` pairs
    ///
    /// Unset optional values are omitted.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(value) = serde_json::to_value(self) {
            flatten("", &value, &mut out);
        }
        out
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&name, child, out);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Profile: {}", self.profile)?;
        writeln!(
            f,
            "  Trials: u=2^{}..2^{} ({} per octave), trials=2^{}..2^{}, slope between 2^{} and 2^{}",
            self.trials.lg_min_u,
            self.trials.lg_max_u,
            self.trials.u_ppo,
            self.trials.lg_min_t,
            self.trials.lg_max_t,
            self.trials.lg_min_bpu,
            self.trials.lg_max_bpu
        )?;
        if self.profile == ProfileKind::Multithreaded {
            writeln!(f, "  Concurrency: {}", self.concurrency)?;
        }
        writeln!(f, "  Values: {}", self.values)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

impl fmt::Display for ConcurrencyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} writer(s), {} reader(s), mode={}",
            self.writers, self.readers, self.mode
        )?;
        if self.mode == SketchKind::Buffered {
            write!(f, ", flush_every={}", self.flush_every)?;
        }
        if self.writes_ratio > 0.0 {
            write!(f, ", writes_ratio={}", self.writes_ratio)?;
        }
        if let Some(us) = self.reader_interval_us {
            write!(f, ", reader_interval={}us", us)?;
        }
        match self.freeze {
            FreezeScope::Everyone => write!(f, ", freeze=everyone")?,
            FreezeScope::ReadersOnly => write!(f, ", freeze=readers_only")?,
        }
        if let Some(secs) = self.trial_timeout_secs {
            write!(f, ", trial_timeout={}s", secs)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValuesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ValueMode::Sequential => write!(f, "sequential"),
            ValueMode::Uniform => write!(f, "uniform (seed={})", self.seed),
        }
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref path) = self.text_output {
            parts.push(format!("text={}", path.display()));
        }
        if let Some(ref path) = self.json_output {
            parts.push(format!("json={}", path.display()));
        }
        if self.quiet {
            parts.push("quiet".to_string());
        }
        if parts.is_empty() {
            write!(f, "stdout")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
