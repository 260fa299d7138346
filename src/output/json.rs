//! JSON job report

use super::ensure_parent;
use crate::config::Config;
use crate::stats::PointStats;
use crate::util::time::format_duration;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration(d),
        }
    }
}

/// Complete report of one job
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub tool: &'static str,
    pub version: &'static str,
    pub profile: String,
    pub host: String,
    pub started_at: String,
    pub elapsed: JsonDuration,
    pub config: Config,
    pub points: Vec<PointStats>,
}

impl JsonReport {
    pub fn new(
        config: &Config,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        points: Vec<PointStats>,
    ) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            profile: config.profile.to_string(),
            host: host_name(),
            started_at: started_at.to_rfc3339(),
            elapsed: JsonDuration::from_duration(elapsed),
            config: config.clone(),
            points,
        }
    }
}

/// Local host name, or "unknown"
pub fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Write the report, pretty printed
pub fn write_json_report(path: &Path, report: &JsonReport) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON report: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
