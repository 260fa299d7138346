//! Tab-separated job report
//!
//! ```text
//! START JOB multithreaded
//! Start Time            : 2024-03-09T12:05:07+00:00
//! InU	Trials	nS/u	Writes	Reads	P50nS	MinnS	MaxnS
//! 1	16	812.500	1	0	812	790	1043
//! ...
//! PROPERTIES:
//! profile=multithreaded
//! ...
//! Total Job Time        : 00:00:03.214
//! END JOB multithreaded
//! ```

use super::ensure_parent;
use crate::profile::PointSink;
use crate::stats::PointStats;
use crate::util::time::format_job_time;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Column header of the row section
pub const HEADER: &str = "InU\tTrials\tnS/u\tWrites\tReads\tP50nS\tMinnS\tMaxnS";

/// Text report written to stdout and an optional file
pub struct TextReport {
    profile: String,
    quiet: bool,
    file: Option<(PathBuf, BufWriter<File>)>,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl TextReport {
    /// Create the report; `path` is the already resolved file destination
    pub fn new(profile: &str, path: Option<&Path>, quiet: bool) -> Result<Self> {
        let file = match path {
            Some(path) => {
                ensure_parent(path)?;
                let file = File::create(path).with_context(|| {
                    format!("Failed to create text report: {}", path.display())
                })?;
                Some((path.to_path_buf(), BufWriter::new(file)))
            }
            None => None,
        };
        Ok(Self {
            profile: profile.to_string(),
            quiet,
            file,
            started_at: Utc::now(),
            start: Instant::now(),
        })
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(path, _)| path.as_path())
    }

    /// Job banner and column header
    pub fn begin(&mut self) -> Result<()> {
        let banner = format!("START JOB {}", self.profile);
        let started = format!("Start Time            : {}", self.started_at.to_rfc3339());
        self.line(&banner)?;
        self.line(&started)?;
        self.line(HEADER)
    }

    /// Property dump, total job time and closing banner
    pub fn finish(&mut self, properties: &[(String, String)]) -> Result<()> {
        self.line("PROPERTIES:")?;
        for (key, value) in properties {
            self.line(&format!("{}={}", key, value))?;
        }
        let total = format!(
            "Total Job Time        : {}",
            format_job_time(self.start.elapsed())
        );
        self.line(&total)?;
        let end = format!("END JOB {}", self.profile);
        self.line(&end)?;

        if let Some((path, file)) = self.file.as_mut() {
            file.flush()
                .with_context(|| format!("Failed to write text report: {}", path.display()))?;
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<()> {
        if !self.quiet {
            println!("{}", text);
        }
        if let Some((path, file)) = self.file.as_mut() {
            writeln!(file, "{}", text)
                .with_context(|| format!("Failed to write text report: {}", path.display()))?;
        }
        Ok(())
    }
}

impl PointSink for TextReport {
    fn record_point(&mut self, point: &PointStats) -> Result<()> {
        self.line(&format_row(point))
    }
}

/// One TSV row
pub fn format_row(point: &PointStats) -> String {
    format!(
        "{}\t{}\t{:.3}\t{:.0}\t{:.0}\t{}\t{}\t{}",
        point.updates,
        point.trials,
        point.mean_ns_per_write,
        point.mean_writes,
        point.mean_reads,
        point.p50_ns,
        point.min_ns,
        point.max_ns
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TrialSample;
    use std::time::Duration;

    fn point() -> PointStats {
        let samples = [
            TrialSample::new(Duration::from_nanos(1000), 10, 3),
            TrialSample::new(Duration::from_nanos(3000), 10, 5),
        ];
        PointStats::from_samples(10, &samples)
    }

    #[test]
    fn test_format_row() {
        assert_eq!(format_row(&point()), "10\t2\t200.000\t10\t4\t100\t100\t300");
    }

    #[test]
    fn test_header_columns_match_row() {
        let columns = HEADER.split('\t').count();
        assert_eq!(columns, 8);
        assert_eq!(format_row(&point()).split('\t').count(), columns);
    }

    #[test]
    fn test_report_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/job.txt");

        let mut report = TextReport::new("multithreaded", Some(&path), true).unwrap();
        assert_eq!(report.path(), Some(path.as_path()));
        report.begin().unwrap();
        report.record_point(&point()).unwrap();
        report
            .finish(&[("concurrency.writers".to_string(), "4".to_string())])
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "START JOB multithreaded");
        assert!(lines[1].starts_with("Start Time            : "));
        assert_eq!(lines[2], HEADER);
        assert_eq!(lines[3], "10\t2\t200.000\t10\t4\t100\t100\t300");
        assert_eq!(lines[4], "PROPERTIES:");
        assert_eq!(lines[5], "concurrency.writers=4");
        assert!(lines[6].starts_with("Total Job Time        : 00:00:"));
        assert_eq!(lines[7], "END JOB multithreaded");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_report_without_file() {
        let mut report = TextReport::new("update", None, true).unwrap();
        assert!(report.path().is_none());
        report.begin().unwrap();
        report.finish(&[]).unwrap();
    }
}
