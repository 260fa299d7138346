//! Job reports
//!
//! The text report streams one TSV row per axis point as the sweep runs; the
//! JSON report is written once at the end.

pub mod json;
pub mod text;

pub use json::{write_json_report, JsonReport};
pub use text::TextReport;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Resolve a report destination
///
/// An existing directory, or a path ending in a separator, receives a file
/// named `<profile>_<yyyyMMdd_HHmmss>.<ext>`. Anything else is used as is.
pub fn resolve_output_path(
    path: &Path,
    profile: &str,
    ext: &str,
    timestamp: DateTime<Utc>,
) -> PathBuf {
    let names_dir = path.is_dir()
        || path
            .as_os_str()
            .to_string_lossy()
            .ends_with(std::path::MAIN_SEPARATOR);
    if names_dir {
        path.join(format!(
            "{}_{}.{}",
            profile,
            timestamp.format("%Y%m%d_%H%M%S"),
            ext
        ))
    } else {
        path.to_path_buf()
    }
}

/// Create the parent directory of a report file if needed
pub(crate) fn ensure_parent(path: &Path) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
