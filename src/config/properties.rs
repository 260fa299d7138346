//! Legacy `key=value` job files
//!
//! Format:
//!
//! ```text
//! # comment
//! JobProfile = multithreaded
//! Trials_lgMinT = 0     # trailing comments are stripped
//! ```
//!
//! Everything after `#` is ignored. Lines shorter than three characters are
//! skipped; any other line must contain `=`. Later keys override earlier ones.

use super::*;
use anyhow::Context;
use std::fs;

/// Parsed key/value pairs in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a required key
    pub fn must_get(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("Missing required property '{}'", key))
    }

    /// Parse a required key
    pub fn must_parse<T>(&self, key: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.must_get(key)?;
        raw.parse()
            .map_err(|e| anyhow::anyhow!("Invalid value '{}' for property '{}': {}", raw, key, e))
    }

    /// Parse an optional key
    pub fn parse_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(_) => self.must_parse(key).map(Some),
            None => Ok(None),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse property text
pub fn parse_properties_string(contents: &str) -> Result<Properties> {
    let mut props = Properties::default();
    for (lineno, line) in contents.lines().enumerate() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.len() < 3 {
            continue;
        }
        let (key, value) = line.split_once('=').with_context(|| {
            format!("Missing valid key-value separator on line {}: {}", lineno + 1, line)
        })?;
        props.insert(key.trim(), value.trim());
    }
    Ok(props)
}

/// Parse a property job file into a configuration
pub fn parse_properties_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {}", path.display()))?;

    let props = parse_properties_string(&contents)
        .with_context(|| format!("Failed to parse job file: {}", path.display()))?;
    config_from_properties(&props)
        .with_context(|| format!("Invalid job file: {}", path.display()))
}

/// Build a configuration from legacy keys
///
/// The profile and all seven sweep keys are required. Concurrency keys are
/// optional; `CONCURRENT_THETA_ThreadSafe = true` selects buffered writers.
pub fn config_from_properties(props: &Properties) -> Result<Config> {
    let mut config = Config {
        profile: props.must_parse("JobProfile")?,
        trials: TrialPlan {
            lg_min_t: props.must_parse("Trials_lgMinT")?,
            lg_max_t: props.must_parse("Trials_lgMaxT")?,
            lg_min_u: props.must_parse("Trials_lgMinU")?,
            lg_max_u: props.must_parse("Trials_lgMaxU")?,
            u_ppo: props.must_parse("Trials_UPPO")?,
            lg_min_bpu: props.must_parse("Trials_lgMinBpU")?,
            lg_max_bpu: props.must_parse("Trials_lgMaxBpU")?,
        },
        ..Config::default()
    };

    let c = &mut config.concurrency;
    if let Some(writers) = props.parse_opt("CONCURRENT_THETA_numWriters")? {
        c.writers = writers;
    }
    if let Some(readers) = props.parse_opt("CONCURRENT_THETA_numReaders")? {
        c.readers = readers;
    }
    if let Some(ratio) = props.parse_opt("CONCURRENT_THETA_writersRatio")? {
        c.writes_ratio = ratio;
    }
    if let Some(thread_safe) = props.parse_opt::<bool>("CONCURRENT_THETA_ThreadSafe")? {
        c.mode = if thread_safe {
            SketchKind::Buffered
        } else {
            SketchKind::Locked
        };
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JOB: &str = "\
# Multithreaded lock-based profile
JobProfile=multithreaded

Trials_lgMinT=0
Trials_lgMaxT=3   # at most 8 trials
Trials_lgMinU=0
Trials_lgMaxU=10
Trials_UPPO=2
Trials_lgMinBpU=4
Trials_lgMaxBpU=10

CONCURRENT_THETA_numWriters=4
CONCURRENT_THETA_numReaders=1
CONCURRENT_THETA_writersRatio=0.0
CONCURRENT_THETA_ThreadSafe=false
";

    #[test]
    fn test_parse_strips_comments() {
        let props = parse_properties_string(JOB).unwrap();
        assert_eq!(props.get("Trials_lgMaxT"), Some("3"));
        assert_eq!(props.get("JobProfile"), Some("multithreaded"));
        assert_eq!(props.len(), 12);
    }

    #[test]
    fn test_parse_skips_short_lines() {
        let props = parse_properties_string("a\n\nab\n  \nkey = value with = sign\n").unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("key"), Some("value with = sign"));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = parse_properties_string("good=1\nnot a pair\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("not a pair"), "{}", msg);
    }

    #[test]
    fn test_later_keys_override() {
        let props = parse_properties_string("k=1\nk=2\n").unwrap();
        assert_eq!(props.get("k"), Some("2"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_config_from_properties() {
        let props = parse_properties_string(JOB).unwrap();
        let config = config_from_properties(&props).unwrap();

        assert_eq!(config.profile, ProfileKind::Multithreaded);
        assert_eq!(config.trials.lg_max_t, 3);
        assert_eq!(config.trials.lg_max_u, 10);
        assert_eq!(config.trials.u_ppo, 2);
        assert_eq!(config.concurrency.writers, 4);
        assert_eq!(config.concurrency.readers, 1);
        assert_eq!(config.concurrency.mode, SketchKind::Locked);
    }

    #[test]
    fn test_thread_safe_selects_buffered() {
        let job = JOB.replace("ThreadSafe=false", "ThreadSafe=true");
        let props = parse_properties_string(&job).unwrap();
        let config = config_from_properties(&props).unwrap();
        assert_eq!(config.concurrency.mode, SketchKind::Buffered);
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let job = JOB.replace("Trials_UPPO=2\n", "");
        let props = parse_properties_string(&job).unwrap();
        let err = config_from_properties(&props).unwrap_err();
        assert!(err.to_string().contains("Trials_UPPO"));
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let job = JOB.replace("numWriters=4", "numWriters=four");
        let props = parse_properties_string(&job).unwrap();
        let err = config_from_properties(&props).unwrap_err();
        assert!(err.to_string().contains("CONCURRENT_THETA_numWriters"));
    }

    #[test]
    fn test_load_property_file() {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        file.write_all(JOB.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.concurrency.writers, 4);
    }
}
