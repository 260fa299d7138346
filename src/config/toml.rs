//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::Context;
use std::fs;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with a loaded configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(profile) = cli.profile {
        config.profile = profile.into();
    }

    // Concurrency
    let c = &mut config.concurrency;
    if let Some(writers) = cli.writers {
        c.writers = writers;
    }
    if let Some(readers) = cli.readers {
        c.readers = readers;
    }
    if let Some(ratio) = cli.writes_ratio {
        c.writes_ratio = ratio;
    }
    if let Some(mode) = cli.mode {
        c.mode = mode.into();
    }
    if let Some(flush_every) = cli.flush_every {
        c.flush_every = flush_every;
    }
    if let Some(us) = cli.reader_interval {
        c.reader_interval_us = Some(us);
    }
    if let Some(freeze) = cli.freeze {
        c.freeze = freeze.into();
    }
    if let Some(secs) = cli.trial_timeout {
        c.trial_timeout_secs = Some(secs);
    }

    // Sweep
    if let Some(lg) = cli.lg_min_u {
        config.trials.lg_min_u = lg;
    }
    if let Some(lg) = cli.lg_max_u {
        config.trials.lg_max_u = lg;
    }
    if let Some(ppo) = cli.ppo {
        config.trials.u_ppo = ppo;
    }

    // Values
    if let Some(values) = cli.values {
        config.values.mode = values.into();
    }
    if let Some(seed) = cli.seed {
        config.values.seed = seed;
    }

    // Output and runtime flags only ever switch things on
    if let Some(ref path) = cli.text_output {
        config.output.text_output = Some(path.clone());
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    config.output.quiet |= cli.quiet;
    config.runtime.dry_run |= cli.dry_run;
    config.runtime.debug |= cli.debug;

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::SketchKind;
    use clap::Parser;
    use std::io::Write;

    const JOB: &str = r#"
profile = "multithreaded"

[trials]
lg_min_u = 2
lg_max_u = 12
u_ppo = 2

[concurrency]
writers = 4
readers = 2
mode = "buffered"
flush_every = 128
freeze = "readers_only"
trial_timeout_secs = 60

[values]
mode = "uniform"
seed = 42

[output]
json_output = "results/"
"#;

    #[test]
    fn test_parse_full_job() {
        let config = parse_toml_string(JOB).unwrap();

        assert_eq!(config.profile, ProfileKind::Multithreaded);
        assert_eq!(config.trials.lg_min_u, 2);
        assert_eq!(config.trials.lg_max_u, 12);
        assert_eq!(config.trials.u_ppo, 2);
        // Unspecified keys keep their defaults
        assert_eq!(config.trials.lg_max_t, 4);
        assert_eq!(config.concurrency.writers, 4);
        assert_eq!(config.concurrency.readers, 2);
        assert_eq!(config.concurrency.mode, SketchKind::Buffered);
        assert_eq!(config.concurrency.flush_every, 128);
        assert_eq!(config.concurrency.freeze, FreezeScope::ReadersOnly);
        assert_eq!(config.concurrency.poll_interval_us, 1000);
        assert_eq!(config.concurrency.trial_timeout_secs, Some(60));
        assert_eq!(config.values.mode, ValueMode::Uniform);
        assert_eq!(config.values.seed, 42);
        assert_eq!(config.output.json_output, Some(PathBuf::from("results/")));
        assert!(!config.output.quiet);
    }

    #[test]
    fn test_parse_empty_job_is_default() {
        assert_eq!(parse_toml_string("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_bad_enum() {
        let err = parse_toml_string("[concurrency]\nmode = \"sharded\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("sharded"));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(JOB.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.concurrency.writers, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_toml_file(Path::new("/nonexistent/job.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = parse_toml_string(JOB).unwrap();
        let cli = Cli::try_parse_from([
            "sketchpulse",
            "--writers",
            "8",
            "--mode",
            "locked",
            "--freeze",
            "everyone",
            "--ppo",
            "8",
            "--seed",
            "1",
            "--quiet",
        ])
        .unwrap();

        let merged = merge_cli_with_config(&cli, config);
        assert_eq!(merged.concurrency.writers, 8);
        assert_eq!(merged.concurrency.readers, 2);
        assert_eq!(merged.concurrency.mode, SketchKind::Locked);
        assert_eq!(merged.concurrency.freeze, FreezeScope::Everyone);
        assert_eq!(merged.trials.u_ppo, 8);
        assert_eq!(merged.trials.lg_max_u, 12);
        assert_eq!(merged.values.seed, 1);
        assert_eq!(merged.values.mode, ValueMode::Uniform);
        assert!(merged.output.quiet);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let config = parse_toml_string(JOB).unwrap();
        let cli = Cli::try_parse_from(["sketchpulse"]).unwrap();
        assert_eq!(merge_cli_with_config(&cli, config.clone()), config);
    }
}
