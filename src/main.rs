//! SketchPulse CLI entry point

use anyhow::{Context, Result};
use sketchpulse::config::{cli::Cli, toml::merge_cli_with_config, validator, Config};
use sketchpulse::output::{resolve_output_path, write_json_report, JsonReport, TextReport};
use sketchpulse::profile::{
    run_profile, MultithreadedSpeedProfile, ProfileKind, SpeedProfile, UpdateSpeedProfile,
};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match cli.job {
        Some(ref path) => Config::load(path)
            .with_context(|| format!("Failed to load job file: {}", path.display()))?,
        None => Config::default(),
    };
    let config = merge_cli_with_config(&cli, config);

    init_logging(config.runtime.debug);

    validator::validate_config(&config).context("Configuration validation failed")?;

    if config.runtime.dry_run {
        print!("{}", config);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    run_job(&config)
}

/// Log to stderr so the report on stdout stays machine readable
fn init_logging(debug: bool) {
    let default = if debug {
        "sketchpulse=debug"
    } else {
        "sketchpulse=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_job(config: &Config) -> Result<()> {
    let start = Instant::now();
    let mut profile: Box<dyn SpeedProfile> = match config.profile {
        ProfileKind::Multithreaded => Box::new(
            MultithreadedSpeedProfile::new(&config.multithreaded_settings())
                .context("Failed to start workers")?,
        ),
        ProfileKind::Update => Box::new(UpdateSpeedProfile::new(
            config.values.mode,
            config.values.seed,
        )),
    };

    let name = config.profile.to_string();
    let text_path = config
        .output
        .text_output
        .as_deref()
        .map(|path| resolve_output_path(path, &name, "txt", chrono::Utc::now()));
    let mut report = TextReport::new(&name, text_path.as_deref(), config.output.quiet)?;

    report.begin()?;
    let points = run_profile(profile.as_mut(), &config.trials, &mut report)
        .with_context(|| format!("Profile '{}' failed", name))?;
    report.finish(&config.properties())?;
    if let Some(path) = report.path() {
        info!(path = %path.display(), "text report written");
    }

    if let Some(ref dir) = config.output.json_output {
        let path = resolve_output_path(dir, &name, "json", report.started_at());
        let json = JsonReport::new(config, report.started_at(), start.elapsed(), points);
        write_json_report(&path, &json)?;
        info!(path = %path.display(), "JSON report written");
    }

    Ok(())
}
