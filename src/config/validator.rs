//! Configuration validation

use super::*;
use tracing::warn;

/// Upper bound on the largest axis point exponent
pub const MAX_LG_U: u32 = 30;

/// Upper bound on the trial count exponent
pub const MAX_LG_T: u32 = 20;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_trials(&config.trials)?;
    if config.profile == ProfileKind::Multithreaded {
        validate_concurrency(&config.concurrency)?;
        if let Some(message) = oversubscription_warning(&config.concurrency, num_cpus::get()) {
            warn!("{}", message);
        }
    }
    Ok(())
}

/// Validate the sweep shape
pub fn validate_trials(trials: &TrialPlan) -> Result<()> {
    if trials.lg_min_u > trials.lg_max_u {
        anyhow::bail!(
            "lg_min_u ({}) must not exceed lg_max_u ({})",
            trials.lg_min_u,
            trials.lg_max_u
        );
    }
    if trials.lg_max_u > MAX_LG_U {
        anyhow::bail!("lg_max_u must be at most {}, got {}", MAX_LG_U, trials.lg_max_u);
    }

    if trials.lg_min_t > trials.lg_max_t {
        anyhow::bail!(
            "lg_min_t ({}) must not exceed lg_max_t ({})",
            trials.lg_min_t,
            trials.lg_max_t
        );
    }
    if trials.lg_max_t > MAX_LG_T {
        anyhow::bail!("lg_max_t must be at most {}, got {}", MAX_LG_T, trials.lg_max_t);
    }

    if trials.u_ppo == 0 {
        anyhow::bail!("u_ppo must be at least 1");
    }

    // The slope is only evaluated when the trial count varies
    if trials.lg_min_t != trials.lg_max_t && trials.lg_min_bpu >= trials.lg_max_bpu {
        anyhow::bail!(
            "lg_min_bpu ({}) must be less than lg_max_bpu ({}) when lg_min_t != lg_max_t",
            trials.lg_min_bpu,
            trials.lg_max_bpu
        );
    }
    if trials.lg_max_bpu > 62 || trials.lg_min_bpu > 62 {
        anyhow::bail!("lg_min_bpu and lg_max_bpu must be at most 62");
    }

    Ok(())
}

/// Validate the worker roster
pub fn validate_concurrency(c: &ConcurrencyConfig) -> Result<()> {
    if c.writers == 0 {
        anyhow::bail!("writers must be at least 1 for the multithreaded profile");
    }
    if !(0.0..=1.0).contains(&c.writes_ratio) {
        anyhow::bail!("writes_ratio must be between 0.0 and 1.0, got {}", c.writes_ratio);
    }
    if c.flush_every == 0 {
        anyhow::bail!("flush_every must be at least 1");
    }
    if c.poll_interval_us == 0 || c.poll_interval_us > 100_000 {
        anyhow::bail!(
            "poll_interval_us must be between 1 and 100000, got {}",
            c.poll_interval_us
        );
    }
    if c.trial_timeout_secs == Some(0) {
        anyhow::bail!("trial_timeout_secs must be greater than 0 if specified");
    }
    Ok(())
}

/// Warning text when there are more workers than CPUs
///
/// Idle workers busy-spin, so oversubscribed runs measure scheduler noise.
pub fn oversubscription_warning(c: &ConcurrencyConfig, cpus: usize) -> Option<String> {
    let threads = c.writers + c.readers;
    if threads > cpus {
        Some(format!(
            "{} worker threads on {} CPUs: idle workers busy-spin, results will include scheduling noise",
            threads, cpus
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_axis_bounds() {
        let mut trials = TrialPlan::default();
        trials.lg_min_u = 10;
        trials.lg_max_u = 4;
        assert!(validate_trials(&trials).is_err());

        trials.lg_min_u = 0;
        trials.lg_max_u = 31;
        assert!(validate_trials(&trials).is_err());

        trials.lg_max_u = 30;
        assert!(validate_trials(&trials).is_ok());
    }

    #[test]
    fn test_validate_trial_bounds() {
        let mut trials = TrialPlan::default();
        trials.lg_min_t = 5;
        trials.lg_max_t = 2;
        assert!(validate_trials(&trials).is_err());

        trials.lg_min_t = 0;
        trials.lg_max_t = 21;
        assert!(validate_trials(&trials).is_err());
    }

    #[test]
    fn test_validate_ppo() {
        let mut trials = TrialPlan::default();
        trials.u_ppo = 0;
        let err = validate_trials(&trials).unwrap_err();
        assert!(err.to_string().contains("u_ppo"));
    }

    #[test]
    fn test_validate_bpu_only_matters_with_slope() {
        let mut trials = TrialPlan::default();
        trials.lg_min_bpu = 10;
        trials.lg_max_bpu = 10;
        assert!(validate_trials(&trials).is_err());

        // Fixed trial count never evaluates the slope
        trials.lg_min_t = 3;
        trials.lg_max_t = 3;
        assert!(validate_trials(&trials).is_ok());
    }

    #[test]
    fn test_validate_writers() {
        let mut config = Config::default();
        config.concurrency.writers = 0;
        assert!(validate_config(&config).is_err());

        // The update profile has no roster
        config.profile = ProfileKind::Update;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_writes_ratio() {
        let mut c = ConcurrencyConfig::default();
        c.writes_ratio = 1.5;
        assert!(validate_concurrency(&c).is_err());
        c.writes_ratio = -0.1;
        assert!(validate_concurrency(&c).is_err());
        c.writes_ratio = 1.0;
        assert!(validate_concurrency(&c).is_ok());
    }

    #[test]
    fn test_validate_flush_and_poll() {
        let mut c = ConcurrencyConfig::default();
        c.flush_every = 0;
        assert!(validate_concurrency(&c).is_err());

        c.flush_every = 1;
        c.poll_interval_us = 0;
        assert!(validate_concurrency(&c).is_err());
        c.poll_interval_us = 100_001;
        assert!(validate_concurrency(&c).is_err());
        c.poll_interval_us = 100_000;
        assert!(validate_concurrency(&c).is_ok());
    }

    #[test]
    fn test_validate_timeout() {
        let mut c = ConcurrencyConfig::default();
        c.trial_timeout_secs = Some(0);
        assert!(validate_concurrency(&c).is_err());
    }

    #[test]
    fn test_oversubscription_warning() {
        let mut c = ConcurrencyConfig::default();
        c.writers = 4;
        c.readers = 2;
        assert!(oversubscription_warning(&c, 8).is_none());
        assert!(oversubscription_warning(&c, 6).is_none());

        let message = oversubscription_warning(&c, 4).unwrap();
        assert!(message.contains("6 worker threads on 4 CPUs"));
    }
}
