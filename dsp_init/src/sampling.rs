use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::env;

use crate::literals::{DSPREP_INTERVAL, DSPREP_MAX_FRAMES, DSPREP_MIN_FRAMES};

const DEFAULT_INTERVAL_SECONDS: f64 = 0.1;

/// Enum to represent the source of the sampling interval
enum IntervalSource {
    CliArgument(f64),
    EnvironmentVariable(String),
    FromConfigFile(f64),
    DefaultValue(f64),
}

/// Minimum and maximum frame counts resolved for one sampler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub min_frames: u32,
    pub max_frames: u32,
}

/// Retrieves the sampling interval in seconds.
///
/// Sources are checked in the order CLI argument, `DSPREP_INTERVAL`,
/// configuration file, built-in default (0.1 s). A configured interval that is
/// not strictly positive is skipped with a warning.
pub fn get_interval(cli_interval: Option<f64>, config: &Config) -> Result<f64> {
    debug!("Starting to resolve sampling interval...");
    interval_from_sources(cli_interval, env::var(DSPREP_INTERVAL).ok(), config)
}

fn interval_from_sources(
    cli_interval: Option<f64>,
    env_interval: Option<String>,
    config: &Config,
) -> Result<f64> {
    let source = if let Some(interval) = cli_interval {
        debug!("Using interval provided via CLI argument: {}", interval);
        IntervalSource::CliArgument(interval)
    } else if let Some(value) = env_interval {
        debug!("Using interval from {} environment variable.", DSPREP_INTERVAL);
        IntervalSource::EnvironmentVariable(value)
    } else if is_valid_interval(config.interval_seconds) {
        debug!(
            "Using interval from configuration file: {}",
            config.interval_seconds
        );
        IntervalSource::FromConfigFile(config.interval_seconds)
    } else {
        warn!(
            "Configured interval {} is not usable, falling back to {}",
            config.interval_seconds, DEFAULT_INTERVAL_SECONDS
        );
        IntervalSource::DefaultValue(DEFAULT_INTERVAL_SECONDS)
    };

    let interval = match source {
        IntervalSource::CliArgument(interval)
        | IntervalSource::FromConfigFile(interval)
        | IntervalSource::DefaultValue(interval) => interval,
        IntervalSource::EnvironmentVariable(value) => value.trim().parse::<f64>().context(
            format!("Invalid interval value in {}: '{}'", DSPREP_INTERVAL, value),
        )?,
    };

    if !is_valid_interval(interval) {
        return Err(anyhow!(
            "Sampling interval must be a positive number of seconds, got {}",
            interval
        ));
    }

    debug!("Resolved sampling interval: {} seconds", interval);
    Ok(interval)
}

fn is_valid_interval(interval: f64) -> bool {
    interval.is_finite() && interval > 0.0
}

/// Retrieves the minimum and maximum frame counts for the sampler.
///
/// Each bound is resolved independently: CLI argument, then
/// `DSPREP_MIN_FRAMES` / `DSPREP_MAX_FRAMES`, then the configuration file.
///
/// # Returns
/// - `Result<FrameLimits>`: the resolved bounds, or an error when `max_frames`
///   is zero or smaller than `min_frames`.
pub fn get_frame_limits(
    cli_min: Option<u32>,
    cli_max: Option<u32>,
    config: &Config,
) -> Result<FrameLimits> {
    debug!("Starting to resolve frame limits...");
    frame_limits_from_sources(
        (cli_min, env::var(DSPREP_MIN_FRAMES).ok()),
        (cli_max, env::var(DSPREP_MAX_FRAMES).ok()),
        config,
    )
}

fn frame_limits_from_sources(
    min_sources: (Option<u32>, Option<String>),
    max_sources: (Option<u32>, Option<String>),
    config: &Config,
) -> Result<FrameLimits> {
    let min_frames = resolve_count(min_sources, DSPREP_MIN_FRAMES, config.min_frames)?;
    let max_frames = resolve_count(max_sources, DSPREP_MAX_FRAMES, config.max_frames)?;

    if max_frames == 0 {
        return Err(anyhow!("Maximum number of frames must be at least 1"));
    }
    if min_frames > max_frames {
        return Err(anyhow!(
            "Minimum number of frames ({}) exceeds the maximum ({})",
            min_frames,
            max_frames
        ));
    }

    debug!(
        "Resolved frame limits: min {} / max {}",
        min_frames, max_frames
    );
    Ok(FrameLimits {
        min_frames,
        max_frames,
    })
}

fn resolve_count(
    (cli_value, env_value): (Option<u32>, Option<String>),
    env_name: &str,
    config_value: u32,
) -> Result<u32> {
    if let Some(value) = cli_value {
        debug!("Using {} value provided via CLI argument: {}", env_name, value);
        return Ok(value);
    }
    if let Some(value) = env_value {
        debug!("Using {} value from environment variable: {}", env_name, value);
        return value
            .trim()
            .parse::<u32>()
            .context(format!("Invalid value in {}: '{}'", env_name, value));
    }
    debug!("Using {} value from configuration file: {}", env_name, config_value);
    Ok(config_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_interval_wins_over_env_and_config() {
        let config = Config::default();
        let interval =
            interval_from_sources(Some(0.25), Some("2.0".to_string()), &config).unwrap();
        assert_eq!(interval, 0.25);
    }

    #[test]
    fn env_interval_is_parsed() {
        let config = Config::default();
        let interval = interval_from_sources(None, Some(" 0.5 ".to_string()), &config).unwrap();
        assert_eq!(interval, 0.5);
    }

    #[test]
    fn bad_env_interval_is_an_error() {
        let config = Config::default();
        assert!(interval_from_sources(None, Some("fast".to_string()), &config).is_err());
    }

    #[test]
    fn unusable_config_interval_falls_back_to_default() {
        let config = Config {
            interval_seconds: 0.0,
            ..Config::default()
        };
        assert_eq!(
            interval_from_sources(None, None, &config).unwrap(),
            DEFAULT_INTERVAL_SECONDS
        );
    }

    #[test]
    fn non_positive_cli_interval_is_rejected() {
        let config = Config::default();
        assert!(interval_from_sources(Some(-1.0), None, &config).is_err());
        assert!(interval_from_sources(Some(f64::NAN), None, &config).is_err());
    }

    #[test]
    fn frame_limits_mix_sources() {
        let config = Config::default();
        let limits =
            frame_limits_from_sources((None, Some("3".to_string())), (Some(50), None), &config)
                .unwrap();
        assert_eq!(
            limits,
            FrameLimits {
                min_frames: 3,
                max_frames: 50
            }
        );
    }

    #[test]
    fn frame_limits_come_from_config_by_default() {
        let config = Config::default();
        let limits = frame_limits_from_sources((None, None), (None, None), &config).unwrap();
        assert_eq!(limits.min_frames, 10);
        assert_eq!(limits.max_frames, 400);
    }

    #[test]
    fn inverted_or_zero_limits_are_rejected() {
        let config = Config::default();
        assert!(frame_limits_from_sources((Some(20), None), (Some(10), None), &config).is_err());
        assert!(frame_limits_from_sources((Some(0), None), (Some(0), None), &config).is_err());
    }
}
