use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::env;

use crate::literals::DSPREP_SPLIT_RATIO;

const DEFAULT_SPLIT_RATIO: f64 = 0.9;

/// Enum to represent the source of the split ratio
enum RatioSource {
    CliArgument(f64),
    EnvironmentVariable(f64),
    FromConfigFile(f64),
    DefaultValue(f64),
}

/// Retrieves and validates the split ratio.
///
/// Checked in the order CLI argument, `DSPREP_SPLIT_RATIO`, configuration file,
/// default (0.9). The ratio must lie strictly between 0.0 and 1.0.
pub fn get_split_ratio(cli_ratio: Option<f64>, config: &Config) -> Result<f64> {
    debug!("Starting to resolve split ratio...");
    ratio_from_sources(cli_ratio, env::var(DSPREP_SPLIT_RATIO).ok(), config)
}

fn ratio_from_sources(
    cli_ratio: Option<f64>,
    env_ratio: Option<String>,
    config: &Config,
) -> Result<f64> {
    let source = if let Some(ratio) = cli_ratio {
        debug!("Using split ratio provided via CLI argument: {}", ratio);
        RatioSource::CliArgument(ratio)
    } else if let Some(value) = env_ratio {
        let parsed = value.trim().parse::<f64>().context(format!(
            "Invalid split ratio in {} environment variable: '{}'",
            DSPREP_SPLIT_RATIO, value
        ))?;
        debug!("Using split ratio from {}: {}", DSPREP_SPLIT_RATIO, parsed);
        RatioSource::EnvironmentVariable(parsed)
    } else if is_valid_ratio(config.split_ratio) {
        debug!("Using split ratio from configuration file: {}", config.split_ratio);
        RatioSource::FromConfigFile(config.split_ratio)
    } else {
        warn!(
            "No valid split ratio source provided, falling back to default value of {}",
            DEFAULT_SPLIT_RATIO
        );
        RatioSource::DefaultValue(DEFAULT_SPLIT_RATIO)
    };

    let ratio = match source {
        RatioSource::CliArgument(ratio)
        | RatioSource::EnvironmentVariable(ratio)
        | RatioSource::FromConfigFile(ratio)
        | RatioSource::DefaultValue(ratio) => ratio,
    };

    if !is_valid_ratio(ratio) {
        return Err(anyhow!(
            "Split ratio must be strictly between 0.0 and 1.0, got {}",
            ratio
        ));
    }
    Ok(ratio)
}

fn is_valid_ratio(ratio: f64) -> bool {
    ratio > 0.0 && ratio < 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_prefers_cli() {
        let config = Config::default();
        assert_eq!(
            ratio_from_sources(Some(0.8), Some("0.5".into()), &config).unwrap(),
            0.8
        );
    }

    #[test]
    fn ratio_from_env() {
        let config = Config::default();
        assert_eq!(ratio_from_sources(None, Some("0.75".into()), &config).unwrap(), 0.75);
    }

    #[test]
    fn ratio_bounds_are_exclusive() {
        let config = Config::default();
        assert!(ratio_from_sources(Some(1.0), None, &config).is_err());
        assert!(ratio_from_sources(Some(0.0), None, &config).is_err());
    }

    #[test]
    fn broken_config_ratio_uses_default() {
        let config = Config {
            split_ratio: 4.0,
            ..Config::default()
        };
        assert_eq!(ratio_from_sources(None, None, &config).unwrap(), DEFAULT_SPLIT_RATIO);
    }
}
