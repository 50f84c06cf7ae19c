use anyhow::{Context, Result};
use dialoguer::Input;
use log::debug;
use log::warn;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "dsprep";
const CONFIG_NAME: &str = "config";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Seconds between two retained frames
    pub interval_seconds: f64,
    /// Frames below which a video is reported as insufficient
    pub min_frames: u32,
    /// Hard cap on frames extracted per video
    pub max_frames: u32,
    /// Suffix of the videos picked up by the sampler (without the dot)
    pub video_extension: String,
    /// Image format of the extracted frames
    pub frame_format: String,
    /// Share of every class that goes to the first split destination (0.0 - 1.0)
    pub split_ratio: f64,
    /// Suffix of the images collected by the splitter
    pub image_extension: String,
    /// Optional seed making the split reproducible
    pub split_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interval_seconds: 0.1,
            min_frames: 10,
            max_frames: 400,
            video_extension: String::from("mp4"),
            frame_format: String::from("jpg"),
            split_ratio: 0.9,
            image_extension: String::from("jpg"),
            split_seed: None,
        }
    }
}

/// Initializes and updates the application configuration by prompting the user for settings.
///
/// This function loads the existing configuration, prompts the user to update every
/// sampler and splitter parameter, and saves the updated configuration.
///
/// # Returns
/// - `Result<()>`: Indicates whether the configuration was successfully initialized and saved.
///
/// # Notes
/// - An empty seed answer clears the stored seed, making splits random again.
pub fn initialize_configuration() -> Result<()> {
    debug!("Initializing configuration process started.");

    let mut config: Config =
        confy::load(APP_NAME, CONFIG_NAME).context("Failed to load configuration")?;

    config.interval_seconds = Input::new()
        .with_prompt(format!(
            "Enter the sampling interval in seconds (current: {})",
            config.interval_seconds
        ))
        .default(config.interval_seconds)
        .interact()
        .unwrap_or(config.interval_seconds);

    config.min_frames = Input::new()
        .with_prompt(format!(
            "Enter the minimum number of frames per video (current: {})",
            config.min_frames
        ))
        .default(config.min_frames)
        .interact()
        .unwrap_or(config.min_frames);

    config.max_frames = Input::new()
        .with_prompt(format!(
            "Enter the maximum number of frames per video (current: {})",
            config.max_frames
        ))
        .default(config.max_frames)
        .interact()
        .unwrap_or(config.max_frames);

    config.video_extension = Input::new()
        .with_prompt(format!(
            "Enter the video extension to sample (current: {})",
            config.video_extension
        ))
        .default(config.video_extension.clone())
        .interact_text()
        .unwrap_or(config.video_extension.clone());

    config.frame_format = Input::new()
        .with_prompt(format!(
            "Enter the image format of extracted frames (current: {})",
            config.frame_format
        ))
        .default(config.frame_format.clone())
        .interact_text()
        .unwrap_or(config.frame_format.clone());

    config.split_ratio = Input::new()
        .with_prompt(format!(
            "Enter the split ratio (0.0 - 1.0, current: {})",
            config.split_ratio
        ))
        .default(config.split_ratio)
        .interact()
        .unwrap_or(config.split_ratio);

    config.image_extension = Input::new()
        .with_prompt(format!(
            "Enter the image extension collected by the splitter (current: {})",
            config.image_extension
        ))
        .default(config.image_extension.clone())
        .interact_text()
        .unwrap_or(config.image_extension.clone());

    let current_seed = config
        .split_seed
        .map(|seed| seed.to_string())
        .unwrap_or_default();
    let seed: String = Input::new()
        .with_prompt(format!(
            "Enter the split seed (current: {}) (leave empty for random splits)",
            if current_seed.is_empty() { "none" } else { current_seed.as_str() }
        ))
        .default(current_seed.clone())
        .allow_empty(true)
        .interact_text()
        .unwrap_or(current_seed);
    config.split_seed = seed.trim().parse::<u64>().ok();

    debug!("User input received for configuration.");

    confy::store(APP_NAME, CONFIG_NAME, &config).context("Failed to save configuration")?;

    debug!("Configuration saved successfully.");

    Ok(())
}

/// Loads the stored configuration, falling back to defaults when none can be read.
pub fn load_default_configuration() -> Result<Config> {
    debug!("Default configuration loading using confy...");

    match confy::load(APP_NAME, CONFIG_NAME) {
        Ok(config) => {
            debug!("Configuration successfully loaded.");
            Ok(config)
        }
        Err(err) => {
            warn!(
                "Failed to load configuration: {}. Using default configuration.",
                err
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_batch() {
        let config = Config::default();
        assert_eq!(config.interval_seconds, 0.1);
        assert_eq!(config.min_frames, 10);
        assert_eq!(config.max_frames, 400);
        assert_eq!(config.video_extension, "mp4");
        assert_eq!(config.split_ratio, 0.9);
        assert!(config.split_seed.is_none());
    }

    #[test]
    fn config_survives_serialization() {
        let config = Config {
            split_seed: Some(7),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
