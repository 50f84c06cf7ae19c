use anyhow::{Context, Result};
use log::debug;
use std::env;
use std::path::PathBuf;

use crate::literals::DSPREP_WORKDIR;

/// Enum to represent the source of the working directory
enum WorkdirSource {
    CliArgument(String),
    EnvVar(String),
    Default,
}

/// Retrieves the directory the sampler scans for videos and writes frame folders into.
///
/// Checked in the order CLI argument, `DSPREP_WORKDIR`, current directory.
pub fn get_working_dir(cli_dir: Option<String>) -> Result<PathBuf> {
    debug!("Determining working directory...");

    let source = if let Some(dir) = cli_dir {
        debug!("Using working directory provided via CLI argument: {}", dir);
        WorkdirSource::CliArgument(dir)
    } else if let Ok(dir) = env::var(DSPREP_WORKDIR) {
        debug!(
            "Using working directory from environment variable {}: {}",
            DSPREP_WORKDIR, dir
        );
        WorkdirSource::EnvVar(dir)
    } else {
        debug!("No working directory provided. Defaulting to current directory.");
        WorkdirSource::Default
    };

    let working_dir = match source {
        WorkdirSource::CliArgument(ref path) | WorkdirSource::EnvVar(ref path) => {
            PathBuf::from(path)
        }
        WorkdirSource::Default => env::current_dir().context("Failed to get current directory")?,
    };

    debug!("Resolved working directory: {:?}", working_dir);
    Ok(working_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_directory_is_used_verbatim() {
        let dir = get_working_dir(Some("/tmp/videos".to_string())).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/videos"));
    }
}
