use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub use dsp_modes::Modes;

// Define a trait that creates an output directory and returns its PathBuf.
pub trait ModeOutput {
    type Input;
    fn create_output_directory(&self, input: Self::Input) -> Result<PathBuf>;
}

// Enum to hold all the possible outputs.
pub enum Output {
    Sampler(SamplerOutput),
    Merger(MergerOutput),
    Splitter(SplitterOutput),
}

impl From<Modes> for Output {
    fn from(mode: Modes) -> Self {
        match mode {
            Modes::Sampler => Output::Sampler(SamplerOutput),
            Modes::Merger => Output::Merger(MergerOutput),
            Modes::Splitter => Output::Splitter(SplitterOutput),
        }
    }
}

/// Frame directory of one video: `<working_dir>/<video stem>`.
///
/// The directory is reused when it already exists so earlier frames are kept;
/// callers guarantee that video stems are unique within a batch.
pub struct SamplerOutput;
impl ModeOutput for SamplerOutput {
    // (working directory, video path)
    type Input = (PathBuf, PathBuf);

    fn create_output_directory(&self, input: Self::Input) -> Result<PathBuf> {
        let (working_dir, video_path) = input;
        let output_path = self.frame_directory(&working_dir, &video_path)?;
        ensure_directory(&output_path)?;
        Ok(output_path)
    }
}

impl SamplerOutput {
    /// Path of the frame directory without creating it.
    pub fn frame_directory(&self, working_dir: &Path, video_path: &Path) -> Result<PathBuf> {
        let stem = video_path
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| anyhow!("Video path has no base name: {:?}", video_path))?;
        Ok(working_dir.join(stem))
    }
}

/// Destination root of a merge. Existing content is kept so several merges accumulate.
pub struct MergerOutput;
impl ModeOutput for MergerOutput {
    type Input = PathBuf;

    fn create_output_directory(&self, input: Self::Input) -> Result<PathBuf> {
        ensure_directory(&input)?;
        Ok(input)
    }
}

/// One destination tree of a split, created under the source root.
pub struct SplitterOutput;
impl ModeOutput for SplitterOutput {
    // (source root, destination directory name)
    type Input = (PathBuf, String);

    fn create_output_directory(&self, input: Self::Input) -> Result<PathBuf> {
        let (root, name) = input;
        if name.is_empty() || Path::new(&name).components().count() != 1 {
            return Err(anyhow!("Invalid split destination name: {:?}", name));
        }
        let output_path = root.join(name);
        ensure_directory(&output_path)?;
        Ok(output_path)
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        debug!("Output directory exists, reusing it: {:?}", path);
        return Ok(());
    }
    debug!("Creating output directory: {:?}", path);
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory {:?}", path))
}
