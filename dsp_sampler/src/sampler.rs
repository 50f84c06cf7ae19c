use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use dsp_modes::Modes;
use dsp_output::ModeOutput;
use dsp_output::Output;

use crate::error::SamplerError;
use crate::sample::{sample_frames, ExtractedFrame, SamplingConfig, SamplingStatus};
use crate::source::{FfmpegSource, FrameSource};
use crate::writer::{frame_image_format, ImageWriter};

/// Samples one video into `<working_dir>/<video stem>`.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub video_path: PathBuf,
    pub working_dir: PathBuf,
    pub config: SamplingConfig,
    pub frame_format: String,
}

/// Report of one sampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingResult {
    pub video: PathBuf,
    pub output_dir: PathBuf,
    pub frame_rate: Option<f64>,
    pub step: u64,
    pub min_frames: u32,
    pub frames: Vec<ExtractedFrame>,
    pub status: SamplingStatus,
    pub interrupted: bool,
}

impl SamplingResult {
    pub fn extracted(&self) -> usize {
        self.frames.len()
    }

    pub fn is_sufficient(&self) -> bool {
        self.status == SamplingStatus::Sufficient
    }
}

impl Sampler {
    pub fn new(
        video_path: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        config: SamplingConfig,
        frame_format: &str,
    ) -> Self {
        Self {
            video_path: video_path.into(),
            working_dir: working_dir.into(),
            config,
            frame_format: frame_format.to_string(),
        }
    }

    /// Samples the video through an `ffmpeg` decoder.
    pub fn sample_video(&self, running: &AtomicBool) -> Result<SamplingResult, SamplerError> {
        self.sample_video_with(FfmpegSource::open, running)
    }

    /// Samples the video through the source returned by `open`.
    ///
    /// The frame format is checked and the source opened before anything
    /// touches the filesystem, so neither an unknown format nor an unreadable
    /// video leaves an output directory behind. The source is dropped,
    /// releasing its handle, on every return path.
    pub fn sample_video_with<S, F>(
        &self,
        open: F,
        running: &AtomicBool,
    ) -> Result<SamplingResult, SamplerError>
    where
        S: FrameSource,
        F: FnOnce(&Path) -> Result<S, SamplerError>,
    {
        debug!("Starting sample processing with arguments: {:?}", self);
        frame_image_format(&self.frame_format)?;

        let mut source = open(&self.video_path)?;
        let metadata = source.metadata();

        let output: Output = Modes::Sampler.into();
        let output_dir = match output {
            Output::Sampler(sampler_output) => sampler_output
                .create_output_directory((self.working_dir.clone(), self.video_path.clone()))
                .map_err(|e| SamplerError::OutputDirectory {
                    path: self.working_dir.clone(),
                    reason: format!("{:#}", e),
                })?,
            _ => unreachable!("Expected Sampler mode"),
        };
        debug!("Frames of {:?} go to {:?}", self.video_path, output_dir);

        let mut writer = ImageWriter::new(&output_dir, &self.frame_format)?;

        let pb = progress_bar(expected_frames(
            metadata.frame_count,
            metadata.frame_rate,
            &self.config,
        ));
        let outcome = sample_frames(&mut source, &mut writer, &self.config, running, &pb);
        pb.finish_and_clear();
        drop(source);
        let outcome = outcome?;

        Ok(SamplingResult {
            video: self.video_path.clone(),
            output_dir,
            frame_rate: metadata.frame_rate,
            step: outcome.step,
            min_frames: self.config.min_frames(),
            frames: outcome.frames,
            status: outcome.status,
            interrupted: outcome.interrupted,
        })
    }
}

/// Upper bound of frames the run can produce, for the progress bar length.
fn expected_frames(frame_count: u64, frame_rate: Option<f64>, config: &SamplingConfig) -> u64 {
    let cap = config.max_frames() as u64;
    if frame_count == 0 {
        return cap;
    }
    let step = crate::sample::frame_step(frame_rate, config.interval_seconds());
    cap.min((frame_count - 1) / step + 1)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style);
    }
    pb
}
