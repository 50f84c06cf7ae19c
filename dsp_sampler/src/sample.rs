use indicatif::ProgressBar;
use log::{debug, trace, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SamplerError;
use crate::source::FrameSource;
use crate::writer::FrameWriter;

/// Sampling constraints for one video. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    interval_seconds: f64,
    min_frames: u32,
    max_frames: u32,
}

impl SamplingConfig {
    /// # Returns
    /// - `Err(SamplerError::InvalidConfig)` unless `interval_seconds` is a positive
    ///   finite number and `1 <= max_frames` and `min_frames <= max_frames`.
    pub fn new(interval_seconds: f64, min_frames: u32, max_frames: u32) -> Result<Self, SamplerError> {
        if !(interval_seconds.is_finite() && interval_seconds > 0.0) {
            return Err(SamplerError::InvalidConfig(format!(
                "interval must be a positive number of seconds, got {}",
                interval_seconds
            )));
        }
        if max_frames == 0 {
            return Err(SamplerError::InvalidConfig(
                "maximum number of frames must be at least 1".to_string(),
            ));
        }
        if min_frames > max_frames {
            return Err(SamplerError::InvalidConfig(format!(
                "minimum number of frames ({}) exceeds the maximum ({})",
                min_frames, max_frames
            )));
        }
        Ok(Self {
            interval_seconds,
            min_frames,
            max_frames,
        })
    }

    pub fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    pub fn min_frames(&self) -> u32 {
        self.min_frames
    }

    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStatus {
    Sufficient,
    Insufficient,
}

impl SamplingStatus {
    pub fn from_count(extracted: usize, min_frames: u32) -> Self {
        if extracted < min_frames as usize {
            SamplingStatus::Insufficient
        } else {
            SamplingStatus::Sufficient
        }
    }
}

/// A persisted frame and the decode index it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    pub index: u64,
    pub path: PathBuf,
}

/// What one pass over a frame source produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOutcome {
    pub step: u64,
    pub frames: Vec<ExtractedFrame>,
    pub status: SamplingStatus,
    pub interrupted: bool,
}

/// Number of decoded frames between two retained frames.
///
/// `round(frame_rate * interval_seconds)`, never below 1. A missing, zero,
/// negative or non-finite frame rate yields 1, i.e. every decoded frame is kept.
pub fn frame_step(frame_rate: Option<f64>, interval_seconds: f64) -> u64 {
    let rate = match frame_rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => rate,
        other => {
            warn!(
                "Frame rate {:?} is unavailable, sampling every decoded frame",
                other
            );
            return 1;
        }
    };
    let step = (rate * interval_seconds).round();
    if step.is_finite() && step >= 1.0 {
        // `as` saturates absurdly large steps at u64::MAX
        step as u64
    } else {
        1
    }
}

/// Decodes `source` from index 0 and writes every frame whose index is a
/// multiple of the frame step.
///
/// Decoding stops as soon as `max_frames` frames are written, the stream ends,
/// a frame fails to decode, or `running` is cleared. Frames already written are
/// never removed, whatever the resulting status.
///
/// # Returns
/// - `Err(SamplerError::FrameWrite)` when a frame cannot be persisted; frames
///   written before it stay on disk.
pub fn sample_frames<S, W>(
    source: &mut S,
    writer: &mut W,
    config: &SamplingConfig,
    running: &AtomicBool,
    progress: &ProgressBar,
) -> Result<SamplingOutcome, SamplerError>
where
    S: FrameSource + ?Sized,
    W: FrameWriter + ?Sized,
{
    let metadata = source.metadata();
    let step = frame_step(metadata.frame_rate, config.interval_seconds);
    let max_frames = config.max_frames as usize;
    debug!(
        "Sampling every {} frames (rate {:?}, interval {} s), at most {}",
        step, metadata.frame_rate, config.interval_seconds, max_frames
    );

    let mut frames = Vec::new();
    let mut current_frame: u64 = 0;
    let mut interrupted = false;

    while frames.len() < max_frames {
        if !running.load(Ordering::SeqCst) {
            debug!("Interrupted at frame {}", current_frame);
            interrupted = true;
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("End of stream after {} frames", current_frame);
                break;
            }
            Err(e) => {
                warn!("{}; treating it as the end of the stream", e);
                break;
            }
        };

        if current_frame % step == 0 {
            let path = writer.write_frame(current_frame, &frame)?;
            trace!("Saved frame {} to {:?}", current_frame, path);
            frames.push(ExtractedFrame {
                index: current_frame,
                path,
            });
            progress.inc(1);
        }

        current_frame += 1;
    }

    let status = SamplingStatus::from_count(frames.len(), config.min_frames);
    Ok(SamplingOutcome {
        step,
        frames,
        status,
        interrupted,
    })
}
