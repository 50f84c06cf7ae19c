mod batch;
mod error;
mod sample;
mod sampler;
mod source;
mod writer;

#[cfg(test)]
mod testing;

pub use batch::{discover_videos, run_batch, run_batch_with, BatchReport, VideoOutcome, VideoReport};
pub use error::SamplerError;
pub use sample::{
    frame_step, sample_frames, ExtractedFrame, SamplingConfig, SamplingOutcome, SamplingStatus,
};
pub use sampler::{Sampler, SamplingResult};
pub use source::{FfmpegSource, FrameSource, VideoMetadata};
pub use writer::{frame_image_format, FrameWriter, ImageWriter};
