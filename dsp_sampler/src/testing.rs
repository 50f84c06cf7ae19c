use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SamplerError;
use crate::source::{FrameSource, VideoMetadata};
use crate::writer::FrameWriter;

/// In-memory video: `total` 1x1 frames whose red channel holds the low byte of the index.
pub struct FakeSource {
    pub metadata: VideoMetadata,
    pub total: u64,
    pub fail_at: Option<u64>,
    pub next: u64,
    pub released: Arc<AtomicBool>,
}

impl FakeSource {
    pub fn new(frame_rate: Option<f64>, total: u64) -> Self {
        Self {
            metadata: VideoMetadata {
                frame_rate,
                frame_count: total,
                width: 1,
                height: 1,
            },
            total,
            fail_at: None,
            next: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl FrameSource for FakeSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SamplerError> {
        if Some(self.next) == self.fail_at {
            return Err(SamplerError::Decode {
                path: PathBuf::from("fake.mp4"),
                index: self.next,
                reason: "corrupt packet".to_string(),
            });
        }
        if self.next >= self.total {
            return Ok(None);
        }
        let frame = RgbImage::from_pixel(1, 1, Rgb([self.next as u8, 0, 0]));
        self.next += 1;
        Ok(Some(frame))
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Remembers the indices it was asked to write.
#[derive(Default)]
pub struct RecordingWriter {
    pub indices: Vec<u64>,
}

impl FrameWriter for RecordingWriter {
    fn write_frame(&mut self, index: u64, frame: &RgbImage) -> Result<PathBuf, SamplerError> {
        assert_eq!(frame.get_pixel(0, 0)[0], index as u8);
        self.indices.push(index);
        Ok(PathBuf::from(format!("frame_{}.jpg", index)))
    }
}
