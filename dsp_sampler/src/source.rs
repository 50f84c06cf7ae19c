use image::RgbImage;
use log::{debug, warn};
use serde::Deserialize;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command as ShellCommand, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::SamplerError;

/// Stream properties reported by the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    /// Decoded frames per second, `None` when missing or degenerate (`0/0`).
    pub frame_rate: Option<f64>,
    /// Frame count advertised by the container, 0 when unknown.
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
}

/// A video opened for sequential decoding.
///
/// Frames come out in decode order starting at index 0. Dropping the source
/// releases whatever handle backs it.
pub trait FrameSource {
    fn metadata(&self) -> VideoMetadata;

    /// Next decoded frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SamplerError>;
}

/// Decodes the first video stream of a file through an `ffmpeg` child process.
///
/// `ffprobe` supplies the metadata, then `ffmpeg` writes raw RGB24 frames to a
/// pipe without dropping or duplicating any (passthrough frame timing). The
/// first frame is decoded while opening, so a stream `ffmpeg` cannot decode is
/// reported as unreadable rather than as an empty video.
pub struct FfmpegSource {
    path: PathBuf,
    metadata: VideoMetadata,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frame_len: usize,
    pending: Option<RgbImage>,
    finished: bool,
    decoded: u64,
}

impl FfmpegSource {
    /// Opens `path` for decoding.
    ///
    /// # Returns
    /// - `Err(SamplerError::SourceUnreadable)` when the file is missing, cannot be
    ///   probed, has no video stream, `ffmpeg` cannot be started, or `ffmpeg`
    ///   fails before producing a frame.
    pub fn open(path: &Path) -> Result<Self, SamplerError> {
        if !path.is_file() {
            return Err(SamplerError::unreadable(path, "file does not exist"));
        }

        let metadata = probe(path)?;
        debug!("Probed {:?}: {:?}", path, metadata);

        let mut command = ShellCommand::new("ffmpeg");
        command
            .args(["-v", "error"])
            .arg("-nostdin")
            .arg("-i")
            .arg(path)
            .args(["-map", "0:v:0"])
            .args(["-fps_mode", "passthrough"])
            .args(["-f", "rawvideo"])
            .args(["-pix_fmt", "rgb24"])
            .arg("-");

        Self::start(path, metadata, command)
    }

    /// Spawns `decoder`, which must write `metadata`-sized RGB24 frames to
    /// stdout, and reads ahead the first frame.
    fn start(
        path: &Path,
        metadata: VideoMetadata,
        mut decoder: ShellCommand,
    ) -> Result<Self, SamplerError> {
        let frame_len = metadata.width as usize * metadata.height as usize * 3;

        let mut child = decoder
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SamplerError::unreadable(path, format!("failed to start ffmpeg: {}", e)))?;

        debug!("FFmpeg decoder spawned with PID: {:?}", child.id());

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SamplerError::unreadable(path, "ffmpeg pipes unavailable"));
            }
        };

        // a full stderr pipe would stall the decoder
        let stderr = thread::spawn(move || {
            let mut text = String::new();
            if let Err(e) = BufReader::new(stderr).read_to_string(&mut text) {
                debug!("Stopped reading ffmpeg stderr: {}", e);
            }
            text
        });

        let mut source = Self {
            path: path.to_path_buf(),
            metadata,
            child,
            stdout: BufReader::with_capacity(frame_len.max(8192), stdout),
            stderr: Some(stderr),
            frame_len,
            pending: None,
            finished: false,
            decoded: 0,
        };

        match source.read_frame() {
            Ok(first) => {
                source.pending = first;
                Ok(source)
            }
            Err(SamplerError::Decode { reason, .. }) => Err(SamplerError::unreadable(path, reason)),
            Err(e) => Err(e),
        }
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, SamplerError> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finished = true;
                return self.finish().map(|()| None);
            }
            Err(e) => return Err(self.decode_error(e.to_string())),
        }

        let frame = RgbImage::from_raw(self.metadata.width, self.metadata.height, buffer)
            .ok_or_else(|| {
                self.decode_error("frame buffer does not match the stream dimensions")
            })?;
        self.decoded += 1;
        Ok(Some(frame))
    }

    /// Reaps the decoder once its output is exhausted; a failing exit status
    /// is a decode error carrying what `ffmpeg` printed.
    fn finish(&mut self) -> Result<(), SamplerError> {
        let status = self
            .child
            .wait()
            .map_err(|e| self.decode_error(format!("failed to wait for ffmpeg: {}", e)))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            debug!("FFmpeg decoder for {:?} finished after {} frames", self.path, self.decoded);
            return Ok(());
        }
        let stderr = stderr.trim();
        Err(self.decode_error(if stderr.is_empty() {
            format!("ffmpeg exited with {}", status)
        } else {
            format!("ffmpeg exited with {}: {}", status, stderr)
        }))
    }

    fn decode_error(&self, reason: impl ToString) -> SamplerError {
        SamplerError::Decode {
            path: self.path.clone(),
            index: self.decoded,
            reason: reason.to_string(),
        }
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SamplerError> {
        match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.read_frame(),
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            // The decoder may still be running when sampling stops at the frame cap.
            if let Err(e) = self.child.kill() {
                debug!("FFmpeg decoder for {:?} already exited: {}", self.path, e);
            }
            if let Err(e) = self.child.wait() {
                warn!("Failed to reap FFmpeg decoder for {:?}: {}", self.path, e);
            }
        }
        debug!("Released video {:?} after {} frames", self.path, self.decoded);
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
    #[serde(default)]
    nb_frames: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    #[serde(default)]
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    #[serde(default)]
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side_data| side_data.rotation)
            .or_else(|| {
                self.tags
                    .rotate
                    .as_deref()
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .unwrap_or(0.0)
    }
}

fn probe(path: &Path) -> Result<VideoMetadata, SamplerError> {
    let output = ShellCommand::new("ffprobe")
        .args(["-v", "error"])
        .args(["-select_streams", "v:0"])
        .args([
            "-show_entries",
            "stream=codec_type,r_frame_rate,avg_frame_rate,nb_frames,width,height\
             :stream_side_data=rotation:stream_tags=rotate",
        ])
        .args(["-of", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SamplerError::unreadable(path, format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(SamplerError::unreadable(
            path,
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    parse_probe(&output.stdout).map_err(|reason| SamplerError::unreadable(path, reason))
}

fn parse_probe(json: &[u8]) -> Result<VideoMetadata, String> {
    let probe: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| format!("unparseable ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
        .ok_or_else(|| "no video stream found".to_string())?;

    let coded_width = stream.width.unwrap_or(0);
    let coded_height = stream.height.unwrap_or(0);
    if coded_width == 0 || coded_height == 0 {
        return Err(format!(
            "video stream has no dimensions ({}x{})",
            coded_width, coded_height
        ));
    }

    // ffmpeg applies the display rotation, so quarter turns swap the decoded dimensions
    let (width, height) = match (stream.rotation().round() as i64).rem_euclid(180) {
        90 => (coded_height, coded_width),
        _ => (coded_width, coded_height),
    };

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(VideoMetadata {
        frame_rate,
        frame_count,
        width,
        height,
    })
}

/// Parses `"30000/1001"` or `"25"`; zero, negative and non-finite rates are `None`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.trim().split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
