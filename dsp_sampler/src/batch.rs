use anyhow::Context;
use console::style;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use dsp_filenames::{has_extension, CaseMatching};

use crate::error::SamplerError;
use crate::sample::{SamplingConfig, SamplingStatus};
use crate::sampler::{Sampler, SamplingResult};
use crate::source::{FfmpegSource, FrameSource};
use crate::writer::frame_image_format;

/// Regular files in `dir` whose name ends with `.<extension>`, sorted by name.
///
/// The suffix match is case-sensitive: `clip.MP4` is not picked up for `mp4`.
pub fn discover_videos(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut videos: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read video directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_extension(path, extension, CaseMatching::Sensitive))
        .collect();
    videos.sort();

    debug!("Found {} .{} videos in {:?}", videos.len(), extension, dir);
    Ok(videos)
}

#[derive(Debug)]
pub enum VideoOutcome {
    Sampled(SamplingResult),
    Failed(SamplerError),
}

#[derive(Debug)]
pub struct VideoReport {
    pub video: PathBuf,
    pub outcome: VideoOutcome,
}

impl VideoReport {
    /// One human-readable line: status plus counts.
    pub fn summary(&self) -> String {
        match &self.outcome {
            VideoOutcome::Sampled(result) if result.is_sufficient() => format!(
                "Frames extracted successfully from {}: {}",
                self.video.display(),
                result.extracted()
            ),
            VideoOutcome::Sampled(result) => format!(
                "Extracted frames from {} ({}) are fewer than the required minimum ({})",
                self.video.display(),
                result.extracted(),
                result.min_frames
            ),
            VideoOutcome::Failed(e) if e.is_unreadable() => {
                format!("Could not open video {}: {}", self.video.display(), e)
            }
            VideoOutcome::Failed(e) => {
                format!("Sampling {} failed: {}", self.video.display(), e)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<VideoReport>,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn sufficient(&self) -> usize {
        self.count_status(SamplingStatus::Sufficient)
    }

    pub fn insufficient(&self) -> usize {
        self.count_status(SamplingStatus::Insufficient)
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, VideoOutcome::Failed(_)))
            .count()
    }

    pub fn total_frames(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                VideoOutcome::Sampled(result) => Some(result.extracted()),
                VideoOutcome::Failed(_) => None,
            })
            .sum()
    }

    fn count_status(&self, status: SamplingStatus) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                matches!(&entry.outcome, VideoOutcome::Sampled(result) if result.status == status)
            })
            .count()
    }
}

/// Samples every video with `ffmpeg`. See [`run_batch_with`].
pub fn run_batch(
    videos: &[PathBuf],
    working_dir: &Path,
    config: &SamplingConfig,
    frame_format: &str,
    running: &AtomicBool,
) -> Result<BatchReport, SamplerError> {
    run_batch_with(
        videos,
        working_dir,
        config,
        frame_format,
        running,
        FfmpegSource::open,
    )
}

/// Samples the videos one after the other.
///
/// An unknown frame format, or two videos sharing a base name (it names the
/// frame directory), rejects the whole batch before anything runs. A video
/// that cannot be opened or whose frames cannot be written is recorded as
/// failed and the batch moves on. Once `running` is cleared no further video is
/// started.
pub fn run_batch_with<S, F>(
    videos: &[PathBuf],
    working_dir: &Path,
    config: &SamplingConfig,
    frame_format: &str,
    running: &AtomicBool,
    mut open: F,
) -> Result<BatchReport, SamplerError>
where
    S: FrameSource,
    F: FnMut(&Path) -> Result<S, SamplerError>,
{
    frame_image_format(frame_format)?;
    ensure_unique_base_names(videos)?;

    let mut report = BatchReport::default();
    for (position, video) in videos.iter().enumerate() {
        if !running.load(Ordering::SeqCst) {
            warn!(
                "Interrupted, skipping the remaining {} videos",
                videos.len() - position
            );
            report.interrupted = true;
            break;
        }

        info!(
            "{} {}",
            style(format!("[{}/{}]", position + 1, videos.len())).cyan(),
            video.display()
        );
        let sampler = Sampler::new(video.clone(), working_dir, *config, frame_format);
        let outcome = match sampler.sample_video_with(&mut open, running) {
            Ok(result) => {
                report.interrupted |= result.interrupted;
                VideoOutcome::Sampled(result)
            }
            Err(e) => VideoOutcome::Failed(e),
        };

        let entry = VideoReport {
            video: video.clone(),
            outcome,
        };
        match &entry.outcome {
            VideoOutcome::Sampled(result) if result.is_sufficient() => info!("{}", entry.summary()),
            _ => warn!("{}", entry.summary()),
        }
        report.entries.push(entry);
    }

    Ok(report)
}

fn ensure_unique_base_names(videos: &[PathBuf]) -> Result<(), SamplerError> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for video in videos {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(first) = seen.insert(stem.clone(), video) {
            return Err(SamplerError::DuplicateBaseName {
                stem,
                first: first.clone(),
                second: video.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn discovery_is_a_case_sensitive_suffix_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp4");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "c.MP4");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "d.mp4.part");
        fs::create_dir(dir.path().join("folder.mp4")).unwrap();

        let videos = discover_videos(dir.path(), "mp4").unwrap();

        assert_eq!(
            videos,
            vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")]
        );
    }

    #[test]
    fn duplicate_base_names_are_rejected() {
        let videos = vec![PathBuf::from("x/clip.mp4"), PathBuf::from("y/clip.mp4")];
        let err = ensure_unique_base_names(&videos).unwrap_err();
        assert!(matches!(err, SamplerError::DuplicateBaseName { ref stem, .. } if stem == "clip"));
    }

    #[test]
    fn unknown_frame_format_rejects_the_batch() {
        let work = tempfile::tempdir().unwrap();
        let videos = vec![work.path().join("a.mp4"), work.path().join("b.mp4")];
        let config = SamplingConfig::new(0.1, 1, 5).unwrap();
        let mut opened = 0;

        let err = run_batch_with(
            &videos,
            work.path(),
            &config,
            "mp4",
            &AtomicBool::new(true),
            |_: &Path| {
                opened += 1;
                Ok(FakeSource::new(Some(30.0), 30))
            },
        )
        .unwrap_err();

        assert!(matches!(err, SamplerError::InvalidConfig(_)));
        assert_eq!(opened, 0);
        assert!(!work.path().join("a").exists());
        assert!(!work.path().join("b").exists());
    }

    #[test]
    fn unreadable_video_does_not_stop_the_batch() {
        let work = tempfile::tempdir().unwrap();
        let videos = vec![
            work.path().join("a.mp4"),
            work.path().join("corrupt.mp4"),
            work.path().join("short.mp4"),
        ];
        let config = SamplingConfig::new(0.1, 5, 20).unwrap();

        let report = run_batch_with(
            &videos,
            work.path(),
            &config,
            "jpg",
            &AtomicBool::new(true),
            |path: &Path| match path.file_stem().and_then(|s| s.to_str()) {
                Some("corrupt") => Err(SamplerError::SourceUnreadable {
                    path: path.to_path_buf(),
                    reason: "invalid data found when processing input".to_string(),
                }),
                Some("short") => Ok(FakeSource::new(Some(30.0), 9)),
                _ => Ok(FakeSource::new(Some(30.0), 300)),
            },
        )
        .unwrap();

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.sufficient(), 1);
        assert_eq!(report.insufficient(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total_frames(), 20 + 3);
        assert!(!work.path().join("corrupt").exists());
        assert!(report.entries[1].summary().starts_with("Could not open video"));
        assert!(report.entries[2].summary().contains("(3)"));
        assert!(!report.interrupted);
    }

    #[test]
    fn cleared_flag_skips_remaining_videos() {
        let work = tempfile::tempdir().unwrap();
        let videos = vec![work.path().join("a.mp4"), work.path().join("b.mp4")];
        let config = SamplingConfig::new(0.1, 1, 5).unwrap();

        let report = run_batch_with(
            &videos,
            work.path(),
            &config,
            "jpg",
            &AtomicBool::new(false),
            |_: &Path| Ok(FakeSource::new(Some(30.0), 30)),
        )
        .unwrap();

        assert!(report.interrupted);
        assert!(report.entries.is_empty());
    }
}
