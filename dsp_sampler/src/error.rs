use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Cannot open video {path:?}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Decoding {path:?} failed at frame {index}: {reason}")]
    Decode {
        path: PathBuf,
        index: u64,
        reason: String,
    },

    #[error("Invalid sampling configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to prepare output directory {path:?}: {reason}")]
    OutputDirectory { path: PathBuf, reason: String },

    #[error("Failed to write frame {index} to {path:?}: {source}")]
    FrameWrite {
        index: u64,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Videos {first:?} and {second:?} share the base name {stem:?}")]
    DuplicateBaseName {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl SamplerError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SamplerError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the failure class a batch skips over: the video could not be opened.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, SamplerError::SourceUnreadable { .. })
    }
}
