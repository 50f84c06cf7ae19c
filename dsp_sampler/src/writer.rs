use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

use dsp_filenames::frame_file_name;

use crate::error::SamplerError;

/// Persists retained frames.
pub trait FrameWriter {
    /// Stores the frame decoded at `index` and returns where it went.
    fn write_frame(&mut self, index: u64, frame: &RgbImage) -> Result<PathBuf, SamplerError>;
}

/// Normalized extension (`".PNG"` becomes `"png"`) and encoder for a frame format.
///
/// # Returns
/// - `Err(SamplerError::InvalidConfig)` when the extension names no image format.
pub fn frame_image_format(extension: &str) -> Result<(String, ImageFormat), SamplerError> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    let format = ImageFormat::from_extension(&extension).ok_or_else(|| {
        SamplerError::InvalidConfig(format!("unsupported frame format {:?}", extension))
    })?;
    Ok((extension, format))
}

/// Writes `frame_<index>.<format>` image files into one directory.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    directory: PathBuf,
    extension: String,
    format: ImageFormat,
}

impl ImageWriter {
    /// # Returns
    /// - `Err(SamplerError::InvalidConfig)` when `extension` is not an image format
    ///   the encoder knows.
    pub fn new(directory: &Path, extension: &str) -> Result<Self, SamplerError> {
        let (extension, format) = frame_image_format(extension)?;
        Ok(Self {
            directory: directory.to_path_buf(),
            extension,
            format,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl FrameWriter for ImageWriter {
    fn write_frame(&mut self, index: u64, frame: &RgbImage) -> Result<PathBuf, SamplerError> {
        let path = self.directory.join(frame_file_name(index, &self.extension));
        frame
            .save_with_format(&path, self.format)
            .map_err(|source| SamplerError::FrameWrite {
                index,
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_frames_named_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ImageWriter::new(dir.path(), "jpg").unwrap();
        let frame = RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));

        let path = writer.write_frame(42, &frame).unwrap();

        assert_eq!(path, dir.path().join("frame_42.jpg"));
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn png_frames_are_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ImageWriter::new(dir.path(), ".PNG").unwrap();
        let frame = RgbImage::from_pixel(2, 3, image::Rgb([1, 2, 3]));

        let path = writer.write_frame(0, &frame).unwrap();

        assert_eq!(path.file_name().unwrap(), "frame_0.png");
        assert_eq!(image::open(&path).unwrap().to_rgb8(), frame);
    }

    #[test]
    fn frame_formats_are_normalized() {
        assert_eq!(
            frame_image_format(".JPEG").unwrap(),
            ("jpeg".to_string(), ImageFormat::Jpeg)
        );
        assert!(frame_image_format("mp4").is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageWriter::new(dir.path(), "mp4"),
            Err(SamplerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ImageWriter::new(&dir.path().join("gone"), "png").unwrap();
        let frame = RgbImage::new(1, 1);
        assert!(matches!(
            writer.write_frame(3, &frame),
            Err(SamplerError::FrameWrite { index: 3, .. })
        ));
    }
}
