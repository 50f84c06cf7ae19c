use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use dsp_filenames::{available_destination, has_extension, prefixed_file_name, CaseMatching};

/// Every image below `class_dir` (any depth) whose name ends with `.<extension>`,
/// compared case-insensitively. Sorted by path so a seeded shuffle is reproducible.
pub fn collect_class_images(class_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(class_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", class_dir))?;
        if entry.file_type().is_file()
            && has_extension(entry.path(), extension, CaseMatching::Insensitive)
        {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// Number of images that go to the first destination: `floor(len * ratio)`.
pub fn split_point(len: usize, ratio: f64) -> usize {
    ((len as f64 * ratio).floor() as usize).min(len)
}

/// Copies `images` into `dest_dir` as `<parent dir name>_<file name>`.
///
/// A name that is already taken gets a numeric suffix, so no image is dropped.
pub(crate) fn copy_images(images: &[PathBuf], dest_dir: &Path, pb: &ProgressBar) -> Result<usize> {
    for image in images {
        let name = prefixed_file_name(image)
            .with_context(|| format!("Cannot name copy of {:?}", image))?;
        let destination = available_destination(dest_dir, &name);
        fs::copy(image, &destination)
            .with_context(|| format!("Failed to copy {:?} to {:?}", image, destination))?;
        debug!("Copied {:?} to {:?}", image, destination);
        pb.inc(1);
    }
    Ok(images.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_point_floors() {
        assert_eq!(split_point(10, 0.9), 9);
        assert_eq!(split_point(7, 0.9), 6);
        assert_eq!(split_point(1, 0.9), 0);
        assert_eq!(split_point(0, 0.5), 0);
        assert_eq!(split_point(3, 0.5), 1);
    }

    #[test]
    fn collects_images_recursively_ignoring_case() {
        let root = tempfile::tempdir().unwrap();
        let class = root.path().join("bread");
        fs::create_dir_all(class.join("rye").join("deep")).unwrap();
        fs::write(class.join("top.JPG"), b"").unwrap();
        fs::write(class.join("rye").join("a.jpg"), b"").unwrap();
        fs::write(class.join("rye").join("deep").join("b.jpg"), b"").unwrap();
        fs::write(class.join("rye").join("c.png"), b"").unwrap();

        let images = collect_class_images(&class, "jpg").unwrap();

        assert_eq!(
            images,
            vec![
                class.join("rye").join("a.jpg"),
                class.join("rye").join("deep").join("b.jpg"),
                class.join("top.JPG"),
            ]
        );
    }

    #[test]
    fn copies_use_parent_prefix_and_never_overwrite() {
        let root = tempfile::tempdir().unwrap();
        let a = root.path().join("src").join("rye");
        let b = root.path().join("src").join("other").join("rye");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("x.jpg"), b"a").unwrap();
        fs::write(b.join("x.jpg"), b"b").unwrap();
        let dest = root.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let copied = copy_images(
            &[a.join("x.jpg"), b.join("x.jpg")],
            &dest,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(dest.join("rye_x.jpg")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("rye_x_1.jpg")).unwrap(), b"b");
    }
}
