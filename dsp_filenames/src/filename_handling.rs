use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FilenameError {
    #[error("Path {0:?} has no usable file name")]
    MissingFileName(PathBuf),

    #[error("Path {0:?} has no parent directory name")]
    MissingParent(PathBuf),
}

/// How an extension is compared against a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMatching {
    Sensitive,
    Insensitive,
}

/// Name of a sampled frame, unique per frame index: `frame_<index>.<format>`.
pub fn frame_file_name(index: u64, format: &str) -> String {
    format!("frame_{}.{}", index, format)
}

/// Collision-free name for a copied image: `<label>_<uuid v4>.<extension>`.
pub fn unique_label_name(label: &str, extension: &str) -> String {
    format!("{}_{}.{}", label, Uuid::new_v4(), extension)
}

/// `<parent dir name>_<file name>` for an image found below a class directory.
pub fn prefixed_file_name(image: &Path) -> Result<String, FilenameError> {
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FilenameError::MissingFileName(image.to_path_buf()))?;
    let parent = image
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .ok_or_else(|| FilenameError::MissingParent(image.to_path_buf()))?;
    Ok(format!("{}_{}", parent, file_name))
}

/// True when the file name ends with `.<extension>`.
///
/// The match is done on the whole file name, so `clip.MP4` does not match `mp4`
/// under [`CaseMatching::Sensitive`].
pub fn has_extension(path: &Path, extension: &str, matching: CaseMatching) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    match matching {
        CaseMatching::Sensitive => file_name.ends_with(&suffix),
        CaseMatching::Insensitive => file_name
            .to_lowercase()
            .ends_with(&suffix.to_lowercase()),
    }
}

/// Extension of `path`, or `fallback` when it has none.
pub fn extension_or(path: &Path, fallback: &str) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// First path in `dir` named `name` that does not exist yet.
///
/// A taken name gets `_1`, `_2`, ... inserted before its extension.
pub fn available_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1u32;
    loop {
        let renamed = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(&renamed);
        if !candidate.exists() {
            debug!("{:?} is taken, using {:?}", name, renamed);
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn frame_names_encode_the_index() {
        assert_eq!(frame_file_name(0, "jpg"), "frame_0.jpg");
        assert_eq!(frame_file_name(399, "png"), "frame_399.png");
    }

    #[test]
    fn label_names_are_unique() {
        let a = unique_label_name("durum", "jpg");
        let b = unique_label_name("durum", "jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("durum_"));
        assert!(a.ends_with(".jpg"));
        // label + '_' + 36 char uuid + ".jpg"
        assert_eq!(a.len(), "durum_".len() + 36 + 4);
    }

    #[test]
    fn prefix_comes_from_parent_directory() {
        let name = prefixed_file_name(Path::new("bread/rye/img01.jpg")).unwrap();
        assert_eq!(name, "rye_img01.jpg");
        assert!(prefixed_file_name(Path::new("img01.jpg")).is_err());
    }

    #[test]
    fn extension_matching_respects_case_policy() {
        let upper = Path::new("dir/clip.MP4");
        assert!(!has_extension(upper, "mp4", CaseMatching::Sensitive));
        assert!(has_extension(upper, "mp4", CaseMatching::Insensitive));
        assert!(has_extension(Path::new("clip.mp4"), ".mp4", CaseMatching::Sensitive));
        assert!(!has_extension(Path::new("clip.mp4.txt"), "mp4", CaseMatching::Sensitive));
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(extension_or(Path::new("a/b.png"), "jpg"), "png");
        assert_eq!(extension_or(Path::new("a/b"), "jpg"), "jpg");
    }

    #[test]
    fn taken_destinations_get_a_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(available_destination(dir.path(), "a_x.jpg"), dir.path().join("a_x.jpg"));

        fs::write(dir.path().join("a_x.jpg"), b"1").unwrap();
        fs::write(dir.path().join("a_x_1.jpg"), b"2").unwrap();
        assert_eq!(
            available_destination(dir.path(), "a_x.jpg"),
            dir.path().join("a_x_2.jpg")
        );
    }
}
