use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use dsp_filenames::{extension_or, unique_label_name};

/// Counts of one or more merged trees.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Files copied into the destination.
    pub copied: usize,
    /// Distinct `coarse` and `coarse/fine` class paths that received files.
    pub classes: BTreeSet<String>,
}

impl MergeReport {
    pub(crate) fn absorb(&mut self, other: MergeReport) {
        self.copied += other.copied;
        self.classes.extend(other.classes);
    }
}

/// Copies one labeled tree into `destination`.
///
/// For each coarse class directory `C` of `source`:
/// - a sub-directory `F` is a fine class; its regular files land in
///   `destination/C/F/<F>_<uuid>.<ext>` (deeper directories are not followed);
/// - a regular file lands in `destination/C/<C>_<uuid>.<ext>`.
///
/// Non-directory entries at the root of `source` are skipped.
pub fn merge_tree(source: &Path, destination: &Path, default_extension: &str) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    let coarse_classes = sorted_entries(source)?;
    let pb = ProgressBar::new(coarse_classes.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style);
    }

    for coarse_path in coarse_classes {
        if !coarse_path.is_dir() {
            warn!("Skipping {:?}: not a class directory", coarse_path);
            pb.inc(1);
            continue;
        }
        let coarse = class_name(&coarse_path)?;
        pb.set_message(coarse.clone());
        let dest_coarse = destination.join(&coarse);
        fs::create_dir_all(&dest_coarse)
            .with_context(|| format!("Failed to create {:?}", dest_coarse))?;

        for entry in sorted_entries(&coarse_path)? {
            if entry.is_dir() {
                let fine = class_name(&entry)?;
                let dest_fine = dest_coarse.join(&fine);
                fs::create_dir_all(&dest_fine)
                    .with_context(|| format!("Failed to create {:?}", dest_fine))?;

                for file in sorted_entries(&entry)? {
                    if !file.is_file() {
                        debug!("Not following nested entry {:?}", file);
                        continue;
                    }
                    copy_labeled(&file, &dest_fine, &fine, default_extension)?;
                    report.copied += 1;
                    report.classes.insert(format!("{}/{}", coarse, fine));
                }
            } else if entry.is_file() {
                copy_labeled(&entry, &dest_coarse, &coarse, default_extension)?;
                report.copied += 1;
                report.classes.insert(coarse.clone());
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    debug!("Copied {} files from {:?}", report.copied, source);
    Ok(report)
}

fn copy_labeled(file: &Path, dest_dir: &Path, label: &str, default_extension: &str) -> Result<PathBuf> {
    let extension = extension_or(file, default_extension);
    let dest_file = dest_dir.join(unique_label_name(label, &extension));
    fs::copy(file, &dest_file)
        .with_context(|| format!("Failed to copy {:?} to {:?}", file, dest_file))?;
    Ok(dest_file)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

fn class_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Class directory {:?} has no name", dir))
}
