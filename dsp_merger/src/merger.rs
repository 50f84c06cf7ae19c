use anyhow::{anyhow, Context, Result};
use log::debug;
use std::path::PathBuf;

use dsp_modes::Modes;
use dsp_output::ModeOutput;
use dsp_output::Output;

use crate::merge::{merge_tree, MergeReport};

/// Copies coarse/fine labeled trees into one destination tree.
#[derive(Debug)]
pub struct TreeMerger {
    sources: Vec<PathBuf>,
    destination: PathBuf,
    default_extension: String,
}

impl TreeMerger {
    /// Creates a merger and its destination directory.
    ///
    /// # Parameters
    /// - `sources`: labeled trees to merge, each `<coarse>/<fine>/<image>` or `<coarse>/<image>`.
    /// - `destination`: root of the merged tree; existing content is kept.
    /// - `default_extension`: extension given to copied files that have none.
    pub fn new(
        sources: Vec<PathBuf>,
        destination: PathBuf,
        default_extension: &str,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(anyhow!("At least one source tree is required"));
        }
        for source in &sources {
            if !source.is_dir() {
                return Err(anyhow!("Source tree is not a directory: {:?}", source));
            }
            if destination.starts_with(source) {
                return Err(anyhow!(
                    "Destination {:?} lies inside source tree {:?}",
                    destination,
                    source
                ));
            }
        }

        let output: Output = Modes::Merger.into();
        let destination = match output {
            Output::Merger(merger_output) => merger_output
                .create_output_directory(destination)
                .context("Failed to create merge destination")?,
            _ => unreachable!("Expected Merger mode"),
        };

        Ok(Self {
            sources,
            destination,
            default_extension: default_extension.trim_start_matches('.').to_string(),
        })
    }

    /// Merges every source tree in order and returns the accumulated counts.
    pub fn merge(&self) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        for source in &self.sources {
            debug!("Merging {:?} into {:?}", source, self.destination);
            let tree_report = merge_tree(source, &self.destination, &self.default_extension)
                .with_context(|| format!("Failed to merge {:?}", source))?;
            report.absorb(tree_report);
        }
        Ok(report)
    }

    pub fn destination(&self) -> &PathBuf {
        &self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn requires_existing_sources() {
        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("merged");
        assert!(TreeMerger::new(vec![], dest.clone(), "jpg").is_err());
        assert!(TreeMerger::new(vec![root.path().join("missing")], dest.clone(), "jpg").is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn rejects_destination_inside_a_source() {
        let root = tempfile::tempdir().unwrap();
        let train = root.path().join("train");
        fs::create_dir(&train).unwrap();
        assert!(TreeMerger::new(vec![train.clone()], train.join("merged"), "jpg").is_err());
    }

    #[test]
    fn merges_train_and_val_into_one_tree() {
        let root = tempfile::tempdir().unwrap();
        for split in ["train", "val"] {
            let fine = root.path().join(split).join("bread").join("durum");
            fs::create_dir_all(&fine).unwrap();
            fs::write(fine.join("img.jpg"), split.as_bytes()).unwrap();
        }

        let merger = TreeMerger::new(
            vec![root.path().join("train"), root.path().join("val")],
            root.path().join("train_val"),
            "jpg",
        )
        .unwrap();
        let report = merger.merge().unwrap();

        assert_eq!(report.copied, 2);
        let merged = root.path().join("train_val").join("bread").join("durum");
        let mut contents: Vec<Vec<u8>> = fs::read_dir(&merged)
            .unwrap()
            .map(|e| fs::read(e.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec![b"train".to_vec(), b"val".to_vec()]);
    }
}
