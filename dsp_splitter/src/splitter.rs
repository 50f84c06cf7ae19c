use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use dsp_modes::Modes;
use dsp_output::ModeOutput;
use dsp_output::Output;

use crate::split::{collect_class_images, copy_images, split_point};

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Share of each class copied to `first_dir`, strictly between 0 and 1.
    pub ratio: f64,
    pub first_dir: String,
    pub second_dir: String,
    pub image_extension: String,
    /// Fixed seed for a reproducible shuffle; random when `None`.
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratio: 0.9,
            first_dir: String::from("train_val"),
            second_dir: String::from("test"),
            image_extension: String::from("jpg"),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSplit {
    pub class: String,
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub classes: Vec<ClassSplit>,
}

impl SplitReport {
    pub fn first_total(&self) -> usize {
        self.classes.iter().map(|c| c.first).sum()
    }

    pub fn second_total(&self) -> usize {
        self.classes.iter().map(|c| c.second).sum()
    }
}

/// Splits every class directory of a labeled tree into two destination trees.
#[derive(Debug)]
pub struct RatioSplitter {
    source_root: PathBuf,
    first_root: PathBuf,
    second_root: PathBuf,
    config: SplitConfig,
}

impl RatioSplitter {
    /// Validates `config` and creates both destination roots under `source_root`.
    pub fn new(source_root: PathBuf, config: SplitConfig) -> Result<Self> {
        if !(config.ratio > 0.0 && config.ratio < 1.0) {
            return Err(anyhow!(
                "Split ratio must be strictly between 0.0 and 1.0, got {}",
                config.ratio
            ));
        }
        if config.first_dir == config.second_dir {
            return Err(anyhow!(
                "Both split destinations are named {:?}",
                config.first_dir
            ));
        }
        if !source_root.is_dir() {
            return Err(anyhow!("Source tree is not a directory: {:?}", source_root));
        }

        let output: Output = Modes::Splitter.into();
        let (first_root, second_root) = match output {
            Output::Splitter(splitter_output) => (
                splitter_output
                    .create_output_directory((source_root.clone(), config.first_dir.clone()))
                    .context("Failed to create first split destination")?,
                splitter_output
                    .create_output_directory((source_root.clone(), config.second_dir.clone()))
                    .context("Failed to create second split destination")?,
            ),
            _ => unreachable!("Expected Splitter mode"),
        };

        Ok(Self {
            source_root,
            first_root,
            second_root,
            config,
        })
    }

    /// Shuffles and partitions each class.
    ///
    /// The first `floor(len * ratio)` shuffled images of a class go to the first
    /// destination, the remainder to the second.
    pub fn split(&self) -> Result<SplitReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let classes = self.class_directories()?;
        let mut report = SplitReport::default();

        for (class, class_dir) in classes {
            let mut images = collect_class_images(&class_dir, &self.config.image_extension)?;
            images.shuffle(&mut rng);
            let cut = split_point(images.len(), self.config.ratio);
            let (first, second) = images.split_at(cut);
            debug!(
                "Class {}: {} images, {} / {}",
                class,
                images.len(),
                first.len(),
                second.len()
            );

            let first_class_dir = self.first_root.join(&class);
            let second_class_dir = self.second_root.join(&class);
            fs::create_dir_all(&first_class_dir)
                .with_context(|| format!("Failed to create {:?}", first_class_dir))?;
            fs::create_dir_all(&second_class_dir)
                .with_context(|| format!("Failed to create {:?}", second_class_dir))?;

            let pb = ProgressBar::new(images.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                pb.set_style(style);
            }
            pb.set_message(class.clone());

            let first_count = copy_images(first, &first_class_dir, &pb)?;
            let second_count = copy_images(second, &second_class_dir, &pb)?;
            pb.finish_and_clear();

            info!(
                "{}: {} to {}, {} to {}",
                class, first_count, self.config.first_dir, second_count, self.config.second_dir
            );
            report.classes.push(ClassSplit {
                class,
                first: first_count,
                second: second_count,
            });
        }

        Ok(report)
    }

    /// Directories directly under the source root, minus the two destinations.
    fn class_directories(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut classes: Vec<(String, PathBuf)> = fs::read_dir(&self.source_root)
            .with_context(|| format!("Failed to read {:?}", self.source_root))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .filter(|(name, _)| *name != self.config.first_dir && *name != self.config.second_dir)
            .collect();
        classes.sort();
        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::Path;

    fn build_tree(root: &Path) {
        for (class, sub, count) in [("bread", "rye", 12), ("bread", "wheat", 8), ("pasta", "penne", 5)] {
            let dir = root.join(class).join(sub);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..count {
                fs::write(dir.join(format!("{:03}.jpg", i)), format!("{}/{}/{}", class, sub, i))
                    .unwrap();
            }
        }
        fs::write(root.join("bread").join("notes.txt"), b"skip").unwrap();
    }

    fn contents(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| fs::read_to_string(e.unwrap().path()).unwrap())
            .collect()
    }

    fn names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn seeded(seed: u64) -> SplitConfig {
        SplitConfig {
            seed: Some(seed),
            ..SplitConfig::default()
        }
    }

    #[test]
    fn partitions_every_class_without_overlap() {
        let root = tempfile::tempdir().unwrap();
        build_tree(root.path());

        let splitter = RatioSplitter::new(root.path().to_path_buf(), seeded(1)).unwrap();
        let report = splitter.split().unwrap();

        assert_eq!(
            report.classes,
            vec![
                ClassSplit { class: "bread".into(), first: 18, second: 2 },
                ClassSplit { class: "pasta".into(), first: 4, second: 1 },
            ]
        );

        let first = contents(&root.path().join("train_val").join("bread"));
        let second = contents(&root.path().join("test").join("bread"));
        assert!(first.is_disjoint(&second));
        assert_eq!(first.len() + second.len(), 20);
        assert!(names(&root.path().join("train_val").join("bread"))
            .iter()
            .all(|name| name.starts_with("rye_") || name.starts_with("wheat_")));
    }

    #[test]
    fn rerunning_skips_destination_directories() {
        let root = tempfile::tempdir().unwrap();
        build_tree(root.path());
        let splitter = RatioSplitter::new(root.path().to_path_buf(), seeded(3)).unwrap();
        splitter.split().unwrap();

        let report = splitter.split().unwrap();

        let classes: Vec<&str> = report.classes.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(classes, vec!["bread", "pasta"]);
    }

    #[test]
    fn same_seed_same_split() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        build_tree(a.path());
        build_tree(b.path());

        RatioSplitter::new(a.path().to_path_buf(), seeded(42)).unwrap().split().unwrap();
        RatioSplitter::new(b.path().to_path_buf(), seeded(42)).unwrap().split().unwrap();

        assert_eq!(
            names(&a.path().join("test").join("bread")),
            names(&b.path().join("test").join("bread"))
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let bad_ratio = SplitConfig {
            ratio: 1.0,
            ..SplitConfig::default()
        };
        assert!(RatioSplitter::new(root.path().to_path_buf(), bad_ratio).is_err());

        let same_names = SplitConfig {
            second_dir: "train_val".into(),
            ..SplitConfig::default()
        };
        assert!(RatioSplitter::new(root.path().to_path_buf(), same_names).is_err());
        assert!(!root.path().join("train_val").exists());
    }
}
