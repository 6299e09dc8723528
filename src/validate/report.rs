//! Validation report types for downloaded datasets.
//!
//! The report is both human-readable (via `Display`) and serializable to
//! JSON for programmatic use.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// The result of validating a downloaded dataset tree.
#[derive(Clone, Debug, Serialize)]
pub struct DatasetReport {
    /// Roboflow project the dataset was exported from.
    pub project: String,
    /// Export version.
    pub version: String,
    /// Export format (e.g. `yolov8`).
    pub format: String,
    /// Directory the dataset was inspected at.
    pub dataset_dir: PathBuf,
    /// Per-split statistics, keyed by split name.
    pub splits: BTreeMap<String, SplitStats>,
    /// Class names read from `data.yaml`.
    pub classes: Vec<String>,
    /// Set when validation failed; `None` means the dataset is valid.
    pub error: Option<String>,
}

/// Statistics for a single dataset split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    /// Number of image files under `<split>/images`.
    pub images: usize,
    /// Number of label files under `<split>/labels`.
    pub labels: usize,
    /// Images with no matching label file.
    pub images_without_labels: usize,
    /// Label files with no matching image.
    pub labels_without_images: usize,
    /// Images whose header could not be decoded.
    pub unreadable_images: usize,
}

impl DatasetReport {
    /// Creates an empty report for a dataset directory.
    pub fn new(project: &str, version: &str, format: &str, dataset_dir: &Path) -> Self {
        Self {
            project: project.to_string(),
            version: version.to_string(),
            format: format.to_string(),
            dataset_dir: dataset_dir.to_path_buf(),
            splits: BTreeMap::new(),
            classes: Vec::new(),
            error: None,
        }
    }

    /// Returns true if no structural problem was found.
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Image count for a split, zero if the split was never reached.
    pub fn image_count(&self, split: &str) -> usize {
        self.splits.get(split).map(|stats| stats.images).unwrap_or(0)
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Dataset '{}' v{} ({}) at {}",
            self.project,
            self.version,
            self.format,
            self.dataset_dir.display()
        )?;

        for (split, stats) in &self.splits {
            write!(f, "  {}: {} images, {} labels", split, stats.images, stats.labels)?;
            if stats.unreadable_images > 0 {
                write!(f, " ({} unreadable)", stats.unreadable_images)?;
            }
            writeln!(f)?;
        }

        if !self.classes.is_empty() {
            writeln!(f, "  classes: {}", self.classes.join(", "))?;
        }

        match &self.error {
            None => writeln!(f, "Validation passed"),
            Some(error) => writeln!(f, "Validation failed: {}", error),
        }
    }
}
