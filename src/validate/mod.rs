//! Dataset tree validation.
//!
//! A Roboflow export in a YOLO-style format lands on disk as
//! `<split>/{images,labels}` trees for the train/valid/test splits plus a
//! `data.yaml` describing the classes. This module checks that structure,
//! counts images per split, and cross-checks image/label correspondence.

mod report;

pub use report::{DatasetReport, SplitStats};

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

const REQUIRED_SPLITS: [&str; 3] = ["train", "valid", "test"];
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const LABEL_EXTENSION: &str = "txt";
const DATA_YAML: &str = "data.yaml";

/// Validate a dataset directory and produce a report.
///
/// The report is always returned; structural problems are recorded in
/// `report.error` rather than raised, so callers can decide whether to
/// re-download. Checks stop at the first structural failure, keeping any
/// per-split statistics gathered up to that point.
pub fn validate_tree(
    dataset_dir: &Path,
    project: &str,
    version: &str,
    format: &str,
) -> DatasetReport {
    let mut report = DatasetReport::new(project, version, format, dataset_dir);

    if !dataset_dir.is_dir() {
        report.error = Some(format!(
            "dataset directory not found: {}",
            dataset_dir.display()
        ));
        return report;
    }

    for split in REQUIRED_SPLITS {
        let split_dir = dataset_dir.join(split);
        if !split_dir.is_dir() {
            report.error = Some(format!("required split directory missing: {split}"));
            return report;
        }

        let (stats, labels_dir_present) = collect_split_stats(&split_dir);
        report.splits.insert(split.to_string(), stats);

        if stats.images == 0 {
            report.error = Some(format!("split '{split}' contains no images"));
            return report;
        }

        if stats.unreadable_images > 0 {
            warn!(
                split,
                unreadable = stats.unreadable_images,
                "some image headers could not be decoded"
            );
        }

        if !labels_dir_present {
            warn!(split, "labels directory missing, skipping correspondence check");
            continue;
        }

        if stats.images_without_labels > 0 || stats.labels_without_images > 0 {
            report.error = Some(format!(
                "images and labels do not match in '{split}': {} images without labels, {} labels without images",
                stats.images_without_labels, stats.labels_without_images
            ));
            return report;
        }
    }

    let data_yaml = dataset_dir.join(DATA_YAML);
    if !data_yaml.is_file() {
        report.error = Some(format!("required file missing: {DATA_YAML}"));
        return report;
    }

    match read_class_names(&data_yaml) {
        Ok(classes) => report.classes = classes,
        Err(message) => {
            warn!(%message, "could not read class names from data.yaml");
        }
    }

    report
}

fn collect_split_stats(split_dir: &Path) -> (SplitStats, bool) {
    let images_dir = split_dir.join("images");
    let labels_dir = split_dir.join("labels");

    let mut stats = SplitStats::default();
    let mut image_stems: BTreeSet<String> = BTreeSet::new();

    for entry in WalkDir::new(&images_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, &IMAGE_EXTENSIONS) {
            continue;
        }
        stats.images += 1;
        if imagesize::size(path).is_err() {
            stats.unreadable_images += 1;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            image_stems.insert(stem.to_string());
        }
    }

    let labels_dir_present = labels_dir.is_dir();
    if labels_dir_present {
        let mut label_stems: BTreeSet<String> = BTreeSet::new();
        for entry in WalkDir::new(&labels_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, &[LABEL_EXTENSION]) {
                continue;
            }
            stats.labels += 1;
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                label_stems.insert(stem.to_string());
            }
        }

        stats.images_without_labels = image_stems.difference(&label_stems).count();
        stats.labels_without_images = label_stems.difference(&image_stems).count();
    }

    (stats, labels_dir_present)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    #[serde(default)]
    names: Option<DataYamlNames>,
}

/// Ultralytics writes `names` as either a sequence or an index mapping.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

fn read_class_names(path: &Path) -> Result<Vec<String>, String> {
    let data = fs::read_to_string(path).map_err(|source| source.to_string())?;
    let parsed: DataYaml = serde_yaml::from_str(&data).map_err(|source| source.to_string())?;

    Ok(match parsed.names {
        None => Vec::new(),
        Some(DataYamlNames::Sequence(names)) => names,
        Some(DataYamlNames::Mapping(mapping)) => mapping.into_values().collect(),
    })
}
