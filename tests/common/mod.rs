use std::fs;
use std::path::{Path, PathBuf};

/// Project name used by the fixture settings.
pub const PROJECT: &str = "widgets";

/// Write a settings file pointing at `dest_dir`, with `api_key` taken
/// verbatim (may be a `${VAR}` placeholder).
pub fn write_settings(dir: &Path, dest_dir: &Path, api_key: &str) -> PathBuf {
    let path = dir.join("settings.yml");
    let yaml = format!(
        "project:\n  name: cli-test\npaths:\n  processed_data_dir: \"{}\"\nroboflow:\n  api_key: \"{}\"\n  workspace: acme\n  project: {}\n  version: \"3\"\n  format: yolov8\n",
        dest_dir.display(),
        api_key,
        PROJECT,
    );
    fs::write(&path, yaml).expect("write settings file");
    path
}

/// Materialize a well-formed YOLO-style dataset tree under
/// `<dest_dir>/<PROJECT>` with the given per-split image counts.
pub fn write_dataset(dest_dir: &Path, train: usize, valid: usize, test: usize) -> PathBuf {
    let dataset_dir = dest_dir.join(PROJECT);
    for (split, count) in [("train", train), ("valid", valid), ("test", test)] {
        let images = dataset_dir.join(split).join("images");
        let labels = dataset_dir.join(split).join("labels");
        fs::create_dir_all(&images).expect("create images dir");
        fs::create_dir_all(&labels).expect("create labels dir");
        for i in 0..count {
            fs::write(images.join(format!("img_{i}.jpg")), b"fake-image").expect("write image");
            fs::write(labels.join(format!("img_{i}.txt")), b"0 0.5 0.5 0.1 0.1\n")
                .expect("write label");
        }
    }
    fs::write(
        dataset_dir.join("data.yaml"),
        "path: .\ntrain: train/images\nval: valid/images\ntest: test/images\nnames:\n  - person\n  - car\n",
    )
    .expect("write data.yaml");
    dataset_dir
}
