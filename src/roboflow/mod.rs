//! Roboflow dataset acquisition.
//!
//! This module owns download orchestration (skip-if-present, archive
//! staging, extraction, cleanup). Raw API access lives in [`api`].

pub mod api;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::RobofetchError;
use crate::validate::{self, DatasetReport};

use api::RoboflowClient;

/// Staging directory for in-flight archives, created under the
/// destination. The name contains `tmp` so [`RoboflowDownloader::cleanup`]
/// catches leftovers from interrupted runs.
const STAGING_DIR: &str = ".robofetch-tmp";

/// Outcome of a successful `download_dataset` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The dataset was already materialized; no network call was made.
    AlreadyPresent { dataset_dir: PathBuf },
    /// The dataset was downloaded and extracted.
    Downloaded { dataset_dir: PathBuf },
}

impl DownloadOutcome {
    pub fn dataset_dir(&self) -> &Path {
        match self {
            DownloadOutcome::AlreadyPresent { dataset_dir }
            | DownloadOutcome::Downloaded { dataset_dir } => dataset_dir,
        }
    }

    /// One-line description for CLI output.
    pub fn message(&self) -> String {
        match self {
            DownloadOutcome::AlreadyPresent { dataset_dir } => format!(
                "Dataset already present at {} (use --force to re-download)",
                dataset_dir.display()
            ),
            DownloadOutcome::Downloaded { dataset_dir } => {
                format!("Dataset downloaded to {}", dataset_dir.display())
            }
        }
    }
}

/// Downloads and validates Roboflow dataset exports.
pub struct RoboflowDownloader {
    settings: Settings,
    dest_dir: PathBuf,
    client: RoboflowClient,
}

impl RoboflowDownloader {
    /// Build a downloader from resolved settings.
    ///
    /// Creates the destination directory if needed and verifies it is
    /// writable before anything else happens.
    pub fn new(settings: Settings) -> Result<Self, RobofetchError> {
        let dest_dir = settings.processed_data_dir();
        ensure_writable(&dest_dir)?;

        let client = RoboflowClient::new(settings.roboflow.api_key.clone());
        Ok(Self {
            settings,
            dest_dir,
            client,
        })
    }

    /// Directory the dataset is (or will be) materialized into.
    pub fn dataset_dir(&self) -> PathBuf {
        self.dest_dir.join(&self.settings.roboflow.project)
    }

    /// Download the configured dataset export.
    ///
    /// If the dataset directory already exists and `force_download` is
    /// false, the call is a no-op apart from a log line.
    pub fn download_dataset(
        &self,
        force_download: bool,
    ) -> Result<DownloadOutcome, RobofetchError> {
        let dataset_dir = self.dataset_dir();
        if dataset_dir.exists() && !force_download {
            info!(
                dataset_dir = %dataset_dir.display(),
                "dataset already present, skipping download"
            );
            return Ok(DownloadOutcome::AlreadyPresent { dataset_dir });
        }

        let rf = &self.settings.roboflow;
        let link = self
            .client
            .resolve_export(&rf.workspace, &rf.project, &rf.version, &rf.format)?;

        let staging = self.dest_dir.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;
        let archive = staging.join(format!("{}-v{}.zip", rf.project, rf.version));
        self.client.download_archive(&link, &archive)?;

        if dataset_dir.exists() {
            fs::remove_dir_all(&dataset_dir)?;
        }
        extract_archive(&archive, &dataset_dir)?;

        if let Err(source) = fs::remove_file(&archive) {
            warn!(archive = %archive.display(), %source, "could not remove staged archive");
        }
        if let Err(source) = fs::remove_dir(&staging) {
            warn!(staging = %staging.display(), %source, "could not remove staging directory");
        }

        info!(project = %rf.project, version = %rf.version, "dataset downloaded");
        Ok(DownloadOutcome::Downloaded { dataset_dir })
    }

    /// Validate the materialized dataset tree.
    pub fn validate_dataset(&self) -> DatasetReport {
        let rf = &self.settings.roboflow;
        validate::validate_tree(&self.dataset_dir(), &rf.project, &rf.version, &rf.format)
    }

    /// Remove temporary directories left under the destination.
    ///
    /// Failures are logged and reflected in the return value, never
    /// raised; leftover temp data only costs disk space.
    pub fn cleanup(&self) -> bool {
        let entries = match fs::read_dir(&self.dest_dir) {
            Ok(entries) => entries,
            Err(source) => {
                warn!(dest_dir = %self.dest_dir.display(), %source, "cleanup could not read destination");
                return false;
            }
        };

        let mut ok = true;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !path.is_dir() || !name.to_ascii_lowercase().contains("tmp") {
                continue;
            }

            info!(path = %path.display(), "removing temporary directory");
            if let Err(source) = fs::remove_dir_all(&path) {
                warn!(path = %path.display(), %source, "failed to remove temporary directory");
                ok = false;
            }
        }

        ok
    }
}

fn ensure_writable(dest_dir: &Path) -> Result<(), RobofetchError> {
    if !dest_dir.exists() {
        fs::create_dir_all(dest_dir).map_err(|source| RobofetchError::DestinationNotWritable {
            path: dest_dir.to_path_buf(),
            source,
        })?;
        info!(dest_dir = %dest_dir.display(), "created destination directory");
    }

    let probe = dest_dir.join(".write_test");
    fs::write(&probe, b"test").map_err(|source| RobofetchError::DestinationNotWritable {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    fs::remove_file(&probe).map_err(|source| RobofetchError::DestinationNotWritable {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn extract_archive(archive: &Path, dataset_dir: &Path) -> Result<(), RobofetchError> {
    let file = fs::File::open(archive)?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|source| RobofetchError::ArchiveExtract {
            path: archive.to_path_buf(),
            source,
        })?;

    fs::create_dir_all(dataset_dir)?;
    zip.extract(dataset_dir)
        .map_err(|source| RobofetchError::ArchiveExtract {
            path: archive.to_path_buf(),
            source,
        })?;

    info!(dataset_dir = %dataset_dir.display(), files = zip.len(), "archive extracted");
    Ok(())
}
