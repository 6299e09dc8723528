use std::path::PathBuf;
use thiserror::Error;

use crate::validate::DatasetReport;

/// The main error type for robofetch operations.
#[derive(Debug, Error)]
pub enum RobofetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Environment variable '{var}' is not set and has no default (referenced by '{field}')")]
    UnresolvedEnvVar { var: String, field: String },

    #[error("Required setting '{field}' is empty")]
    EmptyField { field: String },

    #[error("Destination directory {path} is not writable: {source}")]
    DestinationNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve export for project '{project}': {message}")]
    ExportResolve { project: String, message: String },

    #[error("Failed to download export archive from {url}: {message}")]
    ExportDownload { url: String, message: String },

    #[error("Failed to extract archive {path}: {source}")]
    ArchiveExtract {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),

    #[error("Dataset validation failed: {message}")]
    ValidationFailed {
        message: String,
        report: DatasetReport,
    },
}
