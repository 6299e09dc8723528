//! Robofetch: Roboflow dataset fetcher and validator.
//!
//! Robofetch downloads object detection datasets from Roboflow via the
//! export API and validates the resulting YOLO-style directory tree
//! (train/valid/test splits with images and labels) before handing it to
//! a training pipeline.
//!
//! # Modules
//!
//! - [`config`]: Typed settings loaded from YAML with `${ENV_VAR}` substitution
//! - [`roboflow`]: Download orchestration and the export API client
//! - [`validate`]: Dataset tree validation and reporting
//! - [`error`]: Error types for robofetch operations

pub mod config;
pub mod error;
pub mod roboflow;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::RobofetchError;

use config::Settings;
use roboflow::RoboflowDownloader;
use validate::DatasetReport;

/// The robofetch CLI application.
#[derive(Parser)]
#[command(name = "robofetch")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Download the configured dataset and validate the result.
    Download(DownloadArgs),
    /// Validate an already-downloaded dataset.
    Validate(ValidateArgs),
    /// Remove temporary artifacts left behind by interrupted downloads.
    Cleanup(CleanupArgs),
}

/// Arguments for the download subcommand.
#[derive(clap::Args)]
struct DownloadArgs {
    /// Path to the settings file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Re-download even if the dataset is already present.
    #[arg(long)]
    force: bool,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Path to the settings file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the cleanup subcommand.
#[derive(clap::Args)]
struct CleanupArgs {
    /// Path to the settings file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Run the robofetch CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RobofetchError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Download(args)) => run_download(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Cleanup(args)) => run_cleanup(args),
        None => {
            println!("robofetch {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Roboflow dataset fetcher and validator.");
            println!();
            println!("Run 'robofetch --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the download subcommand: fetch, then validate.
fn run_download(args: DownloadArgs) -> Result<(), RobofetchError> {
    let settings = Settings::load(&args.config)?;
    let downloader = RoboflowDownloader::new(settings)?;

    let outcome = downloader.download_dataset(args.force)?;
    println!("{}", outcome.message());

    let report = downloader.validate_dataset();
    print!("{report}");
    finish_validation(report)
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), RobofetchError> {
    let settings = Settings::load(&args.config)?;
    let downloader = RoboflowDownloader::new(settings)?;

    let report = downloader.validate_dataset();
    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{report}"),
    }

    finish_validation(report)
}

/// Execute the cleanup subcommand. Cleanup failures are non-fatal.
fn run_cleanup(args: CleanupArgs) -> Result<(), RobofetchError> {
    let settings = Settings::load(&args.config)?;
    let downloader = RoboflowDownloader::new(settings)?;

    if downloader.cleanup() {
        println!("Cleanup complete.");
    } else {
        println!("Cleanup finished with warnings (see log).");
    }
    Ok(())
}

fn finish_validation(report: DatasetReport) -> Result<(), RobofetchError> {
    if report.is_valid() {
        Ok(())
    } else {
        let message = report
            .error
            .clone()
            .unwrap_or_else(|| "invalid dataset".to_string());
        Err(RobofetchError::ValidationFailed { message, report })
    }
}
