//! Subcommands and the shared bucket bootstrap
//!
//! Every command that touches the bucket resolves its settings the same way:
//! command-line flags first, then the config file, then built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use bkt_core::{BatchResult, BucketManager, Config, ConfigManager, Direction, Error, Result};
use bkt_s3::{S3Client, StoreConfig, resolve_profile};
use clap::{ArgAction, Args, Subcommand};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use crate::progress::BarSink;

pub mod completions;
pub mod download;
pub mod legacy;
pub mod ls;
pub mod rm_folder;
pub mod upload;

/// Flags accepted by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "BKT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Credentials profile
    #[arg(long, global = true, env = "BKT_PROFILE")]
    pub profile: Option<String>,

    /// AWS-style credentials file
    #[arg(long, global = true, env = "BKT_CREDENTIALS_FILE", value_name = "FILE")]
    pub credentials_file: Option<PathBuf>,

    /// S3-compatible endpoint URL
    #[arg(long, global = true, env = "BKT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bucket to operate on
    #[arg(short, long, global = true, env = "BKT_BUCKET")]
    pub bucket: Option<String>,

    #[arg(long, global = true, env = "BKT_REGION")]
    pub region: Option<String>,

    /// Concurrent transfers
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color,
            quiet: self.quiet,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file or directory tree under a key prefix
    Upload(upload::UploadArgs),

    /// Download every object under a key prefix
    Download(download::DownloadArgs),

    /// Delete every object under a key prefix
    #[command(name = "rm-folder", visible_alias = "delete-folder")]
    RmFolder(rm_folder::RmFolderArgs),

    /// List objects under a key prefix
    Ls(ls::LsArgs),

    /// Upload a directory with flat keys (legacy)
    UploadAll(legacy::UploadAllArgs),

    /// Download a folder into one flat directory (legacy)
    DownloadFolder(legacy::DownloadFolderArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Effective settings after merging flags over the config file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store: StoreConfig,
    pub profile: String,
    pub credentials_file: PathBuf,
    pub workers: usize,
}

/// Merge `global` flags over `config`
pub fn resolve_settings(global: &GlobalArgs, config: &Config) -> Result<Settings> {
    let bucket = global
        .bucket
        .clone()
        .or_else(|| config.store.bucket.clone())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            Error::Config(
                "No bucket configured; pass --bucket or set bucket in [store]".to_string(),
            )
        })?;

    let workers = global.workers.unwrap_or(config.defaults.workers);
    if workers == 0 {
        return Err(Error::Config("workers must be at least 1".to_string()));
    }

    let credentials_file = global
        .credentials_file
        .clone()
        .or_else(|| config.credentials_file())
        .ok_or_else(|| Error::Config("Cannot determine the credentials file".to_string()))?;

    Ok(Settings {
        store: StoreConfig {
            endpoint: global.endpoint.clone().or_else(|| config.store.endpoint.clone()),
            region: global
                .region
                .clone()
                .unwrap_or_else(|| config.defaults.region.clone()),
            bucket,
            bucket_lookup: config.defaults.bucket_lookup.clone(),
        },
        profile: global
            .profile
            .clone()
            .unwrap_or_else(|| config.defaults.profile.clone()),
        credentials_file,
        workers,
    })
}

fn load_config(global: &GlobalArgs) -> Result<Config> {
    let manager = match &global.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    manager.load()
}

/// Build a [`BucketManager`] for the configured bucket
///
/// A progress bar labelled `activity` is attached unless output is JSON or
/// quiet.
pub async fn connect(global: &GlobalArgs, activity: &str) -> Result<BucketManager<S3Client>> {
    let config = load_config(global)?;
    let settings = resolve_settings(global, &config)?;

    tracing::debug!(
        bucket = %settings.store.bucket,
        profile = %settings.profile,
        workers = settings.workers,
        "Resolved settings"
    );

    let credentials = resolve_profile(&settings.credentials_file, &settings.profile).await?;
    let client = S3Client::new(settings.store, credentials).await?;

    let manager = BucketManager::new(client).with_workers(settings.workers);
    if global.output_config().show_progress() {
        Ok(manager.with_progress(Arc::new(BarSink::new(activity))))
    } else {
        Ok(manager)
    }
}

/// Print `error` and turn it into an exit code
pub fn fail(formatter: &Formatter, error: &Error) -> ExitCode {
    formatter.error(&error.to_string());
    ExitCode::from_i32(error.exit_code())
}

/// Summary of a finished upload or download batch
#[derive(Debug, Serialize)]
pub struct TransferSummary {
    pub operation: Direction,
    pub bucket: String,
    pub prefix: String,
    pub files: usize,
    pub bytes: u64,
    pub bytes_human: String,
}

impl TransferSummary {
    pub fn new(operation: Direction, bucket: &str, prefix: &str, result: &BatchResult) -> Self {
        Self {
            operation,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            files: result.succeeded,
            bytes: result.completed_bytes,
            bytes_human: humansize::format_size(result.completed_bytes, humansize::BINARY),
        }
    }

    /// Print the summary in the formatter's mode
    pub fn report(&self, formatter: &Formatter) {
        if formatter.is_json() {
            formatter.json(self);
            return;
        }

        let verb = match self.operation {
            Direction::Upload => "Uploaded",
            Direction::Download => "Downloaded",
        };
        formatter.success(&format!(
            "{verb} {} file(s), {} ({}/{})",
            self.files,
            formatter.style_size(&self.bytes_human),
            formatter.style_name(&self.bucket),
            self.prefix
        ));
    }
}
