//! upload-all and download-folder - flat transfers kept for old scripts
//!
//! Both drop the directory structure: uploads become `destination/<name>`,
//! downloads land directly in the destination directory. Prefer `upload`
//! and `download`.

#![allow(deprecated)]

use std::path::PathBuf;

use bkt_core::{Direction, ObjectStore as _};
use clap::Args;

use super::{GlobalArgs, TransferSummary, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload every file of a directory with flat keys
#[derive(Args, Debug)]
pub struct UploadAllArgs {
    /// Local directory
    pub directory: PathBuf,

    /// Key folder to upload into
    pub destination: Option<String>,
}

/// Download a folder without its subdirectories
#[derive(Args, Debug)]
pub struct DownloadFolderArgs {
    /// Key folder to download
    pub folder: String,

    /// Local directory, created if missing
    pub destination: PathBuf,
}

/// Execute the upload-all command
pub async fn upload_all(args: UploadAllArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());
    formatter.warning("upload-all drops subdirectories from keys; use `bkt upload` instead");

    let manager = match connect(&global, "Uploading").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    let destination = args.destination.as_deref();
    match manager.upload_all(&args.directory, destination).await {
        Ok(result) => {
            TransferSummary::new(
                Direction::Upload,
                manager.store().bucket(),
                destination.unwrap_or_default(),
                &result,
            )
            .report(&formatter);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

/// Execute the download-folder command
pub async fn download_folder(args: DownloadFolderArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());
    formatter.warning("download-folder flattens subdirectories; use `bkt download` instead");

    let manager = match connect(&global, "Downloading").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    match manager.download_folder(&args.folder, &args.destination).await {
        Ok(result) => {
            TransferSummary::new(
                Direction::Download,
                manager.store().bucket(),
                &args.folder,
                &result,
            )
            .report(&formatter);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
