//! upload command - Upload a file or directory tree
//!
//! Keys are the destination prefix followed by each file's path relative to
//! the uploaded directory.

use std::path::PathBuf;

use bkt_core::{Direction, ObjectStore as _, path::normalize_prefix};
use clap::Args;

use super::{GlobalArgs, TransferSummary, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload a file or directory tree
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file or directory
    pub path: PathBuf,

    /// Key prefix to upload under, e.g. `backups/2024/`
    pub prefix: Option<String>,

    /// Only upload files whose relative path matches this glob
    #[arg(long)]
    pub pattern: Option<String>,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());

    if !args.path.exists() {
        formatter.error(&format!("Path not found: {}", args.path.display()));
        return ExitCode::NotFound;
    }
    if args.pattern.is_some() && !args.path.is_dir() {
        formatter.error("--pattern needs a directory to search");
        return ExitCode::UsageError;
    }

    let manager = match connect(&global, "Uploading").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    let prefix = args.prefix.as_deref();
    let outcome = match &args.pattern {
        Some(pattern) => manager.upload_matching(&args.path, pattern, prefix).await,
        None => manager.upload(&args.path, prefix).await,
    };

    match outcome {
        Ok(result) => {
            TransferSummary::new(
                Direction::Upload,
                manager.store().bucket(),
                &normalize_prefix(prefix),
                &result,
            )
            .report(&formatter);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
