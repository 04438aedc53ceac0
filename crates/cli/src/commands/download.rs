//! download command - Download everything under a prefix
//!
//! Key segments after the prefix become directories below the destination.

use std::path::PathBuf;

use bkt_core::{Direction, ObjectStore as _, path::normalize_prefix};
use clap::Args;

use super::{GlobalArgs, TransferSummary, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Download objects into a local directory
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Local directory to download into
    pub destination: PathBuf,

    /// Key prefix to download; the whole bucket when omitted
    pub prefix: Option<String>,

    /// Download keys matching this glob instead of a prefix
    #[arg(long, conflicts_with = "prefix")]
    pub pattern: Option<String>,
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());

    if args.destination.is_file() {
        formatter.error(&format!(
            "Destination is a file: {}",
            args.destination.display()
        ));
        return ExitCode::UsageError;
    }

    let manager = match connect(&global, "Downloading").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    let (outcome, source) = match &args.pattern {
        Some(pattern) => (
            manager.download_matching(&args.destination, pattern).await,
            pattern.clone(),
        ),
        None => {
            let prefix = args.prefix.as_deref();
            (
                manager.download(&args.destination, prefix).await,
                normalize_prefix(prefix),
            )
        }
    };

    match outcome {
        Ok(result) => {
            if result.succeeded == 0 && result.failed == 0 {
                formatter.warning(&format!("No objects found under '{source}'"));
            }
            TransferSummary::new(Direction::Download, manager.store().bucket(), &source, &result)
                .report(&formatter);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
