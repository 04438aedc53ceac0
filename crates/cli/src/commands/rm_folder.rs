//! rm-folder command - Delete every object under a prefix

use bkt_core::ObjectStore as _;
use clap::Args;
use serde::Serialize;

use super::{GlobalArgs, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Delete every object under a prefix
#[derive(Args, Debug)]
pub struct RmFolderArgs {
    /// Key prefix to delete, e.g. `tmp/run-42/`
    pub prefix: String,
}

#[derive(Debug, Serialize)]
struct RmFolderOutput {
    bucket: String,
    prefix: String,
    deleted: usize,
    batches: usize,
}

/// Execute the rm-folder command
pub async fn execute(args: RmFolderArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());

    if args.prefix.trim_start_matches('/').is_empty() {
        formatter.error("Refusing to delete the whole bucket; give a non-empty prefix");
        return ExitCode::UsageError;
    }

    let manager = match connect(&global, "Deleting").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    match manager.delete_folder(&args.prefix).await {
        Ok(summary) => {
            let output = RmFolderOutput {
                bucket: manager.store().bucket().to_string(),
                prefix: args.prefix,
                deleted: summary.deleted,
                batches: summary.batches,
            };
            if formatter.is_json() {
                formatter.json(&output);
            } else if output.deleted == 0 {
                formatter.warning(&format!("No objects found under '{}'", output.prefix));
            } else {
                formatter.success(&format!(
                    "Deleted {} object(s) under '{}' in {}",
                    output.deleted,
                    output.prefix,
                    formatter.style_name(&output.bucket)
                ));
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
