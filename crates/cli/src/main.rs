//! bkt - synchronize local directory trees with S3-compatible buckets

mod commands;
mod exit_code;
mod output;
mod progress;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use commands::{Commands, GlobalArgs};
use exit_code::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bkt", version, about, long_about = None, propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if cli.global.no_color || cli.global.json {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    if let Err(e) = init_tracing(cli.global.verbose) {
        eprintln!("bkt: {e:#}");
        return ExitCode::GeneralError.into();
    }

    run(cli).await.into()
}

async fn run(cli: Cli) -> ExitCode {
    let global = cli.global;
    match cli.command {
        Commands::Upload(args) => commands::upload::execute(args, global).await,
        Commands::Download(args) => commands::download::execute(args, global).await,
        Commands::RmFolder(args) => commands::rm_folder::execute(args, global).await,
        Commands::Ls(args) => commands::ls::execute(args, global).await,
        Commands::UploadAll(args) => commands::legacy::upload_all(args, global).await,
        Commands::DownloadFolder(args) => commands::legacy::download_folder(args, global).await,
        Commands::Completions(args) => commands::completions::execute(args, Cli::command()),
    }
}

/// Log to stderr so JSON on stdout stays parseable
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the level from warn.
fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("invalid log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install the log subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_with_globals() {
        let cli = Cli::try_parse_from([
            "bkt", "--bucket", "archive", "-w", "8", "upload", "./data", "backups/", "--json",
        ])
        .unwrap();

        assert_eq!(cli.global.bucket.as_deref(), Some("archive"));
        assert_eq!(cli.global.workers, Some(8));
        assert!(cli.global.json);
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.path, std::path::PathBuf::from("./data"));
                assert_eq!(args.prefix.as_deref(), Some("backups/"));
                assert!(args.pattern.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_download_pattern() {
        let cli =
            Cli::try_parse_from(["bkt", "download", "out", "--pattern", "runs/*/out.csv"]).unwrap();
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.pattern.as_deref(), Some("runs/*/out.csv"));
                assert!(args.prefix.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_download_prefix_and_pattern_conflict() {
        let result = Cli::try_parse_from(["bkt", "download", "out", "data/", "--pattern", "*.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_folder_alias() {
        let cli = Cli::try_parse_from(["bkt", "delete-folder", "tmp/"]).unwrap();
        assert!(matches!(cli.command, Commands::RmFolder(ref args) if args.prefix == "tmp/"));
    }

    #[test]
    fn test_legacy_commands() {
        let cli = Cli::try_parse_from(["bkt", "upload-all", "dir", "flat"]).unwrap();
        assert!(matches!(cli.command, Commands::UploadAll(_)));

        let cli = Cli::try_parse_from(["bkt", "download-folder", "flat/", "dest"]).unwrap();
        assert!(matches!(cli.command, Commands::DownloadFolder(_)));
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["bkt", "-vv", "ls"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
    }
}
