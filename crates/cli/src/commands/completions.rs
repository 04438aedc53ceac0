//! completions command - Print a shell completion script

use clap::Args;
use clap_complete::Shell;

use crate::exit_code::ExitCode;

/// Print a completion script for `shell` to stdout
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the completions command
pub fn execute(args: CompletionsArgs, mut command: clap::Command) -> ExitCode {
    let name = command.get_name().to_string();
    clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
    ExitCode::Success
}
