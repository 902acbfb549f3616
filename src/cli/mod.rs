// CLI module
// Command-line interface, argument parsing and command dispatch

mod args;
mod run;

pub use args::{CliArgs, Command, ReplayArgs, StrategyType};
pub use run::run;

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (invalid arguments, missing subcommand, or --help),
/// clap prints the error or help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
