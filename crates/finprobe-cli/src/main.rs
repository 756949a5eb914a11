//! Finprobe CLI
//!
//! ## Usage
//!
//! ```bash
//! finprobe setup                        # Sign in and save .auth/session.json
//! finprobe config --format json         # Show the resolved configuration
//! finprobe projects --suite ai_insights # Which project runs a suite
//! finprobe categorize "Timeout 30000ms exceeded"
//! ```

use clap::Parser;
use finprobe::logging::{self, level_for};
use finprobe_cli::{handlers, Cli, CliResult};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init(
        cli.log_format.into(),
        level_for(cli.verbose, cli.quiet),
        None,
    )?;
    handlers::run(cli)
}
