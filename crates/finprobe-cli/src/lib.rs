//! Finprobe CLI library
//!
//! Command-line surface for the Finprobe suites: writes the session artifact
//! the authenticated projects start from, and inspects the resolved
//! configuration without launching a browser.

mod commands;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CategorizeArgs, Cli, Commands, ConfigArgs, ConfigFormat, LogFormatArg, ProjectsArgs, SetupArgs,
};
pub use error::{CliError, CliResult};
pub use output::Printer;
