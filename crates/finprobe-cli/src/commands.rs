//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use finprobe::logging::LogFormat;
use std::path::PathBuf;

/// Finprobe: end-to-end checks for the personal finance app
#[derive(Parser, Debug)]
#[command(name = "finprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    pub log_format: LogFormatArg,

    /// Suite configuration file (defaults to finprobe.yaml or FINPROBE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a smoke account, sign in and save the session artifact
    Setup(SetupArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),

    /// List projects, or show which project runs a suite
    Projects(ProjectsArgs),

    /// Print the failure category of an error message
    Categorize(CategorizeArgs),
}

#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip the registration smoke check
    #[arg(long)]
    pub skip_register: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,
}

#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    /// Test target name to resolve, e.g. `ai_insights`
    #[arg(short, long)]
    pub suite: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CategorizeArgs {
    /// Failure message to classify
    pub message: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    #[default]
    Plain,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Plain => Self::Plain,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "finprobe",
            "config",
            "--format",
            "json",
            "-vv",
            "--log-format",
            "json",
            "--config",
            "ci.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
        match cli.command {
            Commands::Config(args) => assert_eq!(args.format, ConfigFormat::Json),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_categorize_takes_message() {
        let cli = Cli::try_parse_from(["finprobe", "categorize", "net::ERR_CONNECTION_REFUSED"])
            .unwrap();
        match cli.command {
            Commands::Categorize(args) => assert_eq!(args.message, "net::ERR_CONNECTION_REFUSED"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["finprobe"]).is_err());
    }
}
