//! Error types for the CLI

use finprobe::ProbeError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Library failure: configuration, browser, session
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No configured project runs the suite
    #[error("No project runs suite {suite:?}")]
    UnknownSuite { suite: String },

    /// Setup ran but did not pass
    #[error("Setup failed: {message}")]
    SetupFailed { message: String },

    /// Command needs a cargo feature this binary was built without
    #[error("`{command}` needs the `{feature}` feature; rebuild with --features {feature}")]
    FeatureDisabled {
        command: &'static str,
        feature: &'static str,
    },
}

impl CliError {
    #[must_use]
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::SetupFailed {
            message: message.into(),
        }
    }
}
