//! Subscriber setup for suites and the CLI.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::result::{ProbeError, ProbeResult};
use crate::step::StepRecorder;

/// Output shape of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" | "pretty" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(ProbeError::config(format!("unknown log format {other:?}"))),
        }
    }
}

/// Default level for a verbosity count; `RUST_LOG` still wins
#[must_use]
pub const fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::WARN;
    }
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber, optionally feeding a step recorder.
/// Fails if a subscriber is already installed.
pub fn init(format: LogFormat, level: LevelFilter, recorder: Option<StepRecorder>) -> ProbeResult<()> {
    let output = match format {
        LogFormat::Plain => fmt::layer().with_target(false).with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };
    Registry::default()
        .with(recorder)
        .with(output.with_filter(filter(level)))
        .try_init()
        .map_err(|e| ProbeError::config(format!("logging already initialised: {e}")))
}

/// Subscriber scoped to one test: steps go to `recorder`, log lines to the
/// test writer. Attach with `WithSubscriber::with_subscriber`.
#[must_use]
pub fn test_subscriber(recorder: StepRecorder) -> impl Subscriber + Send + Sync {
    Registry::default().with(recorder).with(
        fmt::layer()
            .with_test_writer()
            .with_filter(filter(LevelFilter::INFO)),
    )
}

/// Best-effort init for test binaries: repeated calls are no-ops
pub fn init_for_tests() {
    let _ = fmt()
        .with_env_filter(filter(LevelFilter::INFO))
        .with_test_writer()
        .try_init();
}
