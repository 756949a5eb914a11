//! Result and error types for Finprobe.
//!
//! The first four variants are the suite's failure taxonomy. Everything below
//! them is infrastructure (browser, driver, config, I/O) that ends a test the
//! same way but is reported separately.

use thiserror::Error;

/// Result type for Finprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A screen's landmark element did not appear after navigation
    #[error("Navigation to {url} timed out after {ms}ms waiting for {landmark}")]
    NavigationTimeout {
        /// Target URL
        url: String,
        /// Description of the landmark locator
        landmark: String,
        /// Bound in milliseconds
        ms: u64,
    },

    /// A verification method found the page in the wrong state
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// No signal of an outcome race completed before its deadline
    #[error("Race timed out after {ms}ms with {signals} signal(s) pending")]
    RaceTimeout {
        /// Deadline in milliseconds
        ms: u64,
        /// Number of signals that took part
        signals: usize,
    },

    /// The application reached a state no flow accounts for
    #[error("Unexpected application state: {message}")]
    UnexpectedState {
        /// Error message
        message: String,
    },

    /// Bounded wait elapsed
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Locator resolved to more than one element
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Locator description
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Locator action targeted an element that no longer exists
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Locator description
        selector: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Driver-level failure (CDP call, script evaluation)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Session artifact error
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create an unexpected-state error
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedState {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error came from an elapsed bound of any kind
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::NavigationTimeout { .. } | Self::RaceTimeout { .. }
        )
    }
}
