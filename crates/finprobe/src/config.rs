//! Suite configuration.
//!
//! Resolution order: built-in defaults, then an optional YAML file
//! (`--config`, `FINPROBE_CONFIG`, or `finprobe.yaml` in the working
//! directory), then environment overrides.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::DriverConfig;
use crate::page::PageSettings;
use crate::result::{ProbeError, ProbeResult};

/// Deployed application the suites target by default
pub const DEFAULT_BASE_URL: &str = "https://finance-app-five-rosy.vercel.app";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "finprobe.yaml";

/// The one browser a driver exists for
pub const SUPPORTED_BROWSER: &str = "chromium";

/// Login used by the setup phase and the existing-account flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "test@example.com".to_string(),
            password: "testpassword123".to_string(),
            full_name: "John Doe".to_string(),
        }
    }
}

/// Named group of suites sharing a timeout and session policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    /// Suites must match this regex, when set
    pub test_match: Option<String>,
    /// Suites matching this regex are excluded
    pub test_ignore: Option<String>,
    /// Per-test bound overriding the suite default
    pub timeout_ms: Option<u64>,
    /// Start from the saved session artifact
    pub uses_session: bool,
    /// Projects that must finish first
    pub dependencies: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            test_match: None,
            test_ignore: None,
            timeout_ms: None,
            uses_session: true,
            dependencies: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Whether `suite` (a test target name such as `ai_insights`) belongs here.
    /// Invalid patterns match nothing; [`SuiteConfig::validate`] reports them.
    #[must_use]
    pub fn includes(&self, suite: &str) -> bool {
        let matches = |pattern: &Option<String>| {
            pattern
                .as_deref()
                .and_then(|p| Regex::new(p).ok())
                .map(|re| re.is_match(suite))
        };
        matches(&self.test_match).unwrap_or(self.test_match.is_none())
            && !matches(&self.test_ignore).unwrap_or(false)
    }
}

fn default_projects() -> Vec<ProjectConfig> {
    vec![
        ProjectConfig {
            name: "setup".to_string(),
            test_match: Some("^auth_setup$".to_string()),
            uses_session: false,
            ..ProjectConfig::default()
        },
        ProjectConfig {
            name: "chromium".to_string(),
            test_ignore: Some("^(auth_setup|ai_.*)$".to_string()),
            dependencies: vec!["setup".to_string()],
            ..ProjectConfig::default()
        },
        ProjectConfig {
            name: "ai-tests".to_string(),
            test_match: Some("^ai_".to_string()),
            timeout_ms: Some(30_000),
            dependencies: vec!["setup".to_string()],
            ..ProjectConfig::default()
        },
    ]
}

/// Everything a run needs to know about the target and its timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub base_url: String,
    pub action_timeout_ms: u64,
    pub expect_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub test_timeout_ms: u64,
    /// Extra runs of a failing test body
    pub retries: u32,
    /// Test contexts open at once in one process (0 = no bound)
    pub workers: usize,
    pub headless: bool,
    /// Only `chromium` has a driver
    pub browsers: Vec<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub session_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub screenshot_on_failure: bool,
    pub credentials: Credentials,
    pub projects: Vec<ProjectConfig>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            action_timeout_ms: 15_000,
            expect_timeout_ms: 30_000,
            navigation_timeout_ms: 10_000,
            test_timeout_ms: 60_000,
            retries: 0,
            workers: 0,
            headless: true,
            browsers: vec!["chromium".to_string()],
            viewport_width: 1280,
            viewport_height: 720,
            session_path: PathBuf::from(".auth/session.json"),
            artifacts_dir: PathBuf::from("target/finprobe"),
            screenshot_on_failure: true,
            credentials: Credentials::default(),
            projects: default_projects(),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> ProbeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProbeError::config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

impl SuiteConfig {
    /// Resolve from defaults, file and process environment
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("FINPROBE_CONFIG").map(PathBuf::from));
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file over the defaults
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loading suite config");
        Self::from_yaml_str(&raw)
    }

    /// Parse YAML; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `FINPROBE_*` and `CI` overrides from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ProbeResult<()> {
        if let Some(url) = lookup("FINPROBE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("FINPROBE_HEADLESS") {
            self.headless = parse_bool("FINPROBE_HEADLESS", &raw)?;
        }
        if let Some(email) = lookup("FINPROBE_EMAIL") {
            self.credentials.email = email;
        }
        if let Some(password) = lookup("FINPROBE_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(name) = lookup("FINPROBE_FULL_NAME") {
            self.credentials.full_name = name;
        }
        if let Some(path) = lookup("FINPROBE_SESSION_PATH") {
            self.session_path = PathBuf::from(path);
        }
        if lookup("CI").is_some_and(|v| !v.is_empty() && v != "false" && v != "0") {
            self.retries = 2;
            self.workers = 1;
        }
        Ok(())
    }

    /// Reject configurations no run could use
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        for (key, ms) in [
            ("action_timeout_ms", self.action_timeout_ms),
            ("expect_timeout_ms", self.expect_timeout_ms),
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("test_timeout_ms", self.test_timeout_ms),
        ] {
            if ms == 0 {
                return Err(ProbeError::config(format!("{key} must be greater than zero")));
            }
        }
        if self.browsers.is_empty() {
            return Err(ProbeError::config("browsers must name at least one browser"));
        }
        if let Some(other) = self.browsers.iter().find(|b| b.as_str() != SUPPORTED_BROWSER) {
            return Err(ProbeError::config(format!(
                "unsupported browser {other:?}; only {SUPPORTED_BROWSER} is available"
            )));
        }
        let mut names = HashSet::new();
        for project in &self.projects {
            if project.timeout_ms == Some(0) {
                return Err(ProbeError::config(format!(
                    "project {:?}: timeout_ms must be greater than zero",
                    project.name
                )));
            }
            if !names.insert(project.name.as_str()) {
                return Err(ProbeError::config(format!(
                    "duplicate project {:?}",
                    project.name
                )));
            }
            for pattern in [&project.test_match, &project.test_ignore]
                .into_iter()
                .flatten()
            {
                Regex::new(pattern).map_err(|e| {
                    ProbeError::config(format!("project {:?}: {e}", project.name))
                })?;
            }
        }
        for project in &self.projects {
            if let Some(missing) = project
                .dependencies
                .iter()
                .find(|dep| !names.contains(dep.as_str()))
            {
                return Err(ProbeError::config(format!(
                    "project {:?} depends on unknown project {missing:?}",
                    project.name
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// First project that includes `suite`
    #[must_use]
    pub fn project_for(&self, suite: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.includes(suite))
    }

    /// Per-test bound for `suite`, honouring project overrides
    #[must_use]
    pub fn test_timeout_for(&self, suite: &str) -> Duration {
        let ms = self
            .project_for(suite)
            .and_then(|p| p.timeout_ms)
            .unwrap_or(self.test_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Timing for pages built from this config
    #[must_use]
    pub fn page_settings(&self) -> PageSettings {
        PageSettings::new(self.base_url.clone())
            .action_timeout(Duration::from_millis(self.action_timeout_ms))
            .expect_timeout(Duration::from_millis(self.expect_timeout_ms))
            .navigation_timeout(Duration::from_millis(self.navigation_timeout_ms))
    }

    /// Browser launch options
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new()
            .headless(self.headless)
            .viewport(self.viewport_width, self.viewport_height)
            .navigation_timeout(Duration::from_millis(self.navigation_timeout_ms.max(30_000)))
    }
}
