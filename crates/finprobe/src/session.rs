//! Session artifact: the authenticated browser storage written once by the
//! setup phase and read by every later test.
//!
//! The on-disk shape is the camelCase `storageState` JSON (cookies plus
//! per-origin localStorage), so artifacts are
//! interchangeable with other tooling pointed at the same application.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

use crate::result::{ProbeError, ProbeResult};

/// One browser cookie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds; `-1` for session cookies
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    /// `Strict`, `Lax` or `None`
    pub same_site: Option<String>,
}

/// One local-storage entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

/// Local storage for one origin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

/// Cookies plus per-origin local storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl StorageState {
    /// Nothing to restore
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }

    /// Cookie by name
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// Read from a JSON file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ProbeError::Session {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write to a JSON file, replacing it atomically
    pub fn save(&self, path: &Path) -> ProbeResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Write-once, read-many handle on the session file.
///
/// [`SessionArtifact::shared`] hands every caller in the process the same
/// handle for a path. Whichever of [`SessionArtifact::ensure`] or
/// [`SessionArtifact::load`] runs first fixes the state for the rest of the
/// run.
#[derive(Debug)]
pub struct SessionArtifact {
    path: PathBuf,
    state: OnceCell<StorageState>,
}

impl SessionArtifact {
    /// Handle on `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: OnceCell::new(),
        }
    }

    /// The process-wide handle for `path`
    #[must_use]
    pub fn shared(path: impl Into<PathBuf>) -> Arc<Self> {
        static SHARED: OnceLock<Mutex<HashMap<PathBuf, Arc<SessionArtifact>>>> = OnceLock::new();
        let path = path.into();
        let mut shared = SHARED
            .get_or_init(Mutex::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        shared
            .entry(path.clone())
            .or_insert_with(|| Arc::new(Self::new(path)))
            .clone()
    }

    /// File location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been written
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the artifact, once per handle
    pub async fn load(&self) -> ProbeResult<&StorageState> {
        self.state
            .get_or_try_init(|| async { StorageState::load(&self.path) })
            .await
    }

    /// Produce and persist the state for this run.
    ///
    /// A file left by an earlier run is replaced. Once the state is set,
    /// later calls return it without producing again.
    pub async fn ensure<F, Fut>(&self, produce: F) -> ProbeResult<&StorageState>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProbeResult<StorageState>>,
    {
        self.state
            .get_or_try_init(|| async {
                let state = produce().await?;
                state.save(&self.path)?;
                info!(path = %self.path.display(), cookies = state.cookies.len(), "session artifact written");
                Ok(state)
            })
            .await
    }
}
