//! Persistent key/value settings.
//!
//! The session core only ever reads one setting, the server host, and only
//! before a session is built. Stores are `&self` so one store can be shared
//! between a settings screen and the code that builds clients.
//!
//! | Store | Backing |
//! |-------|---------|
//! | [`MemorySettings`] | In-process map |
//! | [`FileSettings`] | JSON object in a file, rewritten on every `set` |

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Key under which the server host is stored.
pub const SERVER_HOST_KEY: &str = "serverIP";

// ============================================================================
// SettingsStore
// ============================================================================

/// A string key/value store.
pub trait SettingsStore: Send + Sync {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// Server Host Helpers
// ============================================================================

/// Loads the configured server host. Empty values count as unset.
///
/// # Errors
///
/// Propagates store failures.
pub fn load_server_host(store: &dyn SettingsStore) -> Result<Option<String>> {
    let host = store
        .get(SERVER_HOST_KEY)?
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());
    Ok(host)
}

/// Saves the server host.
///
/// # Errors
///
/// - [`Error::Config`] if `host` is empty
/// - [`Error::Settings`] if the store fails
pub fn save_server_host(store: &dyn SettingsStore, host: &str) -> Result<()> {
    let host = host.trim();
    if host.is_empty() {
        return Err(Error::config("Please enter a server IP address"));
    }
    store.set(SERVER_HOST_KEY, host).map_err(|e| {
        error!(error = %e, "Error saving server IP");
        Error::settings("Failed to save server IP")
    })
}

// ============================================================================
// MemorySettings
// ============================================================================

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<FxHashMap<String, String>>,
}

impl MemorySettings {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// FileSettings
// ============================================================================

/// Settings persisted as a flat JSON object.
///
/// The file is read once on open and rewritten on every `set`.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<FxHashMap<String, String>>,
}

impl FileSettings {
    /// Opens (or lazily creates) a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] if the file exists but is not a JSON
    /// object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::settings(format!("Corrupt settings file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Settings loaded");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &FxHashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content).map_err(|e| {
            Error::settings(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}

// ============================================================================
// Tests
// ============================================================================
