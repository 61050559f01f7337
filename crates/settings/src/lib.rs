//! Persisted connection settings.
//!
//! Stores the server address and code page last confirmed by a successful
//! probe so the next session can start without asking again.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default code page label for new settings.
pub const DEFAULT_ENCODING: &str = "cp866";

/// Errors from settings persistence.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Server address plus code page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub host: String,

    /// `0` until a port has been saved.
    #[serde(default)]
    pub port: u16,

    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.into()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            encoding: default_encoding(),
        }
    }
}

impl ConnectionSettings {
    /// Whether both host and port have been filled in.
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && self.port != 0
    }
}

/// Load/save boundary for connection settings.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<ConnectionSettings, SettingsError>;
    fn save(&self, settings: &ConnectionSettings) -> Result<(), SettingsError>;
}

/// Settings persisted as a pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the platform default location.
    pub fn at_default_path() -> Result<Self, SettingsError> {
        default_settings_path()
            .map(Self::new)
            .ok_or(SettingsError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<ConnectionSettings, SettingsError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no settings file, using defaults");
            return Ok(ConnectionSettings::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let settings: ConnectionSettings = serde_json::from_str(&data)?;
        debug!(path = ?self.path, host = %settings.host, port = settings.port, "loaded settings");
        Ok(settings)
    }

    fn save(&self, settings: &ConnectionSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!(path = ?self.path, "persisted settings");
        Ok(())
    }
}

/// In-memory store, for front-ends that keep nothing on disk.
#[derive(Default)]
pub struct MemoryStore {
    settings: RwLock<ConnectionSettings>,
}

impl MemoryStore {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<ConnectionSettings, SettingsError> {
        Ok(self
            .settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, settings: &ConnectionSettings) -> Result<(), SettingsError> {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings.clone();
        Ok(())
    }
}

/// Returns the default settings file path.
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("tcplink").join("connection.json"))
}

/// Returns the platform-specific config directory.
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
