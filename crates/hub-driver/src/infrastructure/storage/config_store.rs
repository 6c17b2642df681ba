//! Configuration store implementations.
//!
//! The TOML layout is one `[[entities]]` table per configured device:
//!
//! ```toml
//! [[entities]]
//! entity_id = "10_0_0_5"
//! entity_name = "Living room TV"
//! host = "10.0.0.5"
//!
//! [entities.settings]
//! input = "hdmi1"
//! ```
//!
//! A missing file reads as an empty configuration, so the very first run
//! needs no setup.  Writes go to a sibling temporary file that is then
//! renamed over the real one; a crash mid-write leaves the previous
//! configuration intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hub_core::Configuration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::application::ports::{ConfigurationStore, StoreError};

const CONFIG_FILE_NAME: &str = "devices.toml";

// ── File-backed store ─────────────────────────────────────────────────────────

pub struct TomlConfigurationStore {
    path: PathBuf,
    // Serializes file access within this process.
    io_lock: Mutex<()>,
}

impl TomlConfigurationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl ConfigurationStore for TomlConfigurationStore {
    async fn get(&self) -> Result<Configuration, StoreError> {
        let _guard = self.io_lock.lock().await;

        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Configuration::default()),
            Err(e) => Err(self.io_error(&self.path, e)),
        }
    }

    async fn update(&self, configuration: Configuration) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(&configuration)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let _guard = self.io_lock.lock().await;

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_error(dir, e))?;
        }

        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| self.io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))?;

        debug!(path = %self.path.display(), devices = configuration.len(), "configuration saved");
        Ok(())
    }
}

// ── In-memory store ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryConfigurationStore {
    configuration: RwLock<Configuration>,
}

impl MemoryConfigurationStore {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration: RwLock::new(configuration),
        }
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    async fn get(&self) -> Result<Configuration, StoreError> {
        Ok(self.configuration.read().await.clone())
    }

    async fn update(&self, configuration: Configuration) -> Result<(), StoreError> {
        *self.configuration.write().await = configuration;
        Ok(())
    }
}

// ── Default location ──────────────────────────────────────────────────────────

/// Platform config file path, e.g. `~/.config/hub-driver/devices.toml` on
/// Linux.  `None` when the platform base directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    platform_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("HubDriver"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hub-driver"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("HubDriver")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
