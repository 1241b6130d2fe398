//! Configuration loading for docsync.
//!
//! Configuration is loaded from a TOML file: the `--config` path if given,
//! otherwise `docsync.toml` in the data directory when present. Every field
//! has a default, so the file and each of its sections are optional.

use anyhow::{Context, Result};
use docsync_client::SyncConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the data directory.
pub const CONFIG_FILE: &str = "docsync.toml";

/// Root configuration for docsync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Client configuration.
    #[serde(default)]
    pub client: ClientConfig,
    /// Document store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Client name used in logs (default: docsync-cli).
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Batches held while offline (default: 256).
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

/// Document store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Directory holding document files (default: `<data-dir>/documents`).
    /// Relative paths are resolved against the data directory.
    pub dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset (default: warn).
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_client_name() -> String {
    "docsync-cli".to_string()
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load the explicit config file, or `docsync.toml` from the data
    /// directory, or fall back to defaults.
    pub async fn load(data_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path).await;
        }
        let path = data_dir.join(CONFIG_FILE);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Self::from_file(&path).await;
        }
        Ok(Self::default())
    }

    /// Directory of the filesystem document store.
    pub fn documents_dir(&self, data_dir: &Path) -> PathBuf {
        match &self.store.dir {
            Some(dir) => data_dir.join(dir),
            None => data_dir.join("documents"),
        }
    }

    /// Client configuration for a SyncClient.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.client.name).with_outbox_capacity(self.client.outbox_capacity)
    }
}
