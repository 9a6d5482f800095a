//! Configuration service implementation.
//!
//! Loads the client configuration from `config.toml`. A missing file is
//! created with default values.

use crate::storage::AtomicFile;
use chatplug_core::config::ClientConfig;
use chatplug_core::error::Result;
use std::path::{Path, PathBuf};

/// Loads and saves [`ClientConfig`].
pub struct ConfigService {
    file: AtomicFile<ClientConfig>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicFile::toml(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the configuration, writing defaults if the file does not exist yet.
    pub fn load(&self) -> Result<ClientConfig> {
        match self.file.load()? {
            Some(config) => Ok(config),
            None => {
                let config = ClientConfig::default();
                self.file.save(&config)?;
                tracing::info!(
                    "[Config] Wrote default configuration to {}",
                    self.file.path().display()
                );
                Ok(config)
            }
        }
    }

    /// Loads the configuration, falling back to defaults on any error.
    pub fn load_or_default(&self) -> ClientConfig {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("[Config] Failed to load configuration, using defaults: {}", e);
            ClientConfig::default()
        })
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        self.file.save(config)
    }
}
