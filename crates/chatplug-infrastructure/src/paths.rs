//! Path management for chatplug files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/chatplug/          # Config directory
//! └── config.toml              # Client configuration
//!
//! ~/.local/share/chatplug/     # Data directory (overridable via `data_dir`)
//! ├── history.json             # Sessions and messages
//! ├── tabs.json                # Open tabs, active tab, title counter
//! ├── page_history.json        # Page navigation history
//! └── logs/
//!     └── chatplug.log.YYYY-MM-DD
//! ```

use chatplug_core::config::ClientConfig;
use chatplug_core::error::{ChatError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "chatplug";

/// Resolved locations of every chatplug file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatplugPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ChatplugPaths {
    /// Platform directories (XDG on Linux, the native locations elsewhere).
    pub fn from_system() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ChatError::config("Cannot find config directory"))?
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ChatError::config("Cannot find data directory"))?
            .join(APP_DIR);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Puts config and data under a single root. Used by tests and portable setups.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    /// Applies the `data_dir` override of `config`, if any.
    pub fn apply_config(mut self, config: &ClientConfig) -> Self {
        if let Some(data_dir) = &config.data_dir {
            self.data_dir = data_dir.clone();
        }
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn tabs_file(&self) -> PathBuf {
        self.data_dir.join("tabs.json")
    }

    pub fn page_history_file(&self) -> PathBuf {
        self.data_dir.join("page_history.json")
    }

    pub fn shortcuts_file(&self) -> PathBuf {
        self.data_dir.join("shortcuts.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_root_layout() {
        let paths = ChatplugPaths::with_root("/tmp/chatplug-test");
        assert_eq!(
            paths.tabs_file(),
            PathBuf::from("/tmp/chatplug-test/tabs.json")
        );
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/chatplug-test/config.toml")
        );
    }

    #[test]
    fn test_data_dir_override() {
        let config = ClientConfig {
            data_dir: Some(PathBuf::from("/srv/chatplug")),
            ..Default::default()
        };
        let paths = ChatplugPaths::with_root("/tmp/root").apply_config(&config);
        assert_eq!(
            paths.history_file(),
            PathBuf::from("/srv/chatplug/history.json")
        );
        assert_eq!(paths.config_dir(), Path::new("/tmp/root"));
    }
}
