//! Client configuration model.
//!
//! Stored as `config.toml` in the chatplug config directory. Every field has a
//! default so a partial (or missing) file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum number of open tabs.
pub const DEFAULT_MAX_TABS: usize = 20;

/// Default delay before a finished stream is evicted from the registry.
pub const DEFAULT_STREAM_GRACE_PERIOD_MS: u64 = 1000;

/// Default number of page-history entries kept.
pub const DEFAULT_PAGE_HISTORY_LIMIT: usize = 50;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound on simultaneously open tabs.
    pub max_tabs: usize,
    /// Grace window (milliseconds) a terminal stream stays queryable.
    pub stream_grace_period_ms: u64,
    /// Number of most-recent page-history entries kept.
    pub page_history_limit: usize,
    /// Default tracing filter directive when `RUST_LOG` is not set.
    pub log_level: String,
    /// Also write logs to a daily-rolling file under the logs directory.
    pub log_to_file: bool,
    /// Overrides the directory holding persisted state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_tabs: DEFAULT_MAX_TABS,
            stream_grace_period_ms: DEFAULT_STREAM_GRACE_PERIOD_MS,
            page_history_limit: DEFAULT_PAGE_HISTORY_LIMIT,
            log_level: "info".to_string(),
            log_to_file: false,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn stream_grace_period(&self) -> Duration {
        Duration::from_millis(self.stream_grace_period_ms)
    }
}
