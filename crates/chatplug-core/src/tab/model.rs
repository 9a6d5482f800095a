//! Tab domain models.
//!
//! Tabs are views binding one plugin instance to one session. The tab list
//! is persisted so tabs (and their backend instances) can be restored on restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open tab.
///
/// Several tabs may share an `instance_id`; closing one of them leaves the
/// instance running for the others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Unique tab identifier (`tab_<uuid>`)
    pub id: String,
    /// Display title
    pub title: String,
    pub plugin_id: String,
    /// Backing plugin instance
    pub instance_id: String,
    /// Conversation shown in the tab; may be repointed without touching the instance
    pub session_id: String,
    pub is_active: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Persisted tab state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub active_tab_id: Option<String>,
    /// Counter used for default tab titles (`"<plugin> <n>"`).
    #[serde(default = "first_tab_index")]
    pub next_tab_index: u32,
}

fn first_tab_index() -> u32 {
    1
}

impl Default for TabSnapshot {
    fn default() -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            next_tab_index: first_tab_index(),
        }
    }
}

/// Aggregated session statistics of one plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginSessionStats {
    pub plugin_id: String,
    pub total_sessions: usize,
    pub total_messages: usize,
    /// Latest session update, or now when the plugin has no sessions.
    pub last_activity: DateTime<Utc>,
    /// Session ids currently open in a tab.
    pub active_sessions: Vec<String>,
}
