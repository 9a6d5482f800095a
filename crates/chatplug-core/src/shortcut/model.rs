//! Quick-phrase models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reusable phrase belonging to one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shortcut {
    /// Creates a shortcut with surrounding whitespace stripped from both fields.
    pub fn new(id: String, title: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Every plugin's shortcuts, keyed by plugin id. Newest first within a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutBook {
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<Shortcut>>,
}

impl ShortcutBook {
    pub fn total(&self) -> usize {
        self.plugins.values().map(Vec::len).sum()
    }
}

/// A shortcut together with the plugin that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginShortcut {
    pub plugin_id: String,
    #[serde(flatten)]
    pub shortcut: Shortcut,
}
