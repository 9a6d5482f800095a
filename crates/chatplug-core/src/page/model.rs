//! Page (current conversation context) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The (plugin, instance, session) triple currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub plugin_id: String,
    pub instance_id: String,
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageState {
    pub fn new(
        plugin_id: impl Into<String>,
        instance_id: impl Into<String>,
        session_id: Option<String>,
        title: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            plugin_id: plugin_id.into(),
            instance_id: instance_id.into(),
            session_id,
            title,
            created_at: now,
            updated_at: now,
        }
    }

    /// Two pages are the same visit target when their triples match.
    pub fn same_target(&self, other: &PageState) -> bool {
        self.plugin_id == other.plugin_id
            && self.instance_id == other.instance_id
            && self.session_id == other.session_id
    }
}

/// One recorded visit in the page history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHistoryEntry {
    pub id: String,
    pub page_state: PageState,
    pub timestamp: DateTime<Utc>,
}
