//! Conversation session and message models.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept when a title is derived from a message.
pub const TITLE_MAX_CHARS: usize = 20;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed by the user.
    User,
    /// Produced by a plugin instance.
    Plugin,
    /// Generated by the client itself (lifecycle notices, etc.).
    System,
}

/// How a message's content is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Content is set once at creation.
    #[default]
    Normal,
    /// Content grows by appended chunks.
    Streaming,
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Completed,
    Active,
    Paused,
    Error,
    Cancelled,
}

/// A single message in a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub content: String,
    pub plugin_id: String,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
}

/// A persisted conversation belonging to one plugin.
///
/// Sessions are keyed by plugin, not by instance: a session survives the
/// instance that rendered it and can be reopened by any later instance of
/// the same plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub plugin_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates an empty session. Without an explicit title a timestamped default is used.
    pub fn new(id: String, plugin_id: String, title: Option<&str>) -> Self {
        let now = Utc::now();
        let title = match title {
            Some(title) => title.to_string(),
            None => default_session_title(),
        };
        Self {
            id,
            title,
            messages: Vec::new(),
            plugin_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds a message of this session by id.
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// Message and session counts of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PluginSessionCount {
    pub session_count: usize,
    pub message_count: usize,
}

fn default_session_title() -> String {
    format!("New conversation {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Derives a session title from message content.
///
/// Content longer than [`TITLE_MAX_CHARS`] characters is cut and suffixed with `...`.
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
