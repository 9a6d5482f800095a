//! Plugin and plugin-instance models.

use crate::session::Message;
use serde::{Deserialize, Serialize};

/// Descriptor of an installed plugin, as reported by the plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    #[serde(default)]
    pub disabled: bool,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,
    #[serde(default)]
    pub config_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Outgoing messages of this plugin carry the session history.
    #[serde(default)]
    pub require_history: bool,
}

/// Client-side view of one running plugin instance.
///
/// Invariant: `is_connected` implies `is_mounted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInstance {
    pub instance_id: String,
    pub plugin_id: String,
    pub is_mounted: bool,
    pub is_connected: bool,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginInstance {
    pub fn new(instance_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            plugin_id: plugin_id.into(),
            is_mounted: false,
            is_connected: false,
            is_loading: false,
            error: None,
        }
    }
}

/// Live state of an instance as reported by the plugin host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PluginStatus {
    pub is_mounted: bool,
    pub is_connected: bool,
}

/// Payload of the `send_message_to_plugin` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub plugin_id: String,
    pub instance_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
}

/// A resolved (plugin, instance, session) target of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTarget {
    pub plugin_id: String,
    pub instance_id: String,
    pub session_id: Option<String>,
}
