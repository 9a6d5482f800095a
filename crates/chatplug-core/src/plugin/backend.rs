//! Plugin host RPC boundary.

use async_trait::async_trait;

use super::model::{PluginMetadata, PluginStatus, SendMessageRequest};
use crate::error::Result;

/// Invoke-style RPC surface of the process hosting plugins.
///
/// Every call may take unbounded time. Failures reported by the host are
/// returned as [`crate::error::ChatError::Backend`].
#[async_trait]
pub trait PluginBackend: Send + Sync {
    async fn scan_plugins(&self) -> Result<Vec<PluginMetadata>>;

    /// Mounts a new instance. Returns a human-readable confirmation.
    async fn mount_plugin(&self, plugin_id: &str, instance_id: &str) -> Result<String>;

    async fn dispose_plugin(&self, instance_id: &str) -> Result<String>;

    async fn connect_plugin(&self, instance_id: &str) -> Result<String>;

    async fn disconnect_plugin(&self, instance_id: &str) -> Result<String>;

    /// `None` when the host does not know the instance.
    async fn get_plugin_status(&self, instance_id: &str) -> Result<Option<PluginStatus>>;

    async fn send_message_to_plugin(&self, request: SendMessageRequest) -> Result<String>;

    /// JSON-encoded UI schema of the instance, opaque to the client.
    async fn get_plugin_ui(&self, instance_id: &str) -> Result<String>;

    async fn handle_plugin_ui_event(
        &self,
        instance_id: &str,
        component_id: &str,
        value: &str,
    ) -> Result<bool>;
}
