use super::backend::PluginBackend;
use super::context::ConversationContext;
use super::model::{
    ConversationTarget, PluginInstance, PluginMetadata, PluginStatus, SendMessageRequest,
};
use super::notifier::Notifier;
use crate::error::{ChatError, Result};
use crate::session::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const INSTANCE_MISSING_NOTE: &str = "Plugin instance does not exist";

/// Owns the per-instance mount/connect state and relays calls to the plugin host.
///
/// Local state is only updated after the host confirms an operation. No lock
/// is held while a backend call is in flight, so a late confirmation for an
/// instance that has since been disposed is a no-op.
fn mount_error(reason: Option<String>) -> ChatError {
    ChatError::backend(
        "mount_plugin",
        reason.unwrap_or_else(|| "mount rejected".to_string()),
    )
}

pub struct PluginInstanceRegistry {
    backend: Arc<dyn PluginBackend>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<SessionStore>,
    plugins: RwLock<Vec<PluginMetadata>>,
    instances: RwLock<HashMap<String, PluginInstance>>,
}

impl PluginInstanceRegistry {
    pub fn new(
        backend: Arc<dyn PluginBackend>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            backend,
            notifier,
            sessions,
            plugins: RwLock::new(Vec::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    // ============================================================================
    // Plugin catalog
    // ============================================================================

    /// Refreshes the plugin catalog from the host.
    ///
    /// On failure the previous catalog is kept. Returns the catalog size.
    pub async fn load_plugins(&self) -> usize {
        tracing::debug!("[PluginRegistry] Scanning plugins");
        match self.backend.scan_plugins().await {
            Ok(plugins) => {
                let count = plugins.len();
                *self.plugins.write().await = plugins;
                tracing::info!("[PluginRegistry] Loaded {} plugin(s)", count);
                count
            }
            Err(e) => {
                tracing::error!("[PluginRegistry] Failed to load plugins: {}", e);
                self.notifier.error("Failed to load plugin list");
                self.plugins.read().await.len()
            }
        }
    }

    pub async fn refresh_plugins(&self) -> usize {
        self.load_plugins().await
    }

    pub async fn plugins(&self) -> Vec<PluginMetadata> {
        self.plugins.read().await.clone()
    }

    pub async fn plugin_metadata(&self, plugin_id: &str) -> Option<PluginMetadata> {
        let plugins = self.plugins.read().await;
        plugins.iter().find(|p| p.id == plugin_id).cloned()
    }

    // ============================================================================
    // Instance state
    // ============================================================================

    pub async fn get_instance_state(&self, instance_id: &str) -> Option<PluginInstance> {
        self.instances.read().await.get(instance_id).cloned()
    }

    pub async fn instances(&self) -> Vec<PluginInstance> {
        self.instances.read().await.values().cloned().collect()
    }

    /// Applies `update` to the instance record, creating it if needed.
    async fn upsert_instance(
        &self,
        instance_id: &str,
        plugin_id: &str,
        update: impl FnOnce(&mut PluginInstance),
    ) {
        let mut instances = self.instances.write().await;
        let instance = instances
            .entry(instance_id.to_string())
            .or_insert_with(|| PluginInstance::new(instance_id, plugin_id));
        update(instance);
    }

    /// Applies `update` only if the instance is still known.
    async fn update_existing(
        &self,
        instance_id: &str,
        update: impl FnOnce(&mut PluginInstance),
    ) -> bool {
        let mut instances = self.instances.write().await;
        match instances.get_mut(instance_id) {
            Some(instance) => {
                update(instance);
                true
            }
            None => false,
        }
    }

    /// Reads the live instance state from the host and stores it locally.
    ///
    /// A host that does not know the instance yields a not-mounted status
    /// and records a note on the instance.
    pub async fn sync_instance_state(
        &self,
        plugin_id: &str,
        instance_id: &str,
    ) -> Result<PluginStatus> {
        match self.backend.get_plugin_status(instance_id).await {
            Ok(Some(status)) => {
                self.upsert_instance(instance_id, plugin_id, |instance| {
                    instance.is_mounted = status.is_mounted;
                    instance.is_connected = status.is_mounted && status.is_connected;
                    instance.is_loading = false;
                    instance.error = None;
                })
                .await;
                Ok(status)
            }
            Ok(None) => {
                self.upsert_instance(instance_id, plugin_id, |instance| {
                    instance.is_mounted = false;
                    instance.is_connected = false;
                    instance.is_loading = false;
                    instance.error = Some(INSTANCE_MISSING_NOTE.to_string());
                })
                .await;
                Ok(PluginStatus::default())
            }
            Err(e) => {
                tracing::error!(
                    "[PluginRegistry] Failed to sync state of instance {}: {}",
                    instance_id,
                    e
                );
                let message = e.backend_message();
                self.upsert_instance(instance_id, plugin_id, |instance| {
                    instance.is_loading = false;
                    instance.error = Some(message);
                })
                .await;
                Err(e)
            }
        }
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Mounts `instance_id` as a new instance of `plugin_id`.
    ///
    /// Never fails: a rejected mount is recorded on the instance, notified,
    /// and signaled by `None`.
    pub async fn mount_plugin_by_id(&self, plugin_id: &str, instance_id: &str) -> Option<String> {
        self.upsert_instance(instance_id, plugin_id, |instance| {
            instance.is_loading = true;
            instance.error = None;
        })
        .await;

        match self.backend.mount_plugin(plugin_id, instance_id).await {
            Ok(confirmation) => {
                self.upsert_instance(instance_id, plugin_id, |instance| {
                    instance.is_mounted = true;
                    instance.is_connected = false;
                    instance.is_loading = false;
                    instance.error = None;
                })
                .await;
                tracing::info!(
                    "[PluginRegistry] Mounted {} as instance {}",
                    plugin_id,
                    instance_id
                );
                self.notifier.success(&confirmation);
                Some(instance_id.to_string())
            }
            Err(e) => {
                let message = e.backend_message();
                self.upsert_instance(instance_id, plugin_id, |instance| {
                    instance.is_loading = false;
                    instance.error = Some(message.clone());
                })
                .await;
                tracing::error!(
                    "[PluginRegistry] Failed to mount {} ({}): {}",
                    plugin_id,
                    instance_id,
                    message
                );
                self.notifier
                    .error(&format!("Plugin mount failed: {}", message));
                None
            }
        }
    }

    /// Marks a known instance as loading. Returns `false` for an unknown instance.
    async fn begin_operation(&self, instance_id: &str, operation: &str) -> bool {
        let known = self
            .update_existing(instance_id, |instance| {
                instance.is_loading = true;
                instance.error = None;
            })
            .await;
        if !known {
            tracing::warn!(
                "[PluginRegistry] Cannot {} unknown instance {}",
                operation,
                instance_id
            );
        }
        known
    }

    async fn record_failure(&self, instance_id: &str, label: &str, error: &ChatError) {
        let message = error.backend_message();
        tracing::error!(
            "[PluginRegistry] {} failed for instance {}: {}",
            label,
            instance_id,
            message
        );
        let note = message.clone();
        self.update_existing(instance_id, |instance| {
            instance.is_loading = false;
            instance.error = Some(note);
        })
        .await;
        self.notifier
            .error(&format!("Plugin instance {} failed: {}", label, message));
    }

    /// Disposes a known instance and deletes its local record.
    pub async fn dispose_plugin_instance(&self, instance_id: &str) -> bool {
        if !self.begin_operation(instance_id, "dispose").await {
            return false;
        }

        match self.backend.dispose_plugin(instance_id).await {
            Ok(confirmation) => {
                self.instances.write().await.remove(instance_id);
                tracing::info!("[PluginRegistry] Disposed instance {}", instance_id);
                self.notifier.success(&confirmation);
                true
            }
            Err(e) => {
                self.record_failure(instance_id, "dispose", &e).await;
                false
            }
        }
    }

    pub async fn connect_plugin_instance(&self, instance_id: &str) -> bool {
        if !self.begin_operation(instance_id, "connect").await {
            return false;
        }

        match self.backend.connect_plugin(instance_id).await {
            Ok(confirmation) => {
                self.update_existing(instance_id, |instance| {
                    instance.is_mounted = true;
                    instance.is_connected = true;
                    instance.is_loading = false;
                })
                .await;
                self.notifier.success(&confirmation);
                true
            }
            Err(e) => {
                self.record_failure(instance_id, "connect", &e).await;
                false
            }
        }
    }

    pub async fn disconnect_plugin_instance(&self, instance_id: &str) -> bool {
        if !self.begin_operation(instance_id, "disconnect").await {
            return false;
        }

        match self.backend.disconnect_plugin(instance_id).await {
            Ok(confirmation) => {
                self.update_existing(instance_id, |instance| {
                    instance.is_connected = false;
                    instance.is_loading = false;
                })
                .await;
                self.notifier.success(&confirmation);
                true
            }
            Err(e) => {
                self.record_failure(instance_id, "disconnect", &e).await;
                false
            }
        }
    }

    /// Reattaches to an instance that may already be running in the host.
    ///
    /// The host is always asked for the live state, since the local record
    /// may have been rebuilt from storage. A not-mounted instance is mounted
    /// exactly once; a mounted one is returned as is.
    pub async fn switch_to_existing_instance(
        &self,
        plugin_id: &str,
        instance_id: &str,
    ) -> Result<String> {
        let status = self.sync_instance_state(plugin_id, instance_id).await?;

        if status.is_mounted {
            tracing::debug!(
                "[PluginRegistry] Instance {} already mounted, reusing it",
                instance_id
            );
            return Ok(instance_id.to_string());
        }

        match self.mount_plugin_by_id(plugin_id, instance_id).await {
            Some(id) => Ok(id),
            None => {
                let reason = self
                    .get_instance_state(instance_id)
                    .await
                    .and_then(|instance| instance.error);
                Err(mount_error(reason))
            }
        }
    }

    /// Mounts an instance id nothing refers to yet.
    ///
    /// On failure the instance record is dropped again, so rejected tab and
    /// page creations leave no trace in the registry.
    pub async fn mount_new_instance(&self, plugin_id: &str, instance_id: &str) -> Result<String> {
        if let Some(id) = self.mount_plugin_by_id(plugin_id, instance_id).await {
            return Ok(id);
        }
        let reason = self
            .instances
            .write()
            .await
            .remove(instance_id)
            .and_then(|instance| instance.error);
        Err(mount_error(reason))
    }

    // ============================================================================
    // Messaging
    // ============================================================================

    async fn resolve_target(
        &self,
        plugin_id: Option<&str>,
        instance_id: Option<&str>,
        context: &dyn ConversationContext,
    ) -> Option<ConversationTarget> {
        let tab = context.active_tab_target().await;
        let page = context.current_page_target().await;

        let mut plugin = plugin_id.map(str::to_string);
        let mut instance = instance_id.map(str::to_string);
        for target in [&tab, &page].into_iter().flatten() {
            if plugin.is_some() && instance.is_some() {
                break;
            }
            plugin.get_or_insert_with(|| target.plugin_id.clone());
            instance.get_or_insert_with(|| target.instance_id.clone());
        }

        let session_id = tab
            .and_then(|t| t.session_id)
            .or_else(|| page.and_then(|p| p.session_id));

        Some(ConversationTarget {
            plugin_id: plugin?,
            instance_id: instance?,
            session_id,
        })
    }

    /// Sends `text` to a plugin instance and returns the host's reply.
    ///
    /// Missing ids are taken from the active tab, then the current page.
    /// Plugins that require history get the resolved session's messages.
    pub async fn send_message(
        &self,
        text: &str,
        plugin_id: Option<&str>,
        instance_id: Option<&str>,
        context: &dyn ConversationContext,
    ) -> Result<String> {
        let Some(target) = self.resolve_target(plugin_id, instance_id, context).await else {
            let err = ChatError::precondition(
                "Unable to determine the target plugin instance: no active tab or page",
            );
            self.notifier
                .error(&format!("Failed to send message: {}", err));
            return Err(err);
        };

        let requires_history = self
            .plugin_metadata(&target.plugin_id)
            .await
            .is_some_and(|p| p.require_history);

        let history = match (&target.session_id, requires_history) {
            (Some(session_id), true) => {
                Some(self.sessions.get_messages_by_session_id(session_id).await)
            }
            _ => None,
        };

        let request = SendMessageRequest {
            plugin_id: target.plugin_id,
            instance_id: target.instance_id,
            message: text.to_string(),
            history,
        };

        self.backend
            .send_message_to_plugin(request)
            .await
            .inspect_err(|e| {
                self.notifier
                    .error(&format!("Failed to send message: {}", e.backend_message()));
            })
    }

    // ============================================================================
    // Plugin UI pass-through
    // ============================================================================

    pub async fn get_plugin_ui(&self, instance_id: &str) -> Result<String> {
        self.backend.get_plugin_ui(instance_id).await
    }

    pub async fn handle_plugin_ui_event(
        &self,
        instance_id: &str,
        component_id: &str,
        value: &str,
    ) -> Result<bool> {
        tracing::debug!(
            "[PluginRegistry] UI event {} on instance {}",
            component_id,
            instance_id
        );
        self.backend
            .handle_plugin_ui_event(instance_id, component_id, value)
            .await
    }
}
