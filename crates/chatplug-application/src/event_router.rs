//! Routes backend events into the session store and stream registry.

use crate::events::{BackendEvent, LifecycleKind, PluginEvent, StreamEvent};
use async_trait::async_trait;
use chatplug_core::page::PageCoordinator;
use chatplug_core::plugin::PluginInstanceRegistry;
use chatplug_core::session::{MessageRole, MessageStatus, MessageType, SessionStore};
use chatplug_core::stream::{StreamRegistry, StreamStatus};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Finds the session a plugin instance is currently writing to.
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn get_session_id_by_instance_id(&self, instance_id: &str) -> Option<String>;
}

/// Handle of a running event loop.
pub struct EventSubscription {
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Aborts the loop. Events still queued are dropped.
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits until the sending side closes and every queued event is handled.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::error!("[EventRouter] Event loop terminated abnormally: {}", e);
            }
        }
    }
}

pub struct EventRouter {
    sessions: Arc<SessionStore>,
    streams: Arc<StreamRegistry>,
    plugins: Arc<PluginInstanceRegistry>,
    pages: Arc<PageCoordinator>,
    lookup: Arc<dyn SessionLookup>,
}

impl EventRouter {
    pub fn new(
        sessions: Arc<SessionStore>,
        streams: Arc<StreamRegistry>,
        plugins: Arc<PluginInstanceRegistry>,
        pages: Arc<PageCoordinator>,
        lookup: Arc<dyn SessionLookup>,
    ) -> Self {
        Self {
            sessions,
            streams,
            plugins,
            pages,
            lookup,
        }
    }

    /// Spawns the event loop. It ends when every sender of `rx` is dropped.
    pub fn start(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<BackendEvent>) -> EventSubscription {
        let router = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracing::debug!("[EventRouter] Event loop started");
            while let Some(event) = rx.recv().await {
                router.handle_event(event).await;
            }
            tracing::debug!("[EventRouter] Event source closed, loop finished");
        });
        EventSubscription { handle }
    }

    /// Parses and dispatches a single event. Malformed payloads are logged.
    pub async fn handle_event(&self, event: BackendEvent) {
        match PluginEvent::parse(&event) {
            Ok(parsed) => self.dispatch(parsed).await,
            Err(e) => tracing::error!(
                "[EventRouter] Failed to parse {} event: {}",
                event.channel,
                e
            ),
        }
    }

    pub async fn dispatch(&self, event: PluginEvent) {
        match event {
            PluginEvent::Message {
                plugin_id,
                instance_id,
                content,
                message_id,
            } => {
                self.on_message(&plugin_id, instance_id.as_deref(), &content, message_id)
                    .await
            }
            PluginEvent::Stream {
                plugin_id,
                instance_id,
                stream_id,
                event,
            } => {
                self.on_stream(&plugin_id, instance_id.as_deref(), &stream_id, event)
                    .await
            }
            PluginEvent::DisconnectRequest { instance_id } => {
                tracing::info!(
                    "[EventRouter] Host requested disconnect of {}",
                    instance_id
                );
                self.plugins.disconnect_plugin_instance(&instance_id).await;
            }
            PluginEvent::Lifecycle { kind, plugin } => self.on_lifecycle(kind, &plugin).await,
            PluginEvent::Unknown { channel } => {
                tracing::warn!("[EventRouter] Ignoring event on unknown channel {}", channel)
            }
        }
    }

    /// Session an incoming plugin message belongs to.
    ///
    /// Tries the tab bound to the instance, then the current page. Failing
    /// both, a new session is created and attached to the current page.
    async fn resolve_session(&self, plugin_id: &str, instance_id: Option<&str>) -> String {
        if let Some(instance_id) = instance_id {
            if let Some(session_id) = self.lookup.get_session_id_by_instance_id(instance_id).await {
                return session_id;
            }
        }
        if let Some(session_id) = self.pages.current_session_id().await {
            return session_id;
        }

        let session_id = self.sessions.create_new_session(plugin_id, None).await;
        if !self.pages.set_current_session(&session_id).await {
            tracing::debug!(
                "[EventRouter] No current page to attach session {}",
                session_id
            );
        }
        tracing::info!(
            "[EventRouter] Created session {} for unrouted {} message",
            session_id,
            plugin_id
        );
        session_id
    }

    async fn on_message(
        &self,
        plugin_id: &str,
        instance_id: Option<&str>,
        content: &str,
        message_id: Option<String>,
    ) {
        let session_id = self.resolve_session(plugin_id, instance_id).await;
        let message_id = message_id.unwrap_or_else(|| self.sessions.generate_message_id());
        if self
            .sessions
            .add_message(&session_id, content, &message_id, MessageRole::Plugin)
            .await
            .is_none()
        {
            tracing::warn!(
                "[EventRouter] Dropped message {} for missing session {}",
                message_id,
                session_id
            );
        }
    }

    /// Applies one stream event.
    ///
    /// Only `Start` resolves a session. The streaming message carries the
    /// stream id as its message id, and `SessionStore::update_message` finds
    /// a message across all sessions, so later events reach the same
    /// session without resolving it again. Once a stream is terminal, the
    /// registry refuses further transitions and the message is left alone.
    async fn on_stream(
        &self,
        plugin_id: &str,
        instance_id: Option<&str>,
        stream_id: &str,
        event: StreamEvent,
    ) {
        match event {
            StreamEvent::Start => {
                let session_id = self.resolve_session(plugin_id, instance_id).await;
                if self
                    .sessions
                    .add_message_to_session(
                        &session_id,
                        "",
                        stream_id,
                        MessageRole::Plugin,
                        MessageType::Streaming,
                        MessageStatus::Active,
                    )
                    .await
                    .is_none()
                {
                    tracing::warn!(
                        "[EventRouter] Stream {} has no session to write to",
                        stream_id
                    );
                    return;
                }
                self.streams
                    .start_stream(
                        stream_id,
                        plugin_id,
                        instance_id.unwrap_or_default(),
                        Some(stream_id),
                    )
                    .await;
            }
            StreamEvent::Data { chunk, is_final } => {
                let current = self
                    .streams
                    .get_stream_state(stream_id)
                    .await
                    .map(|state| state.status);
                if current.is_some_and(|status| status.is_terminal()) {
                    tracing::debug!(
                        "[EventRouter] Dropped chunk for finished stream {}",
                        stream_id
                    );
                    return;
                }
                let status = if is_final {
                    MessageStatus::Completed
                } else {
                    current.map_or(MessageStatus::Active, StreamStatus::message_status)
                };
                if !self.sessions.update_message(stream_id, &chunk, status).await {
                    tracing::warn!("[EventRouter] Data for unknown stream {}", stream_id);
                }
                if is_final {
                    self.streams
                        .end_stream(stream_id, StreamStatus::Completed)
                        .await;
                }
            }
            StreamEvent::End { success } => {
                if self.is_finished(stream_id).await {
                    tracing::debug!("[EventRouter] Stream {} already finished", stream_id);
                    return;
                }
                let status = if success {
                    StreamStatus::Completed
                } else {
                    StreamStatus::Error
                };
                self.mirror_status(stream_id, status).await;
                self.streams.end_stream(stream_id, status).await;
            }
            StreamEvent::Pause => {
                if self.streams.pause_stream(stream_id).await {
                    self.mirror_status(stream_id, StreamStatus::Paused).await;
                }
            }
            StreamEvent::Resume => {
                if self.streams.resume_stream(stream_id).await {
                    self.mirror_status(stream_id, StreamStatus::Active).await;
                }
            }
            StreamEvent::Cancel => {
                if self.streams.cancel_stream(stream_id).await {
                    self.mirror_status(stream_id, StreamStatus::Cancelled).await;
                }
            }
            StreamEvent::Unknown { kind } => {
                tracing::warn!(
                    "[EventRouter] Unknown stream event type {} for stream {}",
                    kind,
                    stream_id
                );
            }
        }
    }

    async fn is_finished(&self, stream_id: &str) -> bool {
        self.streams
            .get_stream_state(stream_id)
            .await
            .is_some_and(|state| state.status.is_terminal())
    }

    async fn mirror_status(&self, stream_id: &str, status: StreamStatus) {
        if !self
            .sessions
            .update_message(stream_id, "", status.message_status())
            .await
        {
            tracing::warn!(
                "[EventRouter] No message for stream {} to mark {:?}",
                stream_id,
                status
            );
        }
    }

    async fn on_lifecycle(&self, kind: LifecycleKind, plugin: &str) {
        let notice = format!("Plugin {} {}", plugin, kind.verb());
        match self.pages.current_session_id().await {
            Some(session_id) => {
                let message_id = self.sessions.generate_message_id();
                self.sessions
                    .add_message(&session_id, &notice, &message_id, MessageRole::System)
                    .await;
            }
            None => tracing::info!("[EventRouter] {}", notice),
        }
    }
}
