//! Composition root.

use crate::event_router::{EventRouter, EventSubscription, SessionLookup};
use crate::events::BackendEvent;
use crate::tab_manager::{RestoreReport, TabManager};
use chatplug_core::config::ClientConfig;
use chatplug_core::error::Result;
use chatplug_core::page::{PageCoordinator, PageHistoryRepository};
use chatplug_core::plugin::{ConversationContext, Notifier, PluginBackend, PluginInstanceRegistry};
use chatplug_core::session::{HistoryRepository, MessageRole, SessionStore};
use chatplug_core::shortcut::{ShortcutRepository, ShortcutStore};
use chatplug_core::stream::StreamRegistry;
use chatplug_core::tab::TabRepository;
use chatplug_infrastructure::{
    ChatplugPaths, JsonHistoryRepository, JsonPageHistoryRepository, JsonShortcutRepository,
    JsonTabRepository,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Persistence backends used by the client's stores.
#[derive(Clone)]
pub struct ClientRepositories {
    pub history: Arc<dyn HistoryRepository>,
    pub tabs: Arc<dyn TabRepository>,
    pub page_history: Arc<dyn PageHistoryRepository>,
    pub shortcuts: Arc<dyn ShortcutRepository>,
}

impl ClientRepositories {
    /// JSON files under the resolved data directory.
    pub fn json(paths: &ChatplugPaths) -> Self {
        Self {
            history: Arc::new(JsonHistoryRepository::new(paths.history_file())),
            tabs: Arc::new(JsonTabRepository::new(paths.tabs_file())),
            page_history: Arc::new(JsonPageHistoryRepository::new(paths.page_history_file())),
            shortcuts: Arc::new(JsonShortcutRepository::new(paths.shortcuts_file())),
        }
    }
}

/// What [`ChatClient::initialize`] restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupSummary {
    pub sessions: usize,
    pub page_history: usize,
    pub shortcuts: usize,
    pub plugins: usize,
    pub tabs: RestoreReport,
}

/// Owns every client service and wires them together.
///
/// Construction performs no I/O; call [`ChatClient::initialize`] before use.
pub struct ChatClient {
    config: ClientConfig,
    sessions: Arc<SessionStore>,
    streams: Arc<StreamRegistry>,
    plugins: Arc<PluginInstanceRegistry>,
    pages: Arc<PageCoordinator>,
    tabs: Arc<TabManager>,
    shortcuts: Arc<ShortcutStore>,
    router: Arc<EventRouter>,
}

impl ChatClient {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn PluginBackend>,
        notifier: Arc<dyn Notifier>,
        repositories: ClientRepositories,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(repositories.history));
        let streams = Arc::new(StreamRegistry::new(config.stream_grace_period()));
        let plugins = Arc::new(PluginInstanceRegistry::new(
            backend,
            notifier,
            sessions.clone(),
        ));
        let pages = Arc::new(PageCoordinator::with_history_limit(
            plugins.clone(),
            sessions.clone(),
            repositories.page_history,
            config.page_history_limit,
        ));
        let tabs = Arc::new(TabManager::with_max_tabs(
            plugins.clone(),
            sessions.clone(),
            pages.clone(),
            repositories.tabs,
            config.max_tabs,
        ));
        let shortcuts = Arc::new(ShortcutStore::new(repositories.shortcuts));
        let lookup: Arc<dyn SessionLookup> = tabs.clone();
        let router = Arc::new(EventRouter::new(
            sessions.clone(),
            streams.clone(),
            plugins.clone(),
            pages.clone(),
            lookup,
        ));

        Self {
            config,
            sessions,
            streams,
            plugins,
            pages,
            tabs,
            shortcuts,
            router,
        }
    }

    /// Builds a client persisting to the JSON files under `paths`.
    pub fn with_file_storage(
        config: ClientConfig,
        paths: &ChatplugPaths,
        backend: Arc<dyn PluginBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let repositories = ClientRepositories::json(paths);
        Self::new(config, backend, notifier, repositories)
    }

    /// Restores persisted state and reattaches restored tabs.
    ///
    /// Order matters: tabs reference sessions, and remounting needs the
    /// plugin catalog.
    pub async fn initialize(&self) -> StartupSummary {
        let sessions = self.sessions.initialize().await;
        let page_history = self.pages.initialize().await;
        let shortcuts = self.shortcuts.initialize().await;
        let plugins = self.plugins.load_plugins().await;
        let tabs = self.tabs.initialize().await;

        tracing::info!(
            "[ChatClient] Initialized: {} session(s), {} plugin(s), {} tab(s)",
            sessions,
            plugins,
            tabs.tabs
        );
        StartupSummary {
            sessions,
            page_history,
            shortcuts,
            plugins,
            tabs,
        }
    }

    pub fn start_event_loop(&self, rx: mpsc::UnboundedReceiver<BackendEvent>) -> EventSubscription {
        self.router.start(rx)
    }

    /// Records `text` as a user message and sends it to the resolved instance.
    ///
    /// The session is the one bound to an explicitly named instance, else the
    /// active tab's, else the current page's. Returns the host's reply.
    pub async fn send_message(
        &self,
        text: &str,
        plugin_id: Option<&str>,
        instance_id: Option<&str>,
    ) -> Result<String> {
        let session_id = match instance_id {
            Some(instance_id) => self.tabs.get_session_id_by_instance_id(instance_id).await,
            None => None,
        };
        let session_id = match session_id {
            Some(id) => Some(id),
            None => match self.tabs.active_tab_target().await {
                Some(target) => target.session_id,
                None => self.pages.current_session_id().await,
            },
        };

        match session_id {
            Some(session_id) => {
                let message_id = self.sessions.generate_message_id();
                self.sessions
                    .add_message(&session_id, text, &message_id, MessageRole::User)
                    .await;
            }
            None => tracing::warn!("[ChatClient] No session to record outgoing message in"),
        }

        self.plugins
            .send_message(text, plugin_id, instance_id, &*self.tabs)
            .await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn streams(&self) -> &Arc<StreamRegistry> {
        &self.streams
    }

    pub fn plugins(&self) -> &Arc<PluginInstanceRegistry> {
        &self.plugins
    }

    pub fn pages(&self) -> &Arc<PageCoordinator> {
        &self.pages
    }

    pub fn tabs(&self) -> &Arc<TabManager> {
        &self.tabs
    }

    pub fn shortcuts(&self) -> &Arc<ShortcutStore> {
        &self.shortcuts
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }
}
