#![allow(dead_code)]

use async_trait::async_trait;
use chatplug_application::{ChatClient, ClientRepositories};
use chatplug_core::config::ClientConfig;
use chatplug_core::error::{ChatError, Result};
use chatplug_core::page::{PageHistoryEntry, PageHistoryRepository};
use chatplug_core::plugin::{
    Notifier, PluginBackend, PluginMetadata, PluginStatus, SendMessageRequest,
};
use chatplug_core::session::{ChatSession, HistoryRepository};
use chatplug_core::shortcut::{ShortcutBook, ShortcutRepository};
use chatplug_core::tab::{Tab, TabRepository, TabSnapshot};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn plugin(id: &str, name: &str) -> PluginMetadata {
    PluginMetadata {
        id: id.to_string(),
        disabled: false,
        name: name.to_string(),
        description: String::new(),
        version: "1.0.0".to_string(),
        author: None,
        library_path: None,
        config_path: String::new(),
        icon: Some(format!("{}.png", id)),
        color: Some("#3366ff".to_string()),
        require_history: false,
    }
}

/// Host double that keeps track of mounted instances and every call made.
#[derive(Default)]
pub struct MockBackend {
    pub plugins: Vec<PluginMetadata>,
    /// Live instances: instance id -> connected.
    pub live: Mutex<HashMap<String, bool>>,
    /// Plugins whose mounts are rejected.
    pub failing_mounts: Mutex<HashSet<String>>,
    /// When set, status queries fail as if the host were unreachable.
    pub failing_status: Mutex<bool>,
    pub mount_calls: Mutex<Vec<(String, String)>>,
    pub dispose_calls: Mutex<Vec<String>>,
    pub disconnect_calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<SendMessageRequest>>,
}

impl MockBackend {
    pub fn with_plugins(plugins: Vec<PluginMetadata>) -> Self {
        Self {
            plugins,
            ..Default::default()
        }
    }

    pub fn fail_mounts_for(&self, plugin_id: &str) {
        self.failing_mounts
            .lock()
            .unwrap()
            .insert(plugin_id.to_string());
    }

    pub fn fail_status_queries(&self) {
        *self.failing_status.lock().unwrap() = true;
    }

    /// Forgets every live instance, as a host restart would.
    pub fn restart(&self) {
        self.live.lock().unwrap().clear();
    }

    pub fn mount_count(&self) -> usize {
        self.mount_calls.lock().unwrap().len()
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_calls.lock().unwrap().len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_calls.lock().unwrap().len()
    }

    pub fn is_live(&self, instance_id: &str) -> bool {
        self.live.lock().unwrap().contains_key(instance_id)
    }
}

#[async_trait]
impl PluginBackend for MockBackend {
    async fn scan_plugins(&self) -> Result<Vec<PluginMetadata>> {
        Ok(self.plugins.clone())
    }

    async fn mount_plugin(&self, plugin_id: &str, instance_id: &str) -> Result<String> {
        self.mount_calls
            .lock()
            .unwrap()
            .push((plugin_id.to_string(), instance_id.to_string()));
        if self.failing_mounts.lock().unwrap().contains(plugin_id) {
            return Err(ChatError::backend("mount_plugin", "library not found"));
        }
        self.live
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), false);
        Ok(format!("Mounted {}", plugin_id))
    }

    async fn dispose_plugin(&self, instance_id: &str) -> Result<String> {
        self.dispose_calls
            .lock()
            .unwrap()
            .push(instance_id.to_string());
        self.live.lock().unwrap().remove(instance_id);
        Ok("Disposed".to_string())
    }

    async fn connect_plugin(&self, instance_id: &str) -> Result<String> {
        if let Some(connected) = self.live.lock().unwrap().get_mut(instance_id) {
            *connected = true;
        }
        Ok("Connected".to_string())
    }

    async fn disconnect_plugin(&self, instance_id: &str) -> Result<String> {
        self.disconnect_calls
            .lock()
            .unwrap()
            .push(instance_id.to_string());
        if let Some(connected) = self.live.lock().unwrap().get_mut(instance_id) {
            *connected = false;
        }
        Ok("Disconnected".to_string())
    }

    async fn get_plugin_status(&self, instance_id: &str) -> Result<Option<PluginStatus>> {
        if *self.failing_status.lock().unwrap() {
            return Err(ChatError::backend("get_plugin_status", "host unreachable"));
        }
        Ok(self
            .live
            .lock()
            .unwrap()
            .get(instance_id)
            .map(|connected| PluginStatus {
                is_mounted: true,
                is_connected: *connected,
            }))
    }

    async fn send_message_to_plugin(&self, request: SendMessageRequest) -> Result<String> {
        let reply = format!("echo: {}", request.message);
        self.sent.lock().unwrap().push(request);
        Ok(reply)
    }

    async fn get_plugin_ui(&self, _instance_id: &str) -> Result<String> {
        Ok("{}".to_string())
    }

    async fn handle_plugin_ui_event(
        &self,
        _instance_id: &str,
        _component_id: &str,
        _value: &str,
    ) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct MemoryHistoryRepository {
    pub sessions: Mutex<Vec<ChatSession>>,
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn load_sessions(&self) -> Result<Vec<ChatSession>> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<()> {
        *self.sessions.lock().unwrap() = sessions.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTabRepository {
    pub snapshot: Mutex<TabSnapshot>,
}

#[async_trait]
impl TabRepository for MemoryTabRepository {
    async fn load_tabs(&self) -> Result<TabSnapshot> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn save_tabs(&self, snapshot: &TabSnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap() = snapshot.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPageHistoryRepository {
    pub entries: Mutex<Vec<PageHistoryEntry>>,
}

#[async_trait]
impl PageHistoryRepository for MemoryPageHistoryRepository {
    async fn load_history(&self) -> Result<Vec<PageHistoryEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn save_history(&self, entries: &[PageHistoryEntry]) -> Result<()> {
        *self.entries.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryShortcutRepository {
    pub book: Mutex<ShortcutBook>,
}

#[async_trait]
impl ShortcutRepository for MemoryShortcutRepository {
    async fn load_shortcuts(&self) -> Result<ShortcutBook> {
        Ok(self.book.lock().unwrap().clone())
    }

    async fn save_shortcuts(&self, book: &ShortcutBook) -> Result<()> {
        *self.book.lock().unwrap() = book.clone();
        Ok(())
    }
}

pub struct TestClient {
    pub client: ChatClient,
    pub backend: Arc<MockBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub tabs_repository: Arc<MemoryTabRepository>,
}

impl TestClient {
    /// A client over in-memory storage offering `echo` and `notes`, not yet initialized.
    pub fn new(config: ClientConfig, snapshot: TabSnapshot) -> Self {
        let backend = Arc::new(MockBackend::with_plugins(vec![
            plugin("echo", "Echo"),
            plugin("notes", "Notes"),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());
        let tabs_repository = Arc::new(MemoryTabRepository {
            snapshot: Mutex::new(snapshot),
        });
        let repositories = ClientRepositories {
            history: Arc::new(MemoryHistoryRepository::default()),
            tabs: tabs_repository.clone(),
            page_history: Arc::new(MemoryPageHistoryRepository::default()),
            shortcuts: Arc::new(MemoryShortcutRepository::default()),
        };

        let client = ChatClient::new(config, backend.clone(), notifier.clone(), repositories);
        Self {
            client,
            backend,
            notifier,
            tabs_repository,
        }
    }

    pub fn persisted_tabs(&self) -> TabSnapshot {
        self.tabs_repository.snapshot.lock().unwrap().clone()
    }
}

pub async fn test_client() -> TestClient {
    test_client_with(ClientConfig::default()).await
}

pub async fn test_client_with(config: ClientConfig) -> TestClient {
    let test = TestClient::new(config, TabSnapshot::default());
    test.client.initialize().await;
    test
}

/// A persisted tab record, as found in storage after a restart.
pub fn stored_tab(id: &str, plugin_id: &str, instance_id: &str, session_id: &str) -> Tab {
    let now = Utc::now();
    Tab {
        id: id.to_string(),
        title: id.to_string(),
        plugin_id: plugin_id.to_string(),
        instance_id: instance_id.to_string(),
        session_id: session_id.to_string(),
        is_active: false,
        is_pinned: false,
        created_at: now,
        updated_at: now,
        icon: None,
        color: None,
    }
}

pub fn snapshot_of(tabs: Vec<Tab>, active_tab_id: &str) -> TabSnapshot {
    TabSnapshot {
        next_tab_index: tabs.len() as u32 + 1,
        tabs,
        active_tab_id: Some(active_tab_id.to_string()),
    }
}
