//! Tab lifecycle management.
//!
//! Tabs bind one plugin instance to one session. `TabManager` composes the
//! plugin registry, session store and page coordinator to create, switch and
//! close tabs, and owns the restart protocol that restores persisted tabs and
//! reattaches their backend instances.

use crate::event_router::SessionLookup;
use async_trait::async_trait;
use chatplug_core::config::DEFAULT_MAX_TABS;
use chatplug_core::error::{ChatError, Result};
use chatplug_core::ids;
use chatplug_core::page::{PageCoordinator, PageState};
use chatplug_core::plugin::{ConversationContext, ConversationTarget, PluginInstanceRegistry};
use chatplug_core::session::SessionStore;
use chatplug_core::tab::{PluginSessionStats, Tab, TabRepository, TabSnapshot};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct TabState {
    tabs: Vec<Tab>,
    active_tab_id: Option<String>,
    next_tab_index: u32,
    /// Tab creations past the capacity check that have not been appended yet.
    pending_creations: usize,
}

impl TabState {
    fn snapshot(&self) -> TabSnapshot {
        TabSnapshot {
            tabs: self.tabs.clone(),
            active_tab_id: self.active_tab_id.clone(),
            next_tab_index: self.next_tab_index,
        }
    }

    fn position(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn active_tab(&self) -> Option<&Tab> {
        let active_id = self.active_tab_id.as_deref()?;
        self.tabs.iter().find(|t| t.id == active_id)
    }

    /// Marks `tab_id` as the only active tab.
    fn activate(&mut self, tab_id: &str) {
        for tab in &mut self.tabs {
            tab.is_active = tab.id == tab_id;
        }
        self.active_tab_id = Some(tab_id.to_string());
    }
}

/// Outcome of reattaching restored tabs to their backend instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemountReport {
    /// Unique (plugin, instance) pairs reattached successfully.
    pub remounted: usize,
    /// Unique (plugin, instance) pairs that could not be reattached.
    pub failed: usize,
    /// Tabs whose instance could not be reattached. They are kept.
    pub failed_tab_ids: Vec<String>,
}

/// Outcome of [`TabManager::load_from_storage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub tabs: usize,
    pub remount: RemountReport,
}

fn page_state_for(tab: &Tab) -> PageState {
    PageState {
        plugin_id: tab.plugin_id.clone(),
        instance_id: tab.instance_id.clone(),
        session_id: Some(tab.session_id.clone()),
        title: Some(tab.title.clone()),
        created_at: tab.created_at,
        updated_at: tab.updated_at,
    }
}

/// Owns the ordered collection of open tabs.
///
/// Invariants:
/// - at most `max_tabs` tabs exist
/// - exactly one tab is active whenever at least one tab exists
///
/// Constructed empty; call [`TabManager::initialize`] to restore persisted tabs.
pub struct TabManager {
    plugins: Arc<PluginInstanceRegistry>,
    sessions: Arc<SessionStore>,
    pages: Arc<PageCoordinator>,
    repository: Arc<dyn TabRepository>,
    max_tabs: usize,
    state: RwLock<TabState>,
}

impl TabManager {
    pub fn new(
        plugins: Arc<PluginInstanceRegistry>,
        sessions: Arc<SessionStore>,
        pages: Arc<PageCoordinator>,
        repository: Arc<dyn TabRepository>,
    ) -> Self {
        Self::with_max_tabs(plugins, sessions, pages, repository, DEFAULT_MAX_TABS)
    }

    pub fn with_max_tabs(
        plugins: Arc<PluginInstanceRegistry>,
        sessions: Arc<SessionStore>,
        pages: Arc<PageCoordinator>,
        repository: Arc<dyn TabRepository>,
        max_tabs: usize,
    ) -> Self {
        Self {
            plugins,
            sessions,
            pages,
            repository,
            max_tabs,
            state: RwLock::new(TabState {
                next_tab_index: 1,
                ..Default::default()
            }),
        }
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    async fn persist(&self, state: &TabState) {
        if let Err(e) = self.repository.save_tabs(&state.snapshot()).await {
            tracing::error!("[TabManager] Failed to persist tabs: {}", e);
        }
    }

    // ============================================================================
    // Restore
    // ============================================================================

    pub async fn initialize(&self) -> RestoreReport {
        self.load_from_storage().await
    }

    /// Restores persisted tabs and reattaches their plugin instances.
    ///
    /// Tabs whose instance cannot be reattached are kept. Afterwards the
    /// active tab's page is pushed again so the current context matches it.
    pub async fn load_from_storage(&self) -> RestoreReport {
        let snapshot = match self.repository.load_tabs().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("[TabManager] Failed to load tabs: {}", e);
                return RestoreReport::default();
            }
        };

        let tab_count = {
            let mut state = self.state.write().await;
            state.tabs = snapshot.tabs;
            state.next_tab_index = snapshot.next_tab_index.max(1);
            let active_id = snapshot
                .active_tab_id
                .filter(|id| state.tabs.iter().any(|t| &t.id == id))
                .or_else(|| state.tabs.first().map(|t| t.id.clone()));
            match active_id {
                Some(active_id) => state.activate(&active_id),
                None => state.active_tab_id = None,
            }
            state.tabs.len()
        };

        if tab_count == 0 {
            return RestoreReport::default();
        }

        let remount = self.remount_plugins_from_tabs().await;

        if let Some(active) = self.active_tab().await {
            tracing::info!(
                "[TabManager] Resyncing active tab {} ({})",
                active.title,
                active.instance_id
            );
            if let Err(e) = self.pages.switch_to_page(&page_state_for(&active)).await {
                tracing::error!(
                    "[TabManager] Failed to resync active tab {}: {}",
                    active.title,
                    e
                );
            }
        }

        tracing::info!("[TabManager] Restored {} tab(s) from storage", tab_count);
        RestoreReport {
            tabs: tab_count,
            remount,
        }
    }

    /// Reattaches the instance of every tab, once per unique (plugin, instance) pair.
    ///
    /// Pairs are handled concurrently; a failure does not affect the others.
    pub async fn remount_plugins_from_tabs(&self) -> RemountReport {
        let mut groups: Vec<(String, String, Vec<String>)> = Vec::new();
        for tab in self.tabs().await {
            match groups
                .iter_mut()
                .find(|(plugin_id, instance_id, _)| {
                    *plugin_id == tab.plugin_id && *instance_id == tab.instance_id
                }) {
                Some((_, _, tab_ids)) => tab_ids.push(tab.id),
                None => groups.push((tab.plugin_id, tab.instance_id, vec![tab.id])),
            }
        }

        if groups.is_empty() {
            return RemountReport::default();
        }

        tracing::info!(
            "[TabManager] Remounting {} plugin instance(s)",
            groups.len()
        );

        let results = join_all(groups.iter().map(|(plugin_id, instance_id, _)| {
            self.plugins
                .switch_to_existing_instance(plugin_id, instance_id)
        }))
        .await;

        let mut report = RemountReport::default();
        for ((plugin_id, instance_id, tab_ids), result) in groups.into_iter().zip(results) {
            match result {
                Ok(_) => report.remounted += 1,
                Err(e) => {
                    tracing::error!(
                        "[TabManager] Failed to remount {} ({}): {}",
                        plugin_id,
                        instance_id,
                        e
                    );
                    report.failed += 1;
                    report.failed_tab_ids.extend(tab_ids);
                }
            }
        }

        tracing::info!(
            "[TabManager] Remount finished: {} succeeded, {} failed",
            report.remounted,
            report.failed
        );
        if !report.failed_tab_ids.is_empty() {
            tracing::warn!(
                "[TabManager] Tabs without a live instance: {}",
                report.failed_tab_ids.join(", ")
            );
        }
        report
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Opens a tab on a freshly mounted instance of `plugin_id` and activates it.
    ///
    /// The capacity check happens before anything is allocated. A rejected
    /// mount aborts the creation before a session is created.
    pub async fn create_new_tab(&self, plugin_id: &str, title: Option<&str>) -> Result<Tab> {
        {
            let mut state = self.state.write().await;
            if state.tabs.len() + state.pending_creations >= self.max_tabs {
                tracing::warn!(
                    "[TabManager] Tab limit of {} reached, refusing new tab",
                    self.max_tabs
                );
                return Err(ChatError::CapacityExceeded {
                    entity_type: "tabs",
                    limit: self.max_tabs,
                });
            }
            state.pending_creations += 1;
        }

        let instance_id = ids::generate_instance_id();
        if let Err(e) = self.plugins.mount_new_instance(plugin_id, &instance_id).await {
            self.state.write().await.pending_creations -= 1;
            return Err(e);
        }

        let session_id = self.sessions.create_new_session(plugin_id, title).await;
        let metadata = self.plugins.plugin_metadata(plugin_id).await;

        let tab = {
            let mut state = self.state.write().await;
            state.pending_creations -= 1;

            let title = match title {
                Some(title) => title.to_string(),
                None => {
                    let name = metadata
                        .as_ref()
                        .map(|m| m.name.as_str())
                        .unwrap_or("Plugin");
                    format!("{} {}", name, state.next_tab_index)
                }
            };
            let now = Utc::now();
            let tab = Tab {
                id: ids::generate_tab_id(),
                title,
                plugin_id: plugin_id.to_string(),
                instance_id,
                session_id,
                is_active: false,
                is_pinned: false,
                created_at: now,
                updated_at: now,
                icon: metadata.as_ref().and_then(|m| m.icon.clone()),
                color: metadata.as_ref().and_then(|m| m.color.clone()),
            };
            state.tabs.push(tab.clone());
            state.next_tab_index += 1;
            self.persist(&state).await;
            tab
        };

        tracing::info!("[TabManager] Created tab {} ({})", tab.title, tab.id);

        if let Err(e) = self.switch_to_tab(&tab.id).await {
            tracing::error!(
                "[TabManager] Created tab {} but could not activate it: {}",
                tab.id,
                e
            );
            return Err(e);
        }

        let tab_id = tab.id.clone();
        Ok(self.find_tab(|t| t.id == tab_id).await.unwrap_or(tab))
    }

    /// Activates a tab and makes its (instance, session) the current page.
    ///
    /// Returns `Ok(false)` for an unknown tab. The activation is persisted
    /// even if reattaching the page's instance fails afterwards.
    pub async fn switch_to_tab(&self, tab_id: &str) -> Result<bool> {
        let page = {
            let mut state = self.state.write().await;
            let Some(index) = state.position(tab_id) else {
                tracing::warn!("[TabManager] Tab {} does not exist", tab_id);
                return Ok(false);
            };
            state.activate(tab_id);
            state.tabs[index].updated_at = Utc::now();
            let page = page_state_for(&state.tabs[index]);
            self.persist(&state).await;
            page
        };

        self.pages.switch_to_page(&page).await?;
        Ok(true)
    }

    /// Closes a tab.
    ///
    /// An active tab hands activation to its right neighbor (else the left one)
    /// first. The backing instance is disconnected and disposed only when no
    /// other tab references it. Returns `false` for an unknown tab.
    pub async fn close_tab(&self, tab_id: &str) -> bool {
        let (tab, neighbor_id) = {
            let state = self.state.read().await;
            let Some(index) = state.position(tab_id) else {
                tracing::warn!("[TabManager] Tab {} does not exist", tab_id);
                return false;
            };
            let tab = state.tabs[index].clone();
            let neighbor_id = if tab.is_active && state.tabs.len() > 1 {
                let neighbor = if index + 1 < state.tabs.len() {
                    index + 1
                } else {
                    index - 1
                };
                Some(state.tabs[neighbor].id.clone())
            } else {
                None
            };
            (tab, neighbor_id)
        };

        if tab.is_pinned {
            tracing::warn!("[TabManager] Closing pinned tab {}", tab.id);
        }

        if let Some(neighbor_id) = neighbor_id {
            if let Err(e) = self.switch_to_tab(&neighbor_id).await {
                tracing::warn!(
                    "[TabManager] Failed to switch to neighbor tab {}: {}",
                    neighbor_id,
                    e
                );
            }
        }

        let sharing = {
            let state = self.state.read().await;
            state
                .tabs
                .iter()
                .filter(|t| t.id != tab.id && t.instance_id == tab.instance_id)
                .count()
        };

        if sharing == 0 {
            self.plugins
                .disconnect_plugin_instance(&tab.instance_id)
                .await;
            self.plugins.dispose_plugin_instance(&tab.instance_id).await;
            tracing::info!(
                "[TabManager] Released instance {} (no other tab uses it)",
                tab.instance_id
            );
        } else {
            tracing::info!(
                "[TabManager] Keeping instance {} ({} other tab(s) use it)",
                tab.instance_id,
                sharing
            );
        }

        let mut state = self.state.write().await;
        if let Some(index) = state.position(&tab.id) {
            state.tabs.remove(index);
        }
        if state.tabs.is_empty() {
            state.active_tab_id = None;
        } else if state.active_tab().is_none() {
            let fallback = state.tabs[0].id.clone();
            state.activate(&fallback);
        }
        self.persist(&state).await;
        true
    }

    pub async fn close_all_tabs(&self) {
        let tab_ids: Vec<String> = self.tabs().await.into_iter().map(|t| t.id).collect();
        for tab_id in tab_ids {
            self.close_tab(&tab_id).await;
        }
    }

    pub async fn close_other_tabs(&self, keep_tab_id: &str) {
        let tab_ids: Vec<String> = self
            .tabs()
            .await
            .into_iter()
            .filter(|t| t.id != keep_tab_id)
            .map(|t| t.id)
            .collect();
        for tab_id in tab_ids {
            self.close_tab(&tab_id).await;
        }
    }

    pub async fn close_tabs_to_right(&self, tab_id: &str) {
        let tabs = self.tabs().await;
        let Some(index) = tabs.iter().position(|t| t.id == tab_id) else {
            return;
        };
        for tab in &tabs[index + 1..] {
            self.close_tab(&tab.id).await;
        }
    }

    // ============================================================================
    // Mutators
    // ============================================================================

    async fn update_tab(&self, tab_id: &str, update: impl FnOnce(&mut Tab)) -> bool {
        let mut state = self.state.write().await;
        let Some(index) = state.position(tab_id) else {
            return false;
        };
        update(&mut state.tabs[index]);
        state.tabs[index].updated_at = Utc::now();
        self.persist(&state).await;
        true
    }

    pub async fn rename_tab(&self, tab_id: &str, title: &str) -> bool {
        self.update_tab(tab_id, |tab| tab.title = title.to_string())
            .await
    }

    pub async fn toggle_tab_pin(&self, tab_id: &str) -> bool {
        self.update_tab(tab_id, |tab| tab.is_pinned = !tab.is_pinned)
            .await
    }

    /// Moves the tab at `from` to position `to`. Both indices must be in bounds.
    pub async fn move_tab(&self, from: usize, to: usize) -> bool {
        let mut state = self.state.write().await;
        let len = state.tabs.len();
        if from >= len || to >= len {
            return false;
        }
        let tab = state.tabs.remove(from);
        state.tabs.insert(to, tab);
        self.persist(&state).await;
        true
    }

    /// Repoints the active tab at another session of its instance.
    pub async fn update_current_tab_session(&self, session_id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(active_id) = state.active_tab_id.clone() else {
            tracing::warn!("[TabManager] No active tab to attach session {}", session_id);
            return false;
        };
        let Some(index) = state.position(&active_id) else {
            tracing::warn!("[TabManager] Active tab {} not found", active_id);
            return false;
        };
        let tab = &mut state.tabs[index];
        tab.session_id = session_id.to_string();
        tab.updated_at = Utc::now();
        tracing::debug!(
            "[TabManager] Tab {} now shows session {}",
            tab.title,
            session_id
        );
        self.persist(&state).await;
        true
    }

    /// Switches the current page to `session_id` and repoints the active tab.
    pub async fn switch_session_in_active_tab(&self, session_id: &str) -> Result<bool> {
        if !self.pages.switch_to_session(session_id).await? {
            return Ok(false);
        }
        if !self.update_current_tab_session(session_id).await {
            tracing::warn!("[TabManager] Page switched to {} but no tab followed", session_id);
        }
        Ok(true)
    }

    /// Starts a new session on the current instance and repoints the active tab.
    pub async fn create_new_session_in_active_tab(&self, title: Option<&str>) -> Result<String> {
        let session_id = self.pages.create_new_session_in_current_page(title).await?;
        if !self.update_current_tab_session(&session_id).await {
            tracing::warn!(
                "[TabManager] Session {} created but no tab followed",
                session_id
            );
        }
        Ok(session_id)
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Session shown by the first tab bound to `instance_id`.
    pub async fn get_session_id_by_instance_id(&self, instance_id: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .tabs
            .iter()
            .find(|t| t.instance_id == instance_id)
            .map(|t| t.session_id.clone())
    }

    pub async fn get_plugin_session_stats(&self, plugin_id: &str) -> PluginSessionStats {
        let sessions = self.sessions.get_sessions_by_plugin_id(plugin_id).await;
        let active_sessions = self
            .get_tabs_by_plugin_id(plugin_id)
            .await
            .into_iter()
            .map(|t| t.session_id)
            .collect();

        PluginSessionStats {
            plugin_id: plugin_id.to_string(),
            total_sessions: sessions.len(),
            total_messages: sessions.iter().map(|s| s.messages.len()).sum(),
            last_activity: sessions
                .iter()
                .map(|s| s.updated_at)
                .max()
                .unwrap_or_else(Utc::now),
            active_sessions,
        }
    }

    pub async fn get_tabs_by_plugin_id(&self, plugin_id: &str) -> Vec<Tab> {
        let state = self.state.read().await;
        state
            .tabs
            .iter()
            .filter(|t| t.plugin_id == plugin_id)
            .cloned()
            .collect()
    }

    pub async fn find_tab(&self, predicate: impl Fn(&Tab) -> bool) -> Option<Tab> {
        let state = self.state.read().await;
        state.tabs.iter().find(|t| predicate(t)).cloned()
    }

    pub async fn tabs(&self) -> Vec<Tab> {
        self.state.read().await.tabs.clone()
    }

    pub async fn active_tab(&self) -> Option<Tab> {
        self.state.read().await.active_tab().cloned()
    }

    pub async fn active_tab_id(&self) -> Option<String> {
        self.state.read().await.active_tab_id.clone()
    }

    pub async fn pinned_tabs(&self) -> Vec<Tab> {
        let state = self.state.read().await;
        state.tabs.iter().filter(|t| t.is_pinned).cloned().collect()
    }

    pub async fn unpinned_tabs(&self) -> Vec<Tab> {
        let state = self.state.read().await;
        state.tabs.iter().filter(|t| !t.is_pinned).cloned().collect()
    }

    pub async fn tab_count(&self) -> usize {
        self.state.read().await.tabs.len()
    }

    pub async fn can_create_new_tab(&self) -> bool {
        let state = self.state.read().await;
        state.tabs.len() + state.pending_creations < self.max_tabs
    }
}

#[async_trait]
impl SessionLookup for TabManager {
    async fn get_session_id_by_instance_id(&self, instance_id: &str) -> Option<String> {
        TabManager::get_session_id_by_instance_id(self, instance_id).await
    }
}

#[async_trait]
impl ConversationContext for TabManager {
    async fn active_tab_target(&self) -> Option<ConversationTarget> {
        self.active_tab().await.map(|tab| ConversationTarget {
            plugin_id: tab.plugin_id,
            instance_id: tab.instance_id,
            session_id: Some(tab.session_id),
        })
    }

    async fn current_page_target(&self) -> Option<ConversationTarget> {
        self.pages.current_page().await.map(|page| ConversationTarget {
            plugin_id: page.plugin_id,
            instance_id: page.instance_id,
            session_id: page.session_id,
        })
    }
}
