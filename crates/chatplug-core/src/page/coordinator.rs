use super::model::{PageHistoryEntry, PageState};
use super::repository::PageHistoryRepository;
use crate::config::DEFAULT_PAGE_HISTORY_LIMIT;
use crate::error::{ChatError, Result};
use crate::ids;
use crate::plugin::PluginInstanceRegistry;
use crate::session::SessionStore;
use chrono::{Local, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PageContext {
    current: Option<PageState>,
    /// Most recent first.
    history: Vec<PageHistoryEntry>,
}

/// Tracks the current (plugin, instance, session) triple and a
/// recency-ordered history of visited triples.
pub struct PageCoordinator {
    plugins: Arc<PluginInstanceRegistry>,
    sessions: Arc<SessionStore>,
    repository: Arc<dyn PageHistoryRepository>,
    history_limit: usize,
    state: RwLock<PageContext>,
}

impl PageCoordinator {
    pub fn new(
        plugins: Arc<PluginInstanceRegistry>,
        sessions: Arc<SessionStore>,
        repository: Arc<dyn PageHistoryRepository>,
    ) -> Self {
        Self::with_history_limit(plugins, sessions, repository, DEFAULT_PAGE_HISTORY_LIMIT)
    }

    pub fn with_history_limit(
        plugins: Arc<PluginInstanceRegistry>,
        sessions: Arc<SessionStore>,
        repository: Arc<dyn PageHistoryRepository>,
        history_limit: usize,
    ) -> Self {
        Self {
            plugins,
            sessions,
            repository,
            history_limit,
            state: RwLock::new(PageContext::default()),
        }
    }

    /// Loads the persisted page history. A storage failure leaves it empty.
    pub async fn initialize(&self) -> usize {
        let mut history = match self.repository.load_history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!("[PageCoordinator] Failed to load page history: {}", e);
                Vec::new()
            }
        };
        history.truncate(self.history_limit);

        let count = history.len();
        self.state.write().await.history = history;
        tracing::debug!("[PageCoordinator] Loaded {} history entries", count);
        count
    }

    async fn persist(&self, context: &PageContext) {
        if let Err(e) = self.repository.save_history(&context.history).await {
            tracing::error!("[PageCoordinator] Failed to persist page history: {}", e);
        }
    }

    // ============================================================================
    // Navigation
    // ============================================================================

    /// Mounts a fresh instance with a new session and makes it the current page.
    pub async fn create_new_page(&self, plugin_id: &str, title: Option<&str>) -> Result<PageState> {
        let instance_id = ids::generate_instance_id();

        self.plugins
            .mount_new_instance(plugin_id, &instance_id)
            .await?;

        let session_id = self.sessions.create_new_session(plugin_id, title).await;
        let title = match title {
            Some(title) => title.to_string(),
            None => format!("New page {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        };
        let page = PageState::new(plugin_id, instance_id, Some(session_id), Some(title));

        let mut context = self.state.write().await;
        context.current = Some(page.clone());
        self.record_visit(&mut context, &page);
        self.persist(&context).await;

        Ok(page)
    }

    /// Makes `page` current, reattaching to its instance without remounting it.
    pub async fn switch_to_page(&self, page: &PageState) -> Result<()> {
        self.plugins
            .switch_to_existing_instance(&page.plugin_id, &page.instance_id)
            .await?;

        if let Some(session_id) = &page.session_id {
            if !self.sessions.session_exists(session_id).await {
                tracing::warn!(
                    "[PageCoordinator] Session {} of page does not exist",
                    session_id
                );
            }
        }

        let mut context = self.state.write().await;
        let mut current = page.clone();
        current.updated_at = Utc::now();
        context.current = Some(current);
        if self.move_to_front(&mut context, page) {
            self.persist(&context).await;
        }
        Ok(())
    }

    /// Points the current page at another session of the same instance.
    ///
    /// Fails without a current page; returns `false` for an unknown session.
    pub async fn switch_to_session(&self, session_id: &str) -> Result<bool> {
        if self.state.read().await.current.is_none() {
            return Err(ChatError::precondition("There is no current page"));
        }
        if !self.sessions.session_exists(session_id).await {
            tracing::warn!("[PageCoordinator] Session {} not found", session_id);
            return Ok(false);
        }

        let mut context = self.state.write().await;
        let Some(current) = context.current.as_mut() else {
            return Err(ChatError::precondition("There is no current page"));
        };
        current.session_id = Some(session_id.to_string());
        current.updated_at = Utc::now();
        Ok(true)
    }

    /// Starts a new session on the current page's instance and returns its id.
    pub async fn create_new_session_in_current_page(&self, title: Option<&str>) -> Result<String> {
        let plugin_id = self
            .current_plugin_id()
            .await
            .ok_or_else(|| ChatError::precondition("There is no current page"))?;

        let session_id = self.sessions.create_new_session(&plugin_id, title).await;

        let mut context = self.state.write().await;
        let Some(current) = context.current.as_mut() else {
            return Err(ChatError::precondition("There is no current page"));
        };
        current.session_id = Some(session_id.clone());
        current.updated_at = Utc::now();
        let page = current.clone();
        self.record_visit(&mut context, &page);
        self.persist(&context).await;

        Ok(session_id)
    }

    /// Back-fills the session of the current page. Returns `false` without a current page.
    pub async fn set_current_session(&self, session_id: &str) -> bool {
        let mut context = self.state.write().await;
        match context.current.as_mut() {
            Some(current) => {
                current.session_id = Some(session_id.to_string());
                current.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    // ============================================================================
    // History
    // ============================================================================

    /// Records a visit: an existing triple is refreshed and moved to the
    /// front, a new one is inserted at the front. The history is capped.
    fn record_visit(&self, context: &mut PageContext, page: &PageState) {
        if !self.move_to_front(context, page) {
            context.history.insert(
                0,
                PageHistoryEntry {
                    id: ids::generate_page_id(),
                    page_state: page.clone(),
                    timestamp: Utc::now(),
                },
            );
            context.history.truncate(self.history_limit);
        }
    }

    fn move_to_front(&self, context: &mut PageContext, page: &PageState) -> bool {
        let Some(index) = context
            .history
            .iter()
            .position(|entry| entry.page_state.same_target(page))
        else {
            return false;
        };
        let mut entry = context.history.remove(index);
        entry.timestamp = Utc::now();
        context.history.insert(0, entry);
        true
    }

    pub async fn add_to_history(&self, page: &PageState) {
        let mut context = self.state.write().await;
        self.record_visit(&mut context, page);
        self.persist(&context).await;
    }

    /// Refreshes an existing entry and moves it to the front. Returns `false` if absent.
    pub async fn update_history_timestamp(&self, page: &PageState) -> bool {
        let mut context = self.state.write().await;
        let moved = self.move_to_front(&mut context, page);
        if moved {
            self.persist(&context).await;
        }
        moved
    }

    /// History entries, most recent first.
    pub async fn get_page_history(&self) -> Vec<PageHistoryEntry> {
        let mut history = self.state.read().await.history.clone();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    pub async fn get_plugin_page_history(&self, plugin_id: &str) -> Vec<PageHistoryEntry> {
        let mut history: Vec<_> = self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|entry| entry.page_state.plugin_id == plugin_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    pub async fn remove_from_history(&self, entry_id: &str) -> bool {
        let mut context = self.state.write().await;
        let Some(index) = context.history.iter().position(|e| e.id == entry_id) else {
            return false;
        };
        context.history.remove(index);
        self.persist(&context).await;
        true
    }

    pub async fn clear_history(&self) {
        let mut context = self.state.write().await;
        context.history.clear();
        self.persist(&context).await;
    }

    // ============================================================================
    // Current page
    // ============================================================================

    pub async fn current_page(&self) -> Option<PageState> {
        self.state.read().await.current.clone()
    }

    pub async fn current_plugin_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .current
            .as_ref()
            .map(|p| p.plugin_id.clone())
    }

    pub async fn current_instance_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .current
            .as_ref()
            .map(|p| p.instance_id.clone())
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .current
            .as_ref()
            .and_then(|p| p.session_id.clone())
    }

    /// A page is valid when plugin, instance and session are all set.
    pub async fn is_current_page_valid(&self) -> bool {
        self.state.read().await.current.as_ref().is_some_and(|p| {
            !p.plugin_id.is_empty() && !p.instance_id.is_empty() && p.session_id.is_some()
        })
    }
}
