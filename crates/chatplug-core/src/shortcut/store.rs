use super::model::{PluginShortcut, Shortcut, ShortcutBook};
use super::repository::ShortcutRepository;
use crate::error::{ChatError, Result};
use crate::ids;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns the per-plugin quick phrases.
///
/// Every mutation persists the whole book under the write lock. As with
/// the session history, storage failures are logged and the in-memory
/// book stays authoritative.
pub struct ShortcutStore {
    book: RwLock<ShortcutBook>,
    repository: Arc<dyn ShortcutRepository>,
}

impl ShortcutStore {
    pub fn new(repository: Arc<dyn ShortcutRepository>) -> Self {
        Self {
            book: RwLock::new(ShortcutBook::default()),
            repository,
        }
    }

    /// Loads persisted shortcuts and returns how many were found.
    pub async fn initialize(&self) -> usize {
        let book = match self.repository.load_shortcuts().await {
            Ok(book) => book,
            Err(e) => {
                tracing::error!("[ShortcutStore] Failed to load shortcuts: {}", e);
                ShortcutBook::default()
            }
        };

        let count = book.total();
        *self.book.write().await = book;
        tracing::info!("[ShortcutStore] Loaded {} shortcut(s) from storage", count);
        count
    }

    async fn persist(&self, book: &ShortcutBook) {
        if let Err(e) = self.repository.save_shortcuts(book).await {
            tracing::error!("[ShortcutStore] Failed to persist shortcuts: {}", e);
        }
    }

    /// Adds a shortcut at the front of the plugin's list.
    pub async fn add_shortcut(&self, plugin_id: &str, title: &str, content: &str) -> Shortcut {
        let shortcut = Shortcut::new(ids::generate_shortcut_id(), title, content);

        let mut book = self.book.write().await;
        book.plugins
            .entry(plugin_id.to_string())
            .or_default()
            .insert(0, shortcut.clone());
        self.persist(&book).await;

        tracing::debug!(
            "[ShortcutStore] Added shortcut {} for plugin {}",
            shortcut.id,
            plugin_id
        );
        shortcut
    }

    /// Replaces title and content of an existing shortcut, keeping its position.
    pub async fn update_shortcut(
        &self,
        shortcut_id: &str,
        plugin_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Shortcut> {
        let mut book = self.book.write().await;
        let shortcut = book
            .plugins
            .get_mut(plugin_id)
            .and_then(|list| list.iter_mut().find(|s| s.id == shortcut_id))
            .ok_or_else(|| ChatError::not_found("shortcut", shortcut_id))?;

        shortcut.title = title.trim().to_string();
        shortcut.content = content.trim().to_string();
        shortcut.updated_at = Utc::now();
        let updated = shortcut.clone();

        self.persist(&book).await;
        Ok(updated)
    }

    /// Removes a shortcut and returns it.
    pub async fn delete_shortcut(&self, shortcut_id: &str, plugin_id: &str) -> Result<Shortcut> {
        let mut book = self.book.write().await;
        let list = book
            .plugins
            .get_mut(plugin_id)
            .ok_or_else(|| ChatError::not_found("shortcut", shortcut_id))?;
        let index = list
            .iter()
            .position(|s| s.id == shortcut_id)
            .ok_or_else(|| ChatError::not_found("shortcut", shortcut_id))?;
        let removed = list.remove(index);

        self.persist(&book).await;
        Ok(removed)
    }

    /// Drops every shortcut of a plugin. Returns how many were removed.
    pub async fn clear_plugin_shortcuts(&self, plugin_id: &str) -> usize {
        let mut book = self.book.write().await;
        let removed = book.plugins.remove(plugin_id).map_or(0, |list| list.len());
        if removed > 0 {
            self.persist(&book).await;
        }
        removed
    }

    pub async fn clear_all_shortcuts(&self) {
        let mut book = self.book.write().await;
        book.plugins.clear();
        self.persist(&book).await;
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// The plugin's shortcuts, newest first.
    pub async fn get_shortcuts_by_plugin_id(&self, plugin_id: &str) -> Vec<Shortcut> {
        self.book
            .read()
            .await
            .plugins
            .get(plugin_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get_shortcut_by_id(&self, shortcut_id: &str, plugin_id: &str) -> Option<Shortcut> {
        self.book
            .read()
            .await
            .plugins
            .get(plugin_id)
            .and_then(|list| list.iter().find(|s| s.id == shortcut_id).cloned())
    }

    /// Shortcuts of every plugin, most recently updated first.
    pub async fn get_all_shortcuts(&self) -> Vec<PluginShortcut> {
        let book = self.book.read().await;
        let mut all: Vec<_> = book
            .plugins
            .iter()
            .flat_map(|(plugin_id, list)| {
                list.iter().map(move |shortcut| PluginShortcut {
                    plugin_id: plugin_id.clone(),
                    shortcut: shortcut.clone(),
                })
            })
            .collect();
        all.sort_by(|a, b| b.shortcut.updated_at.cmp(&a.shortcut.updated_at));
        all
    }

    /// Number of shortcuts per plugin.
    pub async fn get_shortcut_stats(&self) -> BTreeMap<String, usize> {
        self.book
            .read()
            .await
            .plugins
            .iter()
            .map(|(plugin_id, list)| (plugin_id.clone(), list.len()))
            .collect()
    }
}
