use async_trait::async_trait;

use super::model::PageHistoryEntry;
use crate::error::Result;

/// Persistence backend for the page-navigation history.
#[async_trait]
pub trait PageHistoryRepository: Send + Sync {
    /// Loads the history, most recent first. A missing blob yields an empty list.
    async fn load_history(&self) -> Result<Vec<PageHistoryEntry>>;

    async fn save_history(&self, entries: &[PageHistoryEntry]) -> Result<()>;
}
