use super::{load_blocking, save_blocking};
use crate::storage::AtomicFile;
use async_trait::async_trait;
use chatplug_core::error::Result;
use chatplug_core::page::{PageHistoryEntry, PageHistoryRepository};
use std::path::PathBuf;
use std::sync::Arc;

/// Stores the page navigation history in `page_history.json`.
pub struct JsonPageHistoryRepository {
    file: Arc<AtomicFile<Vec<PageHistoryEntry>>>,
}

impl JsonPageHistoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::json(path)),
        }
    }
}

#[async_trait]
impl PageHistoryRepository for JsonPageHistoryRepository {
    async fn load_history(&self) -> Result<Vec<PageHistoryEntry>> {
        Ok(load_blocking(self.file.clone()).await?.unwrap_or_default())
    }

    async fn save_history(&self, entries: &[PageHistoryEntry]) -> Result<()> {
        save_blocking(self.file.clone(), entries.to_vec()).await
    }
}
