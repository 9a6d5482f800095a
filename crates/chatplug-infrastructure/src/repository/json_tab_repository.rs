use super::{load_blocking, save_blocking};
use crate::storage::AtomicFile;
use async_trait::async_trait;
use chatplug_core::error::Result;
use chatplug_core::tab::{TabRepository, TabSnapshot};
use std::path::PathBuf;
use std::sync::Arc;

/// Stores the open tabs in `tabs.json`.
pub struct JsonTabRepository {
    file: Arc<AtomicFile<TabSnapshot>>,
}

impl JsonTabRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::json(path)),
        }
    }
}

#[async_trait]
impl TabRepository for JsonTabRepository {
    async fn load_tabs(&self) -> Result<TabSnapshot> {
        Ok(load_blocking(self.file.clone()).await?.unwrap_or_default())
    }

    async fn save_tabs(&self, snapshot: &TabSnapshot) -> Result<()> {
        save_blocking(self.file.clone(), snapshot.clone()).await
    }
}
