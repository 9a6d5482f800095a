use super::{load_blocking, save_blocking};
use crate::storage::AtomicFile;
use async_trait::async_trait;
use chatplug_core::error::Result;
use chatplug_core::shortcut::{ShortcutBook, ShortcutRepository};
use std::path::PathBuf;
use std::sync::Arc;

/// Stores every plugin's quick phrases in `shortcuts.json`.
pub struct JsonShortcutRepository {
    file: Arc<AtomicFile<ShortcutBook>>,
}

impl JsonShortcutRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::json(path)),
        }
    }
}

#[async_trait]
impl ShortcutRepository for JsonShortcutRepository {
    async fn load_shortcuts(&self) -> Result<ShortcutBook> {
        Ok(load_blocking(self.file.clone()).await?.unwrap_or_default())
    }

    async fn save_shortcuts(&self, book: &ShortcutBook) -> Result<()> {
        save_blocking(self.file.clone(), book.clone()).await
    }
}
