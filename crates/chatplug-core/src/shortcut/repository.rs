//! Quick-phrase repository trait.

use async_trait::async_trait;

use super::model::ShortcutBook;
use crate::error::Result;

/// Persistence backend for every plugin's shortcuts.
#[async_trait]
pub trait ShortcutRepository: Send + Sync {
    /// Loads the persisted shortcuts. A missing blob yields an empty book.
    async fn load_shortcuts(&self) -> Result<ShortcutBook>;

    async fn save_shortcuts(&self, book: &ShortcutBook) -> Result<()>;
}
