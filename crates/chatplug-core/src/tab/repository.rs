//! Tab state repository trait.

use async_trait::async_trait;

use super::model::TabSnapshot;
use crate::error::Result;

/// Persistence backend for the open-tab list.
#[async_trait]
pub trait TabRepository: Send + Sync {
    /// Loads the persisted tabs. A missing blob yields `TabSnapshot::default()`.
    async fn load_tabs(&self) -> Result<TabSnapshot>;

    async fn save_tabs(&self, snapshot: &TabSnapshot) -> Result<()>;
}
