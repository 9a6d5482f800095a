//! Chat history repository trait.

use async_trait::async_trait;

use super::model::ChatSession;
use crate::error::Result;

/// Persistence backend for chat sessions and their messages.
///
/// The whole history is stored as one blob; implementations are free to
/// choose the encoding.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Loads every persisted session. A missing blob yields an empty list.
    async fn load_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Replaces the persisted history with `sessions`.
    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<()>;
}
