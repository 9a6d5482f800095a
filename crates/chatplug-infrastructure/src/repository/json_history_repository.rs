use super::{load_blocking, save_blocking};
use crate::storage::AtomicFile;
use async_trait::async_trait;
use chatplug_core::error::Result;
use chatplug_core::session::{ChatSession, HistoryRepository};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// On-disk layout of `history.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    sessions: Vec<ChatSession>,
}

/// Stores every chat session in a single `history.json`.
pub struct JsonHistoryRepository {
    file: Arc<AtomicFile<HistoryDocument>>,
}

impl JsonHistoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::json(path)),
        }
    }
}

#[async_trait]
impl HistoryRepository for JsonHistoryRepository {
    async fn load_sessions(&self) -> Result<Vec<ChatSession>> {
        let document = load_blocking(self.file.clone()).await?;
        Ok(document.unwrap_or_default().sessions)
    }

    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<()> {
        let document = HistoryDocument {
            sessions: sessions.to_vec(),
        };
        save_blocking(self.file.clone(), document).await
    }
}
