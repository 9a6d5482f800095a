//! File-backed implementations of the core repository traits.
//!
//! Each repository owns one JSON file under the data directory. File I/O
//! runs on the blocking thread pool.

mod json_history_repository;
mod json_page_history_repository;
mod json_shortcut_repository;
mod json_tab_repository;

pub use json_history_repository::JsonHistoryRepository;
pub use json_page_history_repository::JsonPageHistoryRepository;
pub use json_shortcut_repository::JsonShortcutRepository;
pub use json_tab_repository::JsonTabRepository;

use crate::storage::AtomicFile;
use chatplug_core::error::{ChatError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

async fn load_blocking<T>(file: Arc<AtomicFile<T>>) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || file.load())
        .await
        .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))?
}

async fn save_blocking<T>(file: Arc<AtomicFile<T>>, data: T) -> Result<()>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || file.save(&data))
        .await
        .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))?
}
