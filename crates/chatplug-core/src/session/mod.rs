//! Session domain module.
//!
//! This module contains the chat session models, the history repository
//! interface, and the in-memory session store.
//!
//! # Module Structure
//!
//! - `model`: `ChatSession`, `Message` and their enums
//! - `repository`: Repository trait for history persistence
//! - `store`: Session and message mutation logic (`SessionStore`)

mod model;
mod repository;
mod store;

// Re-export public API
pub use model::{
    ChatSession, Message, MessageRole, MessageStatus, MessageType, PluginSessionCount,
    TITLE_MAX_CHARS, derive_title,
};
pub use repository::HistoryRepository;
pub use store::SessionStore;
