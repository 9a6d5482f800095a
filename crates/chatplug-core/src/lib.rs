//! Domain layer of the chatplug client.
//!
//! Holds the models, repository traits, the plugin host boundary, and the
//! leaf stores (sessions, streams, plugin instances, pages, shortcuts) that the
//! application layer composes.

pub mod config;
pub mod error;
pub mod ids;
pub mod page;
pub mod plugin;
pub mod session;
pub mod shortcut;
pub mod stream;
pub mod tab;

// Re-export common types
pub use config::ClientConfig;
pub use error::{ChatError, Result};
