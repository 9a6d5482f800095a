//! Plugin instances and the plugin host boundary.
//!
//! # Module Structure
//!
//! - `model`: `PluginMetadata`, `PluginInstance` and request payloads
//! - `backend`: RPC trait implemented by the plugin host adapter
//! - `notifier`: user-facing success/error notices
//! - `context`: read-only view of the active conversation target
//! - `registry`: per-instance lifecycle state (`PluginInstanceRegistry`)

mod backend;
mod context;
mod model;
mod notifier;
mod registry;

pub use backend::PluginBackend;
pub use context::ConversationContext;
pub use model::{
    ConversationTarget, PluginInstance, PluginMetadata, PluginStatus, SendMessageRequest,
};
pub use notifier::{Notifier, TracingNotifier};
pub use registry::PluginInstanceRegistry;
