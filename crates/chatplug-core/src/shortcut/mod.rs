//! Quick-phrase domain module.
//!
//! Each plugin keeps its own list of reusable phrases the user can insert
//! into the composer. The list is persisted as one blob for all plugins.

mod model;
mod repository;
mod store;

pub use model::{PluginShortcut, Shortcut, ShortcutBook};
pub use repository::ShortcutRepository;
pub use store::ShortcutStore;
