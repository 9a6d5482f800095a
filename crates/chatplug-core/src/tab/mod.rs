//! Tab domain module.
//!
//! Models and the repository trait for open tabs. The tab lifecycle itself
//! lives in the application layer, which composes the stores of this crate.

mod model;
mod repository;

pub use model::{PluginSessionStats, Tab, TabSnapshot};
pub use repository::TabRepository;
