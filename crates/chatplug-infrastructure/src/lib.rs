//! Infrastructure layer of the chatplug client.
//!
//! File-backed repositories, path resolution, configuration loading and
//! logging setup.

pub mod config_service;
pub mod logging;
pub mod paths;
pub mod repository;
pub mod storage;

pub use config_service::ConfigService;
pub use paths::ChatplugPaths;
pub use repository::{
    JsonHistoryRepository, JsonPageHistoryRepository, JsonShortcutRepository, JsonTabRepository,
};
