pub mod config;
pub mod history;
pub mod sessions;
pub mod shortcuts;
pub mod tabs;
