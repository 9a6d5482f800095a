//! Identifier generation.

use uuid::Uuid;

/// Generates a globally unique id of the form `<prefix>_<uuid>`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn generate_tab_id() -> String {
    generate_id("tab")
}

pub fn generate_instance_id() -> String {
    generate_id("instance")
}

pub fn generate_session_id() -> String {
    generate_id("session")
}

pub fn generate_message_id() -> String {
    generate_id("message")
}

pub fn generate_page_id() -> String {
    generate_id("page")
}

pub fn generate_shortcut_id() -> String {
    generate_id("shortcut")
}
