use async_trait::async_trait;

use super::model::ConversationTarget;

/// Read-only view of what the user is currently looking at.
///
/// Used to resolve the target of an outgoing message when the caller does
/// not name one explicitly.
#[async_trait]
pub trait ConversationContext: Send + Sync {
    /// Target bound to the active tab, if any tab is active.
    async fn active_tab_target(&self) -> Option<ConversationTarget>;

    /// Target of the current page, if a page is current.
    async fn current_page_target(&self) -> Option<ConversationTarget>;
}
