use super::model::{
    ChatSession, Message, MessageRole, MessageStatus, MessageType, PluginSessionCount,
    derive_title,
};
use super::repository::HistoryRepository;
use crate::ids;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct HistoryState {
    sessions: Vec<ChatSession>,
    /// message id -> owning session id
    message_index: HashMap<String, String>,
}

impl HistoryState {
    fn from_sessions(sessions: Vec<ChatSession>) -> Self {
        let mut message_index = HashMap::new();
        for session in &sessions {
            for message in &session.messages {
                message_index.insert(message.id.clone(), session.id.clone());
            }
        }
        Self {
            sessions,
            message_index,
        }
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == session_id)
    }

    fn forget_messages_of(&mut self, session: &ChatSession) {
        for message in &session.messages {
            if self.message_index.get(&message.id) == Some(&session.id) {
                self.message_index.remove(&message.id);
            }
        }
    }
}

/// Owns every chat session and its messages.
///
/// `SessionStore` is responsible for:
/// - Creating and deleting sessions
/// - Appending messages and accumulating streamed content
/// - Persisting the full history after every mutation
///
/// Storage failures are logged and never surface to callers; the in-memory
/// state stays authoritative.
pub struct SessionStore {
    state: RwLock<HistoryState>,
    repository: Arc<dyn HistoryRepository>,
}

impl SessionStore {
    /// Creates an empty store. Call [`SessionStore::initialize`] to load persisted history.
    pub fn new(repository: Arc<dyn HistoryRepository>) -> Self {
        Self {
            state: RwLock::new(HistoryState::default()),
            repository,
        }
    }

    /// Loads persisted sessions, replacing the in-memory history.
    ///
    /// Returns the number of sessions loaded. A storage failure leaves the store empty.
    pub async fn initialize(&self) -> usize {
        let sessions = match self.repository.load_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!("[SessionStore] Failed to load chat history: {}", e);
                Vec::new()
            }
        };

        let count = sessions.len();
        *self.state.write().await = HistoryState::from_sessions(sessions);
        tracing::info!("[SessionStore] Loaded {} session(s) from storage", count);
        count
    }

    pub fn generate_session_id(&self) -> String {
        ids::generate_session_id()
    }

    pub fn generate_message_id(&self) -> String {
        ids::generate_message_id()
    }

    async fn persist(&self, state: &HistoryState) {
        if let Err(e) = self.repository.save_sessions(&state.sessions).await {
            tracing::error!("[SessionStore] Failed to persist chat history: {}", e);
        }
    }

    /// Creates a new, empty session for `plugin_id` and returns its id.
    pub async fn create_new_session(&self, plugin_id: &str, title: Option<&str>) -> String {
        let session_id = ids::generate_session_id();
        let session = ChatSession::new(session_id.clone(), plugin_id.to_string(), title);

        let mut state = self.state.write().await;
        state.sessions.push(session);
        self.persist(&state).await;

        tracing::debug!(
            "[SessionStore] Created session {} for plugin {}",
            session_id,
            plugin_id
        );
        session_id
    }

    /// Appends a completed, non-streaming message.
    pub async fn add_message(
        &self,
        session_id: &str,
        content: &str,
        message_id: &str,
        role: MessageRole,
    ) -> Option<Message> {
        self.add_message_to_session(
            session_id,
            content,
            message_id,
            role,
            MessageType::Normal,
            MessageStatus::Completed,
        )
        .await
    }

    /// Appends a message to a session.
    ///
    /// Returns `None` if the session does not exist. When this is the first
    /// message of the session and it was written by the user, the session
    /// title is derived from it.
    ///
    /// Message ids are not deduplicated; calling twice with the same id
    /// appends twice.
    pub async fn add_message_to_session(
        &self,
        session_id: &str,
        content: &str,
        message_id: &str,
        role: MessageRole,
        message_type: MessageType,
        status: MessageStatus,
    ) -> Option<Message> {
        let mut state = self.state.write().await;

        let Some(session) = state.session_mut(session_id) else {
            tracing::warn!("[SessionStore] Session with id {} not found", session_id);
            return None;
        };

        let message = Message {
            id: message_id.to_string(),
            message_type,
            status,
            content: content.to_string(),
            plugin_id: session.plugin_id.clone(),
            role,
            created_at: Utc::now(),
        };

        session.messages.push(message.clone());
        session.updated_at = Utc::now();

        if session.messages.len() == 1 && role == MessageRole::User {
            session.title = derive_title(content);
        }

        state
            .message_index
            .insert(message_id.to_string(), session_id.to_string());
        self.persist(&state).await;

        Some(message)
    }

    /// Appends `content_delta` to an existing message and sets its status.
    ///
    /// The owning session is not required: the message is located across
    /// all sessions. Content is accumulated, never replaced. Returns `false`
    /// if no session holds a message with this id.
    pub async fn update_message(
        &self,
        message_id: &str,
        content_delta: &str,
        status: MessageStatus,
    ) -> bool {
        let mut state = self.state.write().await;

        let owner = match state.message_index.get(message_id) {
            Some(session_id) => Some(session_id.clone()),
            None => state
                .sessions
                .iter()
                .find(|s| s.messages.iter().any(|m| m.id == message_id))
                .map(|s| s.id.clone()),
        };

        let Some(session_id) = owner else {
            tracing::debug!("[SessionStore] Message {} not found in any session", message_id);
            return false;
        };

        let Some(session) = state.session_mut(&session_id) else {
            return false;
        };
        let Some(message) = session.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };

        message.content.push_str(content_delta);
        message.status = status;
        session.updated_at = Utc::now();

        self.persist(&state).await;
        true
    }

    /// Sets an explicit title. Returns `false` for an unknown session.
    pub async fn rename_session(&self, session_id: &str, title: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(session) = state.session_mut(session_id) else {
            return false;
        };
        session.title = title.to_string();
        session.updated_at = Utc::now();
        self.persist(&state).await;
        true
    }

    /// Removes a session and its messages. Returns `false` for an unknown session.
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(index) = state.sessions.iter().position(|s| s.id == session_id) else {
            return false;
        };
        let removed = state.sessions.remove(index);
        state.forget_messages_of(&removed);
        self.persist(&state).await;
        true
    }

    /// Removes every session of a plugin and returns how many were deleted.
    pub async fn clear_plugin_sessions(&self, plugin_id: &str) -> usize {
        let mut state = self.state.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.sessions)
            .into_iter()
            .partition(|s| s.plugin_id == plugin_id);
        state.sessions = kept;

        for session in &removed {
            state.forget_messages_of(session);
        }

        if !removed.is_empty() {
            self.persist(&state).await;
        }
        removed.len()
    }

    pub async fn clear_all_sessions(&self) {
        let mut state = self.state.write().await;
        state.sessions.clear();
        state.message_index.clear();
        self.persist(&state).await;
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub async fn get_sessions_by_plugin_id(&self, plugin_id: &str) -> Vec<ChatSession> {
        let state = self.state.read().await;
        state
            .sessions
            .iter()
            .filter(|s| s.plugin_id == plugin_id)
            .cloned()
            .collect()
    }

    pub async fn get_session_by_id(&self, session_id: &str) -> Option<ChatSession> {
        let state = self.state.read().await;
        state.sessions.iter().find(|s| s.id == session_id).cloned()
    }

    pub async fn session_exists(&self, session_id: &str) -> bool {
        let state = self.state.read().await;
        state.sessions.iter().any(|s| s.id == session_id)
    }

    /// Messages of a session in insertion order; empty for an unknown session.
    pub async fn get_messages_by_session_id(&self, session_id: &str) -> Vec<Message> {
        let state = self.state.read().await;
        state
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub async fn get_message(&self, session_id: &str, message_id: &str) -> Option<Message> {
        let state = self.state.read().await;
        state
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .and_then(|s| s.message(message_id))
            .cloned()
    }

    /// All sessions, most recently updated first.
    pub async fn get_all_sessions(&self) -> Vec<ChatSession> {
        let state = self.state.read().await;
        let mut sessions = state.sessions.clone();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    /// Session and message counts grouped by plugin id.
    pub async fn get_session_stats(&self) -> HashMap<String, PluginSessionCount> {
        let state = self.state.read().await;
        let mut stats: HashMap<String, PluginSessionCount> = HashMap::new();
        for session in &state.sessions {
            let entry = stats.entry(session.plugin_id.clone()).or_default();
            entry.session_count += 1;
            entry.message_count += session.messages.len();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChatError, Result};
    use std::sync::Mutex;

    // Mock HistoryRepository for testing
    #[derive(Default)]
    struct MockHistoryRepository {
        sessions: Mutex<Vec<ChatSession>>,
        save_count: Mutex<usize>,
        fail: bool,
    }

    impl MockHistoryRepository {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl HistoryRepository for MockHistoryRepository {
        async fn load_sessions(&self) -> Result<Vec<ChatSession>> {
            if self.fail {
                return Err(ChatError::io("disk unavailable"));
            }
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<()> {
            if self.fail {
                return Err(ChatError::io("disk unavailable"));
            }
            *self.sessions.lock().unwrap() = sessions.to_vec();
            *self.save_count.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn new_store() -> (SessionStore, Arc<MockHistoryRepository>) {
        let repository = Arc::new(MockHistoryRepository::default());
        (SessionStore::new(repository.clone()), repository)
    }

    #[tokio::test]
    async fn test_create_new_session_persists() {
        let (store, repository) = new_store();

        let session_id = store.create_new_session("echo", Some("Greeting")).await;

        let session = store.get_session_by_id(&session_id).await.unwrap();
        assert_eq!(session.title, "Greeting");
        assert_eq!(session.plugin_id, "echo");
        assert!(session.messages.is_empty());
        assert_eq!(repository.sessions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_default_title_is_timestamped() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", None).await;
        let session = store.get_session_by_id(&session_id).await.unwrap();
        assert!(session.title.starts_with("New conversation "));
    }

    #[tokio::test]
    async fn test_add_message_keeps_call_order() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", None).await;

        for i in 0..5 {
            let message = store
                .add_message(&session_id, &format!("msg {}", i), &format!("m{}", i), MessageRole::Plugin)
                .await;
            assert!(message.is_some());
        }

        let messages = store.get_messages_by_session_id(&session_id).await;
        assert_eq!(messages.len(), 5);
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert!(messages.iter().all(|m| m.plugin_id == "echo"));
    }

    #[tokio::test]
    async fn test_add_message_to_unknown_session_returns_none() {
        let (store, repository) = new_store();
        let result = store
            .add_message("missing", "hello", "m1", MessageRole::User)
            .await;
        assert!(result.is_none());
        assert_eq!(*repository.save_count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_first_user_message_derives_title() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", Some("Untitled")).await;

        store
            .add_message(
                &session_id,
                "Please summarize the following document",
                "m1",
                MessageRole::User,
            )
            .await;
        store
            .add_message(&session_id, "A second user message", "m2", MessageRole::User)
            .await;

        let session = store.get_session_by_id(&session_id).await.unwrap();
        assert_eq!(session.title, "Please summarize the...");
    }

    #[tokio::test]
    async fn test_first_plugin_message_keeps_title() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", Some("Untitled")).await;

        store
            .add_message(&session_id, "Welcome!", "m1", MessageRole::Plugin)
            .await;
        store
            .add_message(&session_id, "user text", "m2", MessageRole::User)
            .await;

        let session = store.get_session_by_id(&session_id).await.unwrap();
        assert_eq!(session.title, "Untitled");
    }

    #[tokio::test]
    async fn test_update_message_accumulates_content() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", None).await;
        store
            .add_message_to_session(
                &session_id,
                "",
                "s1",
                MessageRole::Plugin,
                MessageType::Streaming,
                MessageStatus::Active,
            )
            .await;

        assert!(store.update_message("s1", "ab", MessageStatus::Active).await);
        assert!(store.update_message("s1", "cd", MessageStatus::Completed).await);

        let message = store.get_message(&session_id, "s1").await.unwrap();
        assert_eq!(message.content, "abcd");
        assert_eq!(message.status, MessageStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_message_searches_all_sessions() {
        let (store, _) = new_store();
        let first = store.create_new_session("echo", None).await;
        let second = store.create_new_session("weather", None).await;
        store.add_message(&first, "one", "m1", MessageRole::Plugin).await;
        store.add_message(&second, "two", "m2", MessageRole::Plugin).await;

        assert!(store.update_message("m2", "!", MessageStatus::Completed).await);
        assert_eq!(store.get_message(&second, "m2").await.unwrap().content, "two!");
        assert_eq!(store.get_message(&first, "m1").await.unwrap().content, "one");
    }

    #[tokio::test]
    async fn test_update_unknown_message_returns_false() {
        let (store, _) = new_store();
        store.create_new_session("echo", None).await;
        assert!(!store.update_message("nope", "x", MessageStatus::Completed).await);
    }

    #[tokio::test]
    async fn test_delete_session_drops_message_index() {
        let (store, _) = new_store();
        let session_id = store.create_new_session("echo", None).await;
        store.add_message(&session_id, "hi", "m1", MessageRole::Plugin).await;

        assert!(store.delete_session(&session_id).await);
        assert!(!store.delete_session(&session_id).await);
        assert!(!store.update_message("m1", "x", MessageStatus::Completed).await);
    }

    #[tokio::test]
    async fn test_clear_plugin_sessions() {
        let (store, _) = new_store();
        store.create_new_session("echo", None).await;
        store.create_new_session("echo", None).await;
        let kept = store.create_new_session("weather", None).await;

        assert_eq!(store.clear_plugin_sessions("echo").await, 2);
        assert_eq!(store.clear_plugin_sessions("echo").await, 0);

        let remaining = store.get_all_sessions().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept);
    }

    #[tokio::test]
    async fn test_clear_all_sessions() {
        let (store, repository) = new_store();
        store.create_new_session("echo", None).await;
        store.clear_all_sessions().await;
        assert!(store.get_all_sessions().await.is_empty());
        assert!(repository.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_stats_per_plugin() {
        let (store, _) = new_store();
        let a = store.create_new_session("echo", None).await;
        let b = store.create_new_session("echo", None).await;
        store.create_new_session("weather", None).await;
        store.add_message(&a, "1", "m1", MessageRole::User).await;
        store.add_message(&a, "2", "m2", MessageRole::Plugin).await;
        store.add_message(&b, "3", "m3", MessageRole::User).await;

        let stats = store.get_session_stats().await;
        assert_eq!(stats["echo"].session_count, 2);
        assert_eq!(stats["echo"].message_count, 3);
        assert_eq!(stats["weather"].session_count, 1);
        assert_eq!(stats["weather"].message_count, 0);
    }

    #[tokio::test]
    async fn test_initialize_restores_sessions_and_index() {
        let (store, repository) = new_store();
        let session_id = store.create_new_session("echo", None).await;
        store.add_message(&session_id, "hi", "m1", MessageRole::Plugin).await;

        let restored = SessionStore::new(repository);
        assert_eq!(restored.initialize().await, 1);
        assert!(restored.update_message("m1", " there", MessageStatus::Completed).await);
        assert_eq!(
            restored.get_message(&session_id, "m1").await.unwrap().content,
            "hi there"
        );
    }

    #[tokio::test]
    async fn test_storage_failures_are_recovered_locally() {
        let store = SessionStore::new(Arc::new(MockHistoryRepository::failing()));
        assert_eq!(store.initialize().await, 0);

        let session_id = store.create_new_session("echo", None).await;
        assert!(store.add_message(&session_id, "hi", "m1", MessageRole::User).await.is_some());
        assert_eq!(store.get_messages_by_session_id(&session_id).await.len(), 1);
    }
}
