mod common;

use chatplug_application::{BackendEvent, ChatClient};
use chatplug_application::events::{
    CHANNEL_DISCONNECT_REQUEST, CHANNEL_MESSAGE, CHANNEL_MOUNTED, CHANNEL_STREAM,
};
use chatplug_core::session::{MessageRole, MessageStatus, MessageType};
use chatplug_core::stream::StreamStatus;
use common::test_client;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

fn stream_event(kind: &str, instance_id: &str, data: serde_json::Value) -> BackendEvent {
    BackendEvent::new(
        CHANNEL_STREAM,
        json!({
            "type": kind,
            "plugin_id": "echo",
            "instance_id": instance_id,
            "data": data,
        })
        .to_string(),
    )
}

fn plugin_message(instance_id: &str, content: &str, message_id: &str) -> BackendEvent {
    BackendEvent::new(
        CHANNEL_MESSAGE,
        json!({
            "plugin_id": "echo",
            "instance_id": instance_id,
            "content": content,
            "message_id": message_id,
        })
        .to_string(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_stream_chunks_accumulate_and_stream_is_evicted() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let router = test.client.router();
    let instance = tab.instance_id.as_str();

    router
        .handle_event(stream_event("stream_start", instance, json!({"stream_id": "s1"})))
        .await;
    assert!(test.client.streams().has_active_stream(instance).await);

    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s1", "chunk": "He", "is_final": false}),
        ))
        .await;
    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s1", "chunk": "llo", "is_final": true}),
        ))
        .await;
    router
        .handle_event(stream_event(
            "stream_end",
            instance,
            json!({"stream_id": "s1", "success": true}),
        ))
        .await;

    let message = test
        .client
        .sessions()
        .get_message(&tab.session_id, "s1")
        .await
        .unwrap();
    assert_eq!(message.content, "Hello");
    assert_eq!(message.status, MessageStatus::Completed);
    assert_eq!(message.message_type, MessageType::Streaming);
    assert_eq!(message.role, MessageRole::Plugin);

    let state = test.client.streams().get_stream_state("s1").await.unwrap();
    assert_eq!(state.status, StreamStatus::Completed);
    assert!(!test.client.streams().has_active_stream(instance).await);

    tokio::time::sleep(test.client.streams().grace_period() + Duration::from_millis(10)).await;
    tokio::task::yield_now().await;

    assert!(test.client.streams().get_stream_state("s1").await.is_none());
    assert!(test
        .client
        .sessions()
        .get_message(&tab.session_id, "s1")
        .await
        .is_some());
}

#[tokio::test]
async fn test_stream_failure_keeps_partial_content() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let router = test.client.router();
    let instance = tab.instance_id.as_str();

    router
        .handle_event(stream_event("stream_start", instance, json!({"stream_id": "s2"})))
        .await;
    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s2", "chunk": "par"}),
        ))
        .await;
    router
        .handle_event(stream_event(
            "stream_end",
            instance,
            json!({"stream_id": "s2", "success": false}),
        ))
        .await;

    let message = test
        .client
        .sessions()
        .get_message(&tab.session_id, "s2")
        .await
        .unwrap();
    assert_eq!(message.content, "par");
    assert_eq!(message.status, MessageStatus::Error);
    assert_eq!(
        test.client.streams().get_stream_state("s2").await.unwrap().status,
        StreamStatus::Error
    );
}

async fn assert_stream_status(
    client: &ChatClient,
    session_id: &str,
    expected_stream: StreamStatus,
    expected_message: MessageStatus,
) {
    let stream = client.streams().get_stream_state("s3").await.unwrap();
    let message = client.sessions().get_message(session_id, "s3").await.unwrap();
    assert_eq!(stream.status, expected_stream);
    assert_eq!(message.status, expected_message);
    assert_eq!(message.content, "");
}

#[tokio::test]
async fn test_stream_pause_resume_cancel_mirror_into_message() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let router = test.client.router();
    let instance = tab.instance_id.as_str();
    let data = json!({"stream_id": "s3"});

    router
        .handle_event(stream_event("stream_start", instance, data.clone()))
        .await;

    router
        .handle_event(stream_event("stream_pause", instance, data.clone()))
        .await;
    assert_stream_status(&test.client, &tab.session_id, StreamStatus::Paused, MessageStatus::Paused).await;

    router
        .handle_event(stream_event("stream_resume", instance, data.clone()))
        .await;
    assert_stream_status(&test.client, &tab.session_id, StreamStatus::Active, MessageStatus::Active).await;

    router
        .handle_event(stream_event("stream_cancel", instance, data.clone()))
        .await;
    assert_stream_status(&test.client, &tab.session_id, StreamStatus::Cancelled, MessageStatus::Cancelled).await;

    router
        .handle_event(stream_event("stream_rewind", instance, data))
        .await;
    assert_stream_status(&test.client, &tab.session_id, StreamStatus::Cancelled, MessageStatus::Cancelled).await;
}

#[tokio::test]
async fn test_finished_stream_ignores_late_events() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let router = test.client.router();
    let instance = tab.instance_id.as_str();
    let sessions = test.client.sessions();
    let streams = test.client.streams();

    router
        .handle_event(stream_event("stream_start", instance, json!({"stream_id": "s5"})))
        .await;
    router
        .handle_event(stream_event("stream_cancel", instance, json!({"stream_id": "s5"})))
        .await;
    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s5", "chunk": "late"}),
        ))
        .await;

    let cancelled = sessions.get_message(&tab.session_id, "s5").await.unwrap();
    assert_eq!(cancelled.status, MessageStatus::Cancelled);
    assert_eq!(cancelled.content, "");
    assert_eq!(
        streams.get_stream_state("s5").await.unwrap().status,
        StreamStatus::Cancelled
    );

    router
        .handle_event(stream_event("stream_start", instance, json!({"stream_id": "s6"})))
        .await;
    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s6", "chunk": "done", "is_final": true}),
        ))
        .await;
    for kind in ["stream_pause", "stream_resume", "stream_cancel"] {
        router
            .handle_event(stream_event(kind, instance, json!({"stream_id": "s6"})))
            .await;
    }

    let completed = sessions.get_message(&tab.session_id, "s6").await.unwrap();
    assert_eq!(completed.status, MessageStatus::Completed);
    assert_eq!(completed.content, "done");
    assert_eq!(
        streams.get_stream_state("s6").await.unwrap().status,
        StreamStatus::Completed
    );
}

#[tokio::test]
async fn test_chunk_on_paused_stream_keeps_message_paused() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let router = test.client.router();
    let instance = tab.instance_id.as_str();

    router
        .handle_event(stream_event("stream_start", instance, json!({"stream_id": "s7"})))
        .await;
    router
        .handle_event(stream_event("stream_pause", instance, json!({"stream_id": "s7"})))
        .await;
    router
        .handle_event(stream_event(
            "stream_data",
            instance,
            json!({"stream_id": "s7", "chunk": "buffered"}),
        ))
        .await;

    let message = test
        .client
        .sessions()
        .get_message(&tab.session_id, "s7")
        .await
        .unwrap();
    assert_eq!(message.content, "buffered");
    assert_eq!(message.status, MessageStatus::Paused);
}

#[tokio::test]
async fn test_plugin_message_routes_to_instance_session() {
    let test = test_client().await;
    let tabs = test.client.tabs();
    let first = tabs.create_new_tab("echo", None).await.unwrap();
    let second = tabs.create_new_tab("notes", None).await.unwrap();
    assert_eq!(tabs.active_tab_id().await, Some(second.id.clone()));

    test.client
        .router()
        .handle_event(plugin_message(&first.instance_id, "background reply", "m1"))
        .await;

    let sessions = test.client.sessions();
    assert!(sessions.get_message(&first.session_id, "m1").await.is_some());
    assert!(sessions.get_message(&second.session_id, "m1").await.is_none());
}

#[tokio::test]
async fn test_plugin_message_falls_back_to_current_page() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();

    test.client
        .router()
        .handle_event(plugin_message("instance_unknown", "hi", "m2"))
        .await;

    let message = test
        .client
        .sessions()
        .get_message(&tab.session_id, "m2")
        .await
        .unwrap();
    assert_eq!(message.content, "hi");
    assert_eq!(message.role, MessageRole::Plugin);
}

#[tokio::test]
async fn test_plugin_message_without_context_creates_session() {
    let test = test_client().await;

    test.client
        .router()
        .handle_event(plugin_message("instance_unknown", "hello", "m3"))
        .await;

    let sessions = test.client.sessions().get_all_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].plugin_id, "echo");
    assert_eq!(sessions[0].messages[0].id, "m3");
}

#[tokio::test]
async fn test_malformed_event_does_not_stop_loop() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = test.client.start_event_loop(rx);

    tx.send(BackendEvent::new(CHANNEL_MESSAGE, "{not json")).unwrap();
    tx.send(BackendEvent::new("plugin-telemetry", "{}")).unwrap();
    tx.send(plugin_message(&tab.instance_id, "still alive", "m4"))
        .unwrap();
    drop(tx);
    subscription.join().await;

    let messages = test
        .client
        .sessions()
        .get_messages_by_session_id(&tab.session_id)
        .await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "still alive");
}

#[tokio::test]
async fn test_disconnect_request_disconnects_instance() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    let plugins = test.client.plugins();
    assert!(plugins.connect_plugin_instance(&tab.instance_id).await);

    test.client
        .router()
        .handle_event(BackendEvent::new(
            CHANNEL_DISCONNECT_REQUEST,
            json!({"instance_id": tab.instance_id}).to_string(),
        ))
        .await;

    assert_eq!(test.backend.disconnect_count(), 1);
    let instance = plugins.get_instance_state(&tab.instance_id).await.unwrap();
    assert!(instance.is_mounted);
    assert!(!instance.is_connected);
}

#[tokio::test]
async fn test_lifecycle_notice_goes_to_current_session() {
    let test = test_client().await;
    let router = test.client.router();

    router
        .handle_event(BackendEvent::new(CHANNEL_MOUNTED, r#"{"plugin":"echo"}"#))
        .await;
    assert!(test.client.sessions().get_all_sessions().await.is_empty());

    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();
    router
        .handle_event(BackendEvent::new(CHANNEL_MOUNTED, r#"{"plugin":"echo"}"#))
        .await;

    let messages = test
        .client
        .sessions()
        .get_messages_by_session_id(&tab.session_id)
        .await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::System);
    assert_eq!(messages[0].content, "Plugin echo mounted");
}

#[tokio::test]
async fn test_send_message_records_user_message_first() {
    let test = test_client().await;
    let tab = test.client.tabs().create_new_tab("echo", None).await.unwrap();

    let reply = test.client.send_message("ping", None, None).await.unwrap();

    assert_eq!(reply, "echo: ping");
    let sent = test.backend.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].instance_id, tab.instance_id);
    assert_eq!(sent[0].history, None);

    let messages = test
        .client
        .sessions()
        .get_messages_by_session_id(&tab.session_id)
        .await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_send_message_without_target_fails() {
    let test = test_client().await;

    let err = test.client.send_message("ping", None, None).await.unwrap_err();

    assert!(err.is_precondition());
    assert!(test.backend.sent.lock().unwrap().is_empty());
}
