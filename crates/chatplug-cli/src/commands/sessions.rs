use crate::Context;
use anyhow::Result;
use chatplug_core::session::SessionStore;
use chatplug_infrastructure::JsonHistoryRepository;
use std::sync::Arc;

async fn load_store(ctx: &Context) -> SessionStore {
    let repository = JsonHistoryRepository::new(ctx.paths.history_file());
    let store = SessionStore::new(Arc::new(repository));
    store.initialize().await;
    store
}

pub async fn list(ctx: &Context, plugin_id: Option<&str>) -> Result<()> {
    let store = load_store(ctx).await;
    let sessions = match plugin_id {
        Some(plugin_id) => store.get_sessions_by_plugin_id(plugin_id).await,
        None => store.get_all_sessions().await,
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for session in &sessions {
        println!(
            "{}  {}  plugin={} messages={} updated={}",
            session.id,
            session.title,
            session.plugin_id,
            session.messages.len(),
            session.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn stats(ctx: &Context) -> Result<()> {
    let store = load_store(ctx).await;
    let mut stats: Vec<_> = store.get_session_stats().await.into_iter().collect();
    stats.sort_by(|a, b| a.0.cmp(&b.0));

    if ctx.json {
        let map: std::collections::BTreeMap<_, _> = stats.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if stats.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for (plugin_id, count) in &stats {
        println!(
            "{:<24} sessions={:<4} messages={}",
            plugin_id, count.session_count, count.message_count
        );
    }
    Ok(())
}
