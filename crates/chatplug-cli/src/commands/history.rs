use crate::Context;
use anyhow::{Context as _, Result};
use chatplug_core::page::PageHistoryRepository;
use chatplug_infrastructure::JsonPageHistoryRepository;

pub async fn list(ctx: &Context, plugin_id: Option<&str>) -> Result<()> {
    let repository = JsonPageHistoryRepository::new(ctx.paths.page_history_file());
    let mut entries = repository
        .load_history()
        .await
        .context("Failed to read page history")?;

    if let Some(plugin_id) = plugin_id {
        entries.retain(|e| e.page_state.plugin_id == plugin_id);
    }
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No page history.");
        return Ok(());
    }

    for entry in &entries {
        let page = &entry.page_state;
        println!(
            "{}  {}  plugin={} instance={} session={}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            page.title.as_deref().unwrap_or("(untitled)"),
            page.plugin_id,
            page.instance_id,
            page.session_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
