use crate::Context;
use anyhow::{Context as _, Result};
use chatplug_core::tab::TabRepository;
use chatplug_infrastructure::JsonTabRepository;

pub async fn list(ctx: &Context) -> Result<()> {
    let repository = JsonTabRepository::new(ctx.paths.tabs_file());
    let snapshot = repository
        .load_tabs()
        .await
        .context("Failed to read tabs")?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.tabs.is_empty() {
        println!("No open tabs.");
        return Ok(());
    }

    for (index, tab) in snapshot.tabs.iter().enumerate() {
        let marker = if snapshot.active_tab_id.as_deref() == Some(tab.id.as_str()) {
            '*'
        } else {
            ' '
        };
        let pin = if tab.is_pinned { " [pinned]" } else { "" };
        println!(
            "{} {:>2}. {}{}  plugin={} instance={} session={}",
            marker, index + 1, tab.title, pin, tab.plugin_id, tab.instance_id, tab.session_id
        );
    }
    println!(
        "{} of {} tab(s) open",
        snapshot.tabs.len(),
        ctx.config.max_tabs
    );
    Ok(())
}
