use crate::Context;
use anyhow::Result;
use chatplug_core::shortcut::ShortcutStore;
use chatplug_infrastructure::JsonShortcutRepository;
use std::sync::Arc;

pub async fn list(ctx: &Context, plugin_id: Option<&str>) -> Result<()> {
    let store = ShortcutStore::new(Arc::new(JsonShortcutRepository::new(
        ctx.paths.shortcuts_file(),
    )));
    store.initialize().await;

    let shortcuts: Vec<_> = store
        .get_all_shortcuts()
        .await
        .into_iter()
        .filter(|entry| plugin_id.is_none_or(|id| entry.plugin_id == id))
        .collect();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&shortcuts)?);
        return Ok(());
    }

    if shortcuts.is_empty() {
        println!("No shortcuts.");
        return Ok(());
    }

    for entry in &shortcuts {
        println!(
            "{}  [{}] {}: {}",
            entry.shortcut.id, entry.plugin_id, entry.shortcut.title, entry.shortcut.content
        );
    }
    Ok(())
}
