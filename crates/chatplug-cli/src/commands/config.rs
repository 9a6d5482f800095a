use anyhow::Result;
use chatplug_core::config::ClientConfig;
use chatplug_infrastructure::ConfigService;

pub fn show(config: &ClientConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("max_tabs               = {}", config.max_tabs);
    println!("stream_grace_period_ms = {}", config.stream_grace_period_ms);
    println!("page_history_limit     = {}", config.page_history_limit);
    println!("log_level              = {}", config.log_level);
    println!("log_to_file            = {}", config.log_to_file);
    match &config.data_dir {
        Some(dir) => println!("data_dir               = {}", dir.display()),
        None => println!("data_dir               = (default)"),
    }
    Ok(())
}

pub fn init(service: &ConfigService) -> Result<()> {
    if service.path().exists() {
        println!("Configuration already exists: {}", service.path().display());
        return Ok(());
    }
    service.load()?;
    println!("Wrote default configuration: {}", service.path().display());
    Ok(())
}
