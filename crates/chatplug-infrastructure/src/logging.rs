//! Tracing subscriber setup.
//!
//! Console output is always enabled. With `log_to_file` a daily-rolling file
//! is written under the logs directory as well. `RUST_LOG` overrides the
//! configured level.

use chatplug_core::config::ClientConfig;
use chatplug_core::error::{ChatError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "chatplug.log";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; keep it alive
/// for the lifetime of the process or buffered lines are lost.
pub fn init_logging(config: &ClientConfig, logs_dir: &Path) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(&config.log_level);
    let console = tracing_subscriber::fmt::layer().with_target(false);

    if config.log_to_file {
        std::fs::create_dir_all(logs_dir)?;
        let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()
            .map_err(|e| ChatError::config(format!("Failed to install logger: {}", e)))?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .map_err(|e| ChatError::config(format!("Failed to install logger: {}", e)))?;
        Ok(None)
    }
}
