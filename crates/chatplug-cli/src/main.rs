use anyhow::Result;
use chatplug_core::config::ClientConfig;
use chatplug_infrastructure::logging::init_logging;
use chatplug_infrastructure::{ChatplugPaths, ConfigService};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "chatplug")]
#[command(about = "chatplug CLI - inspect persisted client state", long_about = None)]
struct Cli {
    /// Use this directory for both configuration and data
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List open tabs
    Tabs,
    /// List chat sessions
    Sessions {
        /// Only sessions of this plugin
        #[arg(long)]
        plugin: Option<String>,
    },
    /// Session and message counts per plugin
    Stats,
    /// Page navigation history, most recent first
    History {
        /// Only pages of this plugin
        #[arg(long)]
        plugin: Option<String>,
    },
    /// List saved quick phrases, most recently updated first
    Shortcuts {
        /// Only shortcuts of this plugin
        #[arg(long)]
        plugin: Option<String>,
    },
    /// Inspect or initialize the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file if it does not exist
    Init,
}

pub struct Context {
    pub paths: ChatplugPaths,
    pub config: ClientConfig,
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.root {
        Some(root) => ChatplugPaths::with_root(root),
        None => ChatplugPaths::from_system()?,
    };
    let config_service = ConfigService::new(paths.config_file());

    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => println!("{}", config_service.path().display()),
            ConfigAction::Init => commands::config::init(&config_service)?,
            ConfigAction::Show => {
                commands::config::show(&config_service.load_or_default(), cli.json)?
            }
        }
        return Ok(());
    }

    let config = config_service.load_or_default();
    let paths = paths.apply_config(&config);
    let _log_guard = init_logging(&config, &paths.logs_dir())?;
    tracing::debug!("[CLI] Data directory: {}", paths.data_dir().display());

    let ctx = Context {
        paths,
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::Tabs => commands::tabs::list(&ctx).await?,
        Commands::Sessions { plugin } => commands::sessions::list(&ctx, plugin.as_deref()).await?,
        Commands::Stats => commands::sessions::stats(&ctx).await?,
        Commands::History { plugin } => commands::history::list(&ctx, plugin.as_deref()).await?,
        Commands::Shortcuts { plugin } => {
            commands::shortcuts::list(&ctx, plugin.as_deref()).await?
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
