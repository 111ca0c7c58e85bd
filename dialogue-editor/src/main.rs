use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use dialogue_client::{DialogueBackend, HttpBackend, MemoryBackend};
use dialogue_editor::view::voice_listing;
use dialogue_editor::{Config, ConsoleFrontend, ProjectListing, Session, repl};

#[derive(Parser)]
#[command(name = "dialogue-editor")]
#[command(about = "Turn dialogue text into a per-speaker, per-line text-to-speech project")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Dialogue service URL (overrides server_url from the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Use a throwaway in-memory service instead of the network
    #[arg(long, global = true, conflicts_with = "server")]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive editing session (default)
    Edit,
    /// List stored projects
    List,
    /// List available voices by category
    Voices,
    /// Manage settings (dialogue-editor.toml)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Some(Commands::Config { action }) => cmd_config(action),
        Some(Commands::List) => cmd_list(cli.server.as_deref(), cli.offline).await,
        Some(Commands::Voices) => cmd_voices(cli.server.as_deref(), cli.offline).await,
        Some(Commands::Edit) | None => cmd_edit(cli.server.as_deref(), cli.offline).await,
    }
}

fn connect(
    config: &Config,
    server: Option<&str>,
    offline: bool,
) -> Result<Arc<dyn DialogueBackend>> {
    if offline {
        log::info!("Using an in-memory service; nothing will be kept");
        return Ok(Arc::new(MemoryBackend::default()));
    }

    let server_url = server.unwrap_or(&config.server_url);
    log::debug!("Connecting to {}", server_url);
    let backend = HttpBackend::new(
        server_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to create HTTP client")?;
    Ok(Arc::new(backend))
}

async fn cmd_edit(server: Option<&str>, offline: bool) -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config, server, offline)?;

    let frontend = Arc::new(ConsoleFrontend::new());
    let mut session = Session::start(backend, frontend, &config.emotion_locale)
        .await
        .context("Failed to start editing session")?;

    repl::run(&mut session, &config).await
}

async fn cmd_list(server: Option<&str>, offline: bool) -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config, server, offline)?;

    let projects = backend
        .list_projects()
        .await
        .context("Failed to list projects")?;
    println!("{}", ProjectListing::new(projects));

    Ok(())
}

async fn cmd_voices(server: Option<&str>, offline: bool) -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config, server, offline)?;

    let catalog = backend
        .fetch_catalog()
        .await
        .context("Failed to fetch voice catalog")?;
    println!("{}", voice_listing(&catalog, None));

    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let path = Config::config_path()?;

            println!("Config file: {}\n", path.display());
            println!("server_url           = {}", config.server_url);
            println!("emotion_locale       = {}", config.emotion_locale);
            println!("request_timeout_secs = {}", config.request_timeout_secs);
            println!("download_dir         = {}", config.download_dir);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value.trim());
        }
    }

    Ok(())
}
