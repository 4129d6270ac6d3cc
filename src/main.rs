use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use minecraft_status::{
    commands::log_command, Command, CommandHandler, Config, JsonFileStore, NetworkProbe,
    RefreshScheduler, RefreshScope, Reply, ServerRegistry, StatusAggregator, StatusCache,
    StatusPresenter,
};

/// Track Minecraft server status per chat from the console.
///
/// Reads `<chat_id> <command> [args]` lines from stdin, for example
/// `42 add-server play.example.com` or `42 status`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where the registered servers are stored (overrides the config file)
    #[arg(long)]
    servers_file: Option<PathBuf>,
}

/// Prints status placeholders and results as they happen.
struct ConsolePresenter;

#[async_trait]
impl StatusPresenter for ConsolePresenter {
    async fn show_placeholder(&self, chat_id: &str, text: &str) {
        println!("[{chat_id}] {text}");
    }

    async fn show_result(&self, chat_id: &str, reply: &Reply) {
        print_reply(chat_id, reply);
    }
}

fn print_reply(chat_id: &str, reply: &Reply) {
    for line in reply.text.lines() {
        println!("[{chat_id}] {line}");
    }
    if reply.offer_refresh {
        println!("[{chat_id}] (send `{chat_id} refresh` to update)");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(servers_file) = cli.servers_file {
        config.storage.servers_file = servers_file;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = JsonFileStore::new(&config.storage.servers_file);
    let registry = ServerRegistry::load(Box::new(store)).await.with_context(|| {
        format!(
            "Failed to load servers from {}",
            config.storage.servers_file.display()
        )
    })?;

    let probe = NetworkProbe::new(config.probe.timeout()).context("Failed to set up DNS resolver")?;
    let aggregator =
        StatusAggregator::with_concurrency(Arc::new(probe), config.probe.max_concurrent_probes);
    let cache = Arc::new(
        StatusCache::new(Arc::new(registry), aggregator)
            .with_max_age(config.refresh.max_age())
            .with_active_tracking(config.refresh.scope == RefreshScope::Active),
    );

    let scheduler = RefreshScheduler::new(Arc::clone(&cache))
        .with_interval(config.refresh.interval())
        .with_scope(config.refresh.scope);
    if config.refresh.enabled {
        scheduler.start().await;
    }

    let handler = CommandHandler::new(cache);
    let presenter = ConsolePresenter;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Ready, reading commands from stdin");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((chat_id, text)) = line.split_once(char::is_whitespace) else {
            warn!(line, "expected `<chat_id> <command> [args]`");
            continue;
        };

        let reply = match Command::parse(text) {
            Ok(Command::Status) => handler.present_status(chat_id, &presenter).await,
            Ok(Command::Refresh) => handler.present_refresh(chat_id, &presenter).await,
            Ok(command) => {
                let reply = handler.run(chat_id, command).await;
                print_reply(chat_id, &reply);
                reply
            }
            Err(err) => {
                let reply = Reply::from(err);
                print_reply(chat_id, &reply);
                reply
            }
        };
        log_command(chat_id, text, &reply);
    }

    scheduler.stop().await;
    info!("Shutdown complete");
    Ok(())
}
