//! Chat commands on top of the registry and the status cache.
//!
//! Each command maps `(chat_id, args)` plus the current state to a [`Reply`];
//! delivering the reply is up to the chat front-end.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    cache::StatusCache,
    error::UsageError,
    registry::{AddOutcome, RemoveOutcome},
    status::ServerStatus,
    ServerAddress,
};

pub const PLEASE_WAIT: &str = "⏳ Checking server status, please wait...";

const ADD_USAGE: &str = "add-server <host[:port]>";
const REMOVE_USAGE: &str = "remove-server <host[:port]>";
const INFO_USAGE: &str = "info <host[:port]>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddServer(ServerAddress),
    RemoveServer(String),
    Status,
    Info(ServerAddress),
    Refresh,
}

impl Command {
    /// Parse `[/]name[@bot] [args]`.
    pub fn parse(text: &str) -> Result<Self, UsageError> {
        let text = text.trim();
        let (name, args) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let name = name.trim_start_matches('/');
        let name = name.split('@').next().unwrap_or_default().to_ascii_lowercase();
        let args = args.trim();

        match name.as_str() {
            "add-server" | "addserver" | "addmcserver" => {
                required(args, ADD_USAGE)?;
                Ok(Command::AddServer(args.parse()?))
            }
            "remove-server" | "removeserver" | "rmmcserver" => {
                required(args, REMOVE_USAGE)?;
                Ok(Command::RemoveServer(args.to_string()))
            }
            "status" | "mcstatus" => Ok(Command::Status),
            "info" | "mcinfo" => {
                required(args, INFO_USAGE)?;
                Ok(Command::Info(args.parse()?))
            }
            "refresh" => Ok(Command::Refresh),
            _ => Err(UsageError::UnknownCommand(name)),
        }
    }
}

fn required(args: &str, usage: &'static str) -> Result<(), UsageError> {
    if args.is_empty() || args.split_whitespace().count() > 1 {
        return Err(UsageError::Usage(usage));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Usage,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Show a "refresh" affordance next to the reply.
    pub offer_refresh: bool,
    pub error: Option<ErrorCode>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            offer_refresh: false,
            error: None,
        }
    }

    fn with_refresh(mut self) -> Self {
        self.offer_refresh = true;
        self
    }

    fn error(code: ErrorCode, text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            offer_refresh: false,
            error: Some(code),
        }
    }
}

impl From<UsageError> for Reply {
    fn from(err: UsageError) -> Self {
        Reply::error(ErrorCode::Usage, err.to_string())
    }
}

/// Where a status request shows its progress: a placeholder first, then the
/// result in its place.
#[async_trait]
pub trait StatusPresenter: Send + Sync {
    async fn show_placeholder(&self, chat_id: &str, text: &str);
    async fn show_result(&self, chat_id: &str, reply: &Reply);
}

pub struct CommandHandler {
    cache: Arc<StatusCache>,
    status_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CommandHandler {
    pub fn new(cache: Arc<StatusCache>) -> Self {
        CommandHandler {
            cache,
            status_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Parse and run one command line.
    pub async fn handle(&self, chat_id: &str, text: &str) -> Reply {
        match Command::parse(text) {
            Ok(command) => self.run(chat_id, command).await,
            Err(err) => err.into(),
        }
    }

    pub async fn run(&self, chat_id: &str, command: Command) -> Reply {
        match command {
            Command::AddServer(address) => self.add_server(chat_id, address).await,
            Command::RemoveServer(host) => self.remove_server(chat_id, &host).await,
            Command::Status => self.status(chat_id).await,
            Command::Info(address) => self.info(&address).await,
            Command::Refresh => self.refresh(chat_id).await,
        }
    }

    pub async fn add_server(&self, chat_id: &str, address: ServerAddress) -> Reply {
        let display = address.to_string();
        let host = address.host.clone();
        match self.cache.registry().add(chat_id, address).await {
            Ok(AddOutcome::Added) => Reply::text(format!("✅ Added {display} to this chat.")),
            Ok(AddOutcome::AlreadyPresent) => {
                Reply::text(format!("ℹ️ {host} is already registered in this chat."))
            }
            Err(err) => storage_failure(chat_id, err),
        }
    }

    pub async fn remove_server(&self, chat_id: &str, host: &str) -> Reply {
        match self.cache.registry().remove(chat_id, host).await {
            Ok(RemoveOutcome::Removed(1)) => Reply::text(format!("🗑 Removed {host}.")),
            Ok(RemoveOutcome::Removed(count)) => {
                Reply::text(format!("🗑 Removed {count} servers matching {host}."))
            }
            Ok(RemoveOutcome::NotFound) => {
                Reply::text(format!("No registered server matches {host}."))
            }
            Err(err) => storage_failure(chat_id, err),
        }
    }

    /// Cached statuses of the chat's servers. Waits for any other status or
    /// refresh request of the same chat.
    pub async fn status(&self, chat_id: &str) -> Reply {
        let lock = self.status_lock(chat_id).await;
        let reply = {
            let _guard = lock.lock().await;
            self.cached_statuses(chat_id).await
        };
        self.release_status_lock(chat_id, lock).await;
        reply
    }

    /// Look up any address without registering or caching it.
    pub async fn info(&self, address: &ServerAddress) -> Reply {
        let status = self.cache.aggregator().aggregate(address).await;
        Reply::text(status.rendered_lines.join("\n"))
    }

    /// Fresh statuses of the chat's servers, stamped with the time of the
    /// lookup. Shares the chat's lock with [`Self::status`].
    pub async fn refresh(&self, chat_id: &str) -> Reply {
        let lock = self.status_lock(chat_id).await;
        let reply = {
            let _guard = lock.lock().await;
            self.fresh_statuses(chat_id).await
        };
        self.release_status_lock(chat_id, lock).await;
        reply
    }

    /// Run a status request end to end: placeholder, lookup, result. Requests
    /// for the same chat wait for each other; other chats are not held up.
    pub async fn present_status(&self, chat_id: &str, presenter: &dyn StatusPresenter) -> Reply {
        self.present(chat_id, presenter, false).await
    }

    /// Like [`Self::present_status`], but always looks the servers up again.
    pub async fn present_refresh(&self, chat_id: &str, presenter: &dyn StatusPresenter) -> Reply {
        self.present(chat_id, presenter, true).await
    }

    /// Chats with a status request in flight or waiting.
    pub async fn status_lock_count(&self) -> usize {
        self.status_locks.lock().await.len()
    }

    async fn present(
        &self,
        chat_id: &str,
        presenter: &dyn StatusPresenter,
        fresh: bool,
    ) -> Reply {
        let lock = self.status_lock(chat_id).await;
        let reply = {
            let _guard = lock.lock().await;
            presenter.show_placeholder(chat_id, PLEASE_WAIT).await;
            let reply = if fresh {
                self.fresh_statuses(chat_id).await
            } else {
                self.cached_statuses(chat_id).await
            };
            presenter.show_result(chat_id, &reply).await;
            reply
        };
        self.release_status_lock(chat_id, lock).await;
        reply
    }

    async fn cached_statuses(&self, chat_id: &str) -> Reply {
        if self.cache.registry().list(chat_id).await.is_empty() {
            return no_servers();
        }
        let statuses = self.cache.get_or_refresh(chat_id).await;
        render_statuses(&statuses).with_refresh()
    }

    async fn fresh_statuses(&self, chat_id: &str) -> Reply {
        if self.cache.registry().list(chat_id).await.is_empty() {
            return no_servers();
        }
        let statuses = self.cache.force_refresh(chat_id).await;
        let mut reply = render_statuses(&statuses).with_refresh();
        reply.text = format!(
            "{}\n\nLast updated: {}",
            reply.text,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        reply
    }

    async fn status_lock(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.status_locks.lock().await;
        Arc::clone(locks.entry(chat_id.to_string()).or_default())
    }

    /// Drop the chat's lock from the map once nobody else holds or awaits it.
    /// Clones are only taken under the map lock, so the count cannot grow
    /// while it is checked.
    async fn release_status_lock(&self, chat_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.status_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(chat_id);
        }
    }
}

fn render_statuses(statuses: &[ServerStatus]) -> Reply {
    if statuses.iter().all(ServerStatus::is_offline) {
        return Reply::text("🔴 None of this chat's servers are reachable right now.");
    }
    let lines: Vec<&str> = statuses
        .iter()
        .flat_map(|status| status.rendered_lines.iter().map(String::as_str))
        .collect();
    Reply::text(lines.join("\n"))
}

fn no_servers() -> Reply {
    Reply::text(format!(
        "No servers registered in this chat. Add one with {ADD_USAGE}."
    ))
}

fn storage_failure(chat_id: &str, err: crate::error::RegistryError) -> Reply {
    error!(chat_id, error = %err, "failed to persist server list");
    Reply::error(
        ErrorCode::Storage,
        "⚠️ Could not save the server list; the change may not have been saved.",
    )
}

/// Logs which command ran; used by front-ends that dispatch many chats.
pub fn log_command(chat_id: &str, text: &str, reply: &Reply) {
    info!(chat_id, command = text, error = ?reply.error, "handled command");
}
