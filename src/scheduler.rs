use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::Deserialize;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::StatusCache;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Which chats a refresh cycle re-aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshScope {
    /// Every chat with registered servers.
    #[default]
    All,
    /// Only chats whose status was requested since the previous cycle.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Still running, but the last cycle could not refresh every chat. The
    /// next cycle retries them.
    Faulted,
    Cancelled,
}

struct Running {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the status cache warm in the background.
pub struct RefreshScheduler {
    cache: Arc<StatusCache>,
    update_interval: Duration,
    scope: RefreshScope,
    running: Mutex<Option<Running>>,
    stopped: AtomicBool,
    /// Chats the last completed cycle left incomplete.
    failed_chats: Arc<AtomicUsize>,
}

impl RefreshScheduler {
    pub fn new(cache: Arc<StatusCache>) -> Self {
        RefreshScheduler {
            cache,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            scope: RefreshScope::default(),
            running: Mutex::new(None),
            stopped: AtomicBool::new(false),
            failed_chats: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = update_interval;
        self
    }

    pub fn with_scope(mut self, scope: RefreshScope) -> Self {
        self.scope = scope;
        self
    }

    pub async fn state(&self) -> SchedulerState {
        let running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            if self.failed_chats.load(Ordering::Acquire) > 0 {
                SchedulerState::Faulted
            } else {
                SchedulerState::Running
            }
        } else if self.stopped.load(Ordering::Acquire) {
            SchedulerState::Cancelled
        } else {
            SchedulerState::Idle
        }
    }

    /// Spawn the refresh loop. Starting a running scheduler does nothing.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }

        let shutdown = CancellationToken::new();
        self.failed_chats.store(0, Ordering::Release);
        let handle = tokio::spawn(refresh_loop(
            Arc::clone(&self.cache),
            self.update_interval,
            self.scope,
            Arc::clone(&self.failed_chats),
            shutdown.clone(),
        ));
        self.stopped.store(false, Ordering::Release);
        *running = Some(Running { shutdown, handle });

        info!(
            interval_secs = self.update_interval.as_secs_f64(),
            scope = ?self.scope,
            "started status refresh loop"
        );
    }

    /// Cancel the loop and wait until it has exited.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.shutdown.cancel();
        if let Err(err) = running.handle.await {
            error!(error = %err, "status refresh loop ended abnormally");
        }
        self.stopped.store(true, Ordering::Release);
    }
}

async fn refresh_loop(
    cache: Arc<StatusCache>,
    update_interval: Duration,
    scope: RefreshScope,
    failed_chats: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("status refresh loop: shutting down");
                break;
            }
            _ = tokio::time::sleep(update_interval) => {}
        }

        let chats = match scope {
            RefreshScope::All => cache.registry().chats().await,
            RefreshScope::Active => cache.take_active().await,
        };
        debug!(chats = chats.len(), "refreshing server statuses");

        let mut failed = 0;
        for chat_id in chats {
            // Failed address tasks are dropped by `aggregate_many`, which
            // leaves the entry shorter than the chat's server list.
            let expected = cache.registry().list(&chat_id).await.len();
            tokio::select! {
                _ = shutdown.cancelled() => return,
                statuses = cache.force_refresh(&chat_id) => {
                    if statuses.len() < expected {
                        warn!(
                            chat_id = %chat_id,
                            refreshed = statuses.len(),
                            expected,
                            "failed to refresh some server statuses"
                        );
                        failed += 1;
                    }
                }
            }
        }
        failed_chats.store(failed, Ordering::Release);
    }
}
