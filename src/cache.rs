//! Last known statuses per chat.
//!
//! An entry is replaced as a whole on every aggregation pass, always in
//! registry order. Consistency is judged by comparing the entry length with
//! the chat's current address count, so swapping one address for another
//! goes unnoticed until the next refresh. Entries older than the refresh
//! interval are stale as well.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{
    registry::ServerRegistry, scheduler::DEFAULT_UPDATE_INTERVAL, status::ServerStatus,
    status::StatusAggregator,
};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub chat_id: String,
    pub statuses: Vec<ServerStatus>,
    pub as_of: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now - self.as_of > max_age,
            Err(_) => false,
        }
    }
}

pub struct StatusCache {
    registry: Arc<ServerRegistry>,
    aggregator: StatusAggregator,
    entries: RwLock<HashMap<String, CacheEntry>>,
    active: Option<Mutex<HashSet<String>>>,
    max_age: Duration,
}

impl StatusCache {
    pub fn new(registry: Arc<ServerRegistry>, aggregator: StatusAggregator) -> Self {
        StatusCache {
            registry,
            aggregator,
            entries: RwLock::new(HashMap::new()),
            active: None,
            max_age: DEFAULT_UPDATE_INTERVAL,
        }
    }

    /// Treat entries older than `max_age` as stale. Defaults to the refresh
    /// interval.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Remember which chats were read, for [`Self::take_active`].
    pub fn with_active_tracking(mut self, enabled: bool) -> Self {
        self.active = enabled.then(|| Mutex::new(HashSet::new()));
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    /// Serve the cached entry when it still matches the registry, otherwise
    /// aggregate the chat's servers again.
    pub async fn get_or_refresh(&self, chat_id: &str) -> Vec<ServerStatus> {
        if let Some(active) = &self.active {
            active.lock().await.insert(chat_id.to_string());
        }

        let expected = self.registry.list(chat_id).await.len();
        if let Some(entry) = self.entries.read().await.get(chat_id) {
            let expired = entry.is_older_than(self.max_age, Utc::now());
            if entry.statuses.len() == expected && !expired {
                return entry.statuses.clone();
            }
            debug!(
                chat_id,
                cached = entry.statuses.len(),
                expected,
                expired,
                "cache entry is stale"
            );
        }
        self.force_refresh(chat_id).await
    }

    /// Aggregate the chat's servers and replace its entry.
    pub async fn force_refresh(&self, chat_id: &str) -> Vec<ServerStatus> {
        let addresses = self.registry.list(chat_id).await;
        if addresses.is_empty() {
            self.evict(chat_id).await;
            return Vec::new();
        }

        let statuses = self.aggregator.aggregate_many(&addresses).await;
        let entry = CacheEntry {
            chat_id: chat_id.to_string(),
            statuses: statuses.clone(),
            as_of: Utc::now(),
        };
        self.entries.write().await.insert(chat_id.to_string(), entry);
        statuses
    }

    pub async fn entry(&self, chat_id: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(chat_id).cloned()
    }

    pub async fn evict(&self, chat_id: &str) {
        self.entries.write().await.remove(chat_id);
    }

    /// Chats read through [`Self::get_or_refresh`] since the last call.
    /// Always empty unless active tracking is enabled.
    pub async fn take_active(&self) -> Vec<String> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        let mut active = active.lock().await;
        let mut chats: Vec<String> = active.drain().collect();
        chats.sort();
        chats
    }
}
