//! Per-chat lists of registered server addresses, persisted as a JSON
//! document of `chat_id -> ["host[:port]", ...]`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex as StdMutex,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::{info, warn};

use crate::{error::RegistryError, ServerAddress};

pub type ServerMap = BTreeMap<String, Vec<ServerAddress>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(usize),
    NotFound,
}

/// Durable storage for the whole server map.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn load(&self) -> Result<ServerMap, RegistryError>;
    async fn save(&self, servers: &ServerMap) -> Result<(), RegistryError>;
}

/// On-disk form. Addresses stay strings until each one is parsed on its own.
type StoredMap = BTreeMap<String, Vec<String>>;

/// Stores the map in a JSON file, replaced atomically on every save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> Result<ServerMap, RegistryError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ServerMap::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        let stored: StoredMap =
            serde_json::from_slice(&contents).map_err(|source| RegistryError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let mut servers = ServerMap::new();
        for (chat_id, entries) in stored {
            let addresses: Vec<ServerAddress> = entries
                .iter()
                .filter_map(|entry| match entry.parse::<ServerAddress>() {
                    Ok(address) => Some(address),
                    Err(err) => {
                        warn!(
                            path = %self.path.display(),
                            chat_id = %chat_id,
                            entry = %entry,
                            error = %err,
                            "skipping invalid stored server address"
                        );
                        None
                    }
                })
                .collect();
            if !addresses.is_empty() {
                servers.insert(chat_id, addresses);
            }
        }
        Ok(servers)
    }

    async fn save(&self, servers: &ServerMap) -> Result<(), RegistryError> {
        let contents = serde_json::to_vec_pretty(servers)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|err| self.io_error(err))?;
        file.write_all(&contents)
            .await
            .map_err(|err| self.io_error(err))?;
        // The data must be on disk before the rename makes it visible.
        file.sync_all().await.map_err(|err| self.io_error(err))?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| self.io_error(err))
    }
}

/// Keeps the map in memory only. Useful for tests and embedders that persist
/// elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    saved: StdMutex<ServerMap>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> Result<ServerMap, RegistryError> {
        self.saved
            .lock()
            .map(|saved| saved.clone())
            .map_err(|_| RegistryError::Poisoned)
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn load(&self) -> Result<ServerMap, RegistryError> {
        self.snapshot()
    }

    async fn save(&self, servers: &ServerMap) -> Result<(), RegistryError> {
        let mut saved = self.saved.lock().map_err(|_| RegistryError::Poisoned)?;
        *saved = servers.clone();
        Ok(())
    }
}

pub struct ServerRegistry {
    servers: Mutex<ServerMap>,
    store: Box<dyn RegistryStore>,
}

impl ServerRegistry {
    /// Load the registry from `store`. A missing file means no servers yet.
    pub async fn load(store: Box<dyn RegistryStore>) -> Result<Self, RegistryError> {
        let servers = store.load().await?;
        info!(chats = servers.len(), "loaded server registry");
        Ok(ServerRegistry {
            servers: Mutex::new(servers),
            store,
        })
    }

    pub async fn add(
        &self,
        chat_id: &str,
        address: ServerAddress,
    ) -> Result<AddOutcome, RegistryError> {
        let mut servers = self.servers.lock().await;
        let existing = servers.get(chat_id).map(Vec::as_slice).unwrap_or_default();
        if existing.iter().any(|stored| stored.same_host(&address)) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let mut updated = servers.clone();
        updated
            .entry(chat_id.to_string())
            .or_default()
            .push(address.clone());
        self.store.save(&updated).await?;
        *servers = updated;

        info!(chat_id, address = %address, "registered server");
        Ok(AddOutcome::Added)
    }

    /// Remove every address of the chat whose host starts with the host part
    /// of `host_prefix`.
    pub async fn remove(
        &self,
        chat_id: &str,
        host_prefix: &str,
    ) -> Result<RemoveOutcome, RegistryError> {
        let prefix = host_prefix.split(':').next().unwrap_or_default().trim();
        if prefix.is_empty() {
            return Ok(RemoveOutcome::NotFound);
        }

        let mut servers = self.servers.lock().await;
        let Some(existing) = servers.get(chat_id) else {
            return Ok(RemoveOutcome::NotFound);
        };
        let kept: Vec<ServerAddress> = existing
            .iter()
            .filter(|stored| !stored.host_starts_with(prefix))
            .cloned()
            .collect();
        let removed = existing.len() - kept.len();
        if removed == 0 {
            return Ok(RemoveOutcome::NotFound);
        }

        let mut updated = servers.clone();
        if kept.is_empty() {
            updated.remove(chat_id);
        } else {
            updated.insert(chat_id.to_string(), kept);
        }
        self.store.save(&updated).await?;
        *servers = updated;

        info!(chat_id, prefix, removed, "unregistered servers");
        Ok(RemoveOutcome::Removed(removed))
    }

    pub async fn list(&self, chat_id: &str) -> Vec<ServerAddress> {
        self.servers
            .lock()
            .await
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every chat with at least one registered address.
    pub async fn chats(&self) -> Vec<String> {
        self.servers.lock().await.keys().cloned().collect()
    }
}
