#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use minecraft_status::{
    MemoryStore, ProbeReport, ProtocolResult, ServerAddress, ServerProbe, ServerRegistry,
    StatusAggregator, StatusCache,
};

#[derive(Clone)]
struct Scripted {
    result: ProtocolResult,
    delay: Duration,
}

/// Answers probes from a per-host script. Unknown hosts are absent.
#[derive(Default)]
pub struct ScriptedProbe {
    java: Mutex<HashMap<String, Scripted>>,
    bedrock: Mutex<HashMap<String, Scripted>>,
    panics: Mutex<HashSet<String>>,
    java_calls: AtomicUsize,
    bedrock_calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_java(&self, host: &str, report: ProbeReport, delay: Duration) {
        self.java.lock().unwrap().insert(
            host.to_string(),
            Scripted {
                result: ProtocolResult::Found(report),
                delay,
            },
        );
    }

    pub fn set_bedrock(&self, host: &str, report: ProbeReport, delay: Duration) {
        self.bedrock.lock().unwrap().insert(
            host.to_string(),
            Scripted {
                result: ProtocolResult::Found(report),
                delay,
            },
        );
    }

    /// Absent, but only after `delay`.
    pub fn set_java_absent_after(&self, host: &str, delay: Duration) {
        self.java.lock().unwrap().insert(
            host.to_string(),
            Scripted {
                result: ProtocolResult::Absent,
                delay,
            },
        );
    }

    pub fn clear(&self, host: &str) {
        self.java.lock().unwrap().remove(host);
        self.bedrock.lock().unwrap().remove(host);
    }

    pub fn panic_on(&self, host: &str) {
        self.panics.lock().unwrap().insert(host.to_string());
    }

    pub fn stop_panicking(&self, host: &str) {
        self.panics.lock().unwrap().remove(host);
    }

    pub fn java_calls(&self) -> usize {
        self.java_calls.load(Ordering::SeqCst)
    }

    pub fn bedrock_calls(&self) -> usize {
        self.bedrock_calls.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        script: &Mutex<HashMap<String, Scripted>>,
        address: &ServerAddress,
    ) -> ProtocolResult {
        if self.panics.lock().unwrap().contains(&address.host) {
            panic!("scripted probe failure for {}", address.host);
        }
        let scripted = script.lock().unwrap().get(&address.host).cloned();
        match scripted {
            Some(scripted) => {
                tokio::time::sleep(scripted.delay).await;
                scripted.result
            }
            None => ProtocolResult::Absent,
        }
    }
}

#[async_trait]
impl ServerProbe for ScriptedProbe {
    async fn probe_java(&self, address: &ServerAddress) -> ProtocolResult {
        self.java_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.java, address).await
    }

    async fn probe_bedrock(&self, address: &ServerAddress) -> ProtocolResult {
        self.bedrock_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.bedrock, address).await
    }
}

pub fn report(online: u32, max: u32, version: &str, samples: &[&str]) -> ProbeReport {
    ProbeReport {
        players_online: online,
        players_max: max,
        version_name: version.to_string(),
        sample_player_names: samples.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn addr(s: &str) -> ServerAddress {
    s.parse().unwrap()
}

pub async fn memory_registry() -> Arc<ServerRegistry> {
    Arc::new(
        ServerRegistry::load(Box::new(MemoryStore::default()))
            .await
            .unwrap(),
    )
}

pub async fn cache_with(probe: Arc<ScriptedProbe>) -> Arc<StatusCache> {
    let registry = memory_registry().await;
    Arc::new(StatusCache::new(registry, StatusAggregator::new(probe)))
}

pub async fn tracking_cache_with(probe: Arc<ScriptedProbe>) -> Arc<StatusCache> {
    let registry = memory_registry().await;
    Arc::new(StatusCache::new(registry, StatusAggregator::new(probe)).with_active_tracking(true))
}
