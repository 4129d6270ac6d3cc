use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::{
    probe::{ProbeReport, ProtocolResult, ServerProbe},
    ServerAddress,
};

pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 16;

/// Player lists are only shown for servers this small.
const PLAYER_LIST_MAX_SLOTS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Offline,
    JavaOnly(ProbeReport),
    BedrockOnly(ProbeReport),
    Dual {
        java: ProbeReport,
        bedrock: ProbeReport,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub address: ServerAddress,
    pub classification: Classification,
    pub rendered_lines: Vec<String>,
}

impl ServerStatus {
    /// Combine both protocol outcomes for one address.
    pub fn reconcile(address: ServerAddress, java: ProtocolResult, bedrock: ProtocolResult) -> Self {
        let classification = match (java, bedrock) {
            (ProtocolResult::Absent, ProtocolResult::Absent) => Classification::Offline,
            (ProtocolResult::Found(java), ProtocolResult::Found(bedrock)) => {
                Classification::Dual { java, bedrock }
            }
            (ProtocolResult::Found(java), ProtocolResult::Absent) => Classification::JavaOnly(java),
            (ProtocolResult::Absent, ProtocolResult::Found(bedrock)) => {
                Classification::BedrockOnly(bedrock)
            }
        };
        let rendered_lines = vec![render_line(&address, &classification)];
        ServerStatus {
            address,
            classification,
            rendered_lines,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.classification == Classification::Offline
    }
}

fn render_line(address: &ServerAddress, classification: &Classification) -> String {
    match classification {
        Classification::Offline => format!("🔴 {address}: offline"),
        Classification::JavaOnly(java) => format!(
            "🟢 {address}: {}/{} players, Java {}{}",
            java.players_online,
            java.players_max,
            java.version_name,
            player_list_suffix(java.players_max, &java.sample_player_names),
        ),
        Classification::BedrockOnly(bedrock) => format!(
            "🟢 {address}: {}/{} players, Bedrock {}",
            bedrock.players_online, bedrock.players_max, bedrock.version_name,
        ),
        // bedrock's player count is the canonical one when both answer
        Classification::Dual { java, bedrock } => format!(
            "🟢 {address}: {}/{} players, Java {} / Bedrock {}{}",
            bedrock.players_online,
            bedrock.players_max,
            java.version_name,
            bedrock.version_name,
            player_list_suffix(bedrock.players_max, &java.sample_player_names),
        ),
    }
}

fn player_list_suffix(players_max: u32, names: &[String]) -> String {
    if players_max > PLAYER_LIST_MAX_SLOTS || names.is_empty() {
        return String::new();
    }
    format!(" [{}]", names.join(", "))
}

/// Runs both protocol probes for each address and reconciles the outcomes.
#[derive(Clone)]
pub struct StatusAggregator {
    probe: Arc<dyn ServerProbe>,
    permits: Arc<Semaphore>,
}

impl StatusAggregator {
    pub fn new(probe: Arc<dyn ServerProbe>) -> Self {
        Self::with_concurrency(probe, DEFAULT_MAX_CONCURRENT_PROBES)
    }

    pub fn with_concurrency(probe: Arc<dyn ServerProbe>, max_concurrent: usize) -> Self {
        StatusAggregator {
            probe,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Probe both protocols at once and wait for both; a fast answer from
    /// one never hides the other.
    pub async fn aggregate(&self, address: &ServerAddress) -> ServerStatus {
        let (java, bedrock) = tokio::join!(
            self.probe.probe_java(address),
            self.probe.probe_bedrock(address)
        );
        debug!(
            address = %address,
            java = java.found().is_some(),
            bedrock = bedrock.found().is_some(),
            "aggregated server status"
        );
        ServerStatus::reconcile(address.clone(), java, bedrock)
    }

    /// Aggregate every address concurrently. Output follows input order; an
    /// address whose task fails is logged and left out.
    pub async fn aggregate_many(&self, addresses: &[ServerAddress]) -> Vec<ServerStatus> {
        let tasks = addresses.iter().cloned().map(|address| {
            let aggregator = self.clone();
            tokio::spawn(async move {
                let _permit = aggregator.permits.clone().acquire_owned().await.ok();
                aggregator.aggregate(&address).await
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .zip(addresses)
            .filter_map(|(outcome, address)| match outcome {
                Ok(status) => Some(status),
                Err(err) => {
                    error!(address = %address, error = %err, "failed to retrieve server status");
                    None
                }
            })
            .collect()
    }
}
