//! The per-protocol lookup capability consumed by the aggregator.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    error::ProbeError,
    ping_bedrock::PingBedrock,
    ping_java::PingJava,
    resolve_address::{Resolver, ResolverError},
    ServerAddress,
};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What one protocol reported about a live server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub players_online: u32,
    pub players_max: u32,
    pub version_name: String,
    pub sample_player_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolResult {
    Absent,
    Found(ProbeReport),
}

impl ProtocolResult {
    pub fn found(&self) -> Option<&ProbeReport> {
        match self {
            ProtocolResult::Found(report) => Some(report),
            ProtocolResult::Absent => None,
        }
    }
}

impl From<PingJava> for ProbeReport {
    fn from(ping: PingJava) -> Self {
        ProbeReport {
            sample_player_names: ping.sample_names(),
            players_online: ping.players.online,
            players_max: ping.players.max,
            version_name: ping.version.name,
        }
    }
}

impl From<PingBedrock> for ProbeReport {
    fn from(ping: PingBedrock) -> Self {
        ProbeReport {
            players_online: ping.player_count,
            players_max: ping.max_player_count,
            version_name: ping.version_name,
            sample_player_names: Vec::new(),
        }
    }
}

/// Looks a server up over each protocol. Implementations never fail: every
/// problem is reported as [`ProtocolResult::Absent`].
#[async_trait]
pub trait ServerProbe: Send + Sync {
    async fn probe_java(&self, address: &ServerAddress) -> ProtocolResult;
    async fn probe_bedrock(&self, address: &ServerAddress) -> ProtocolResult;
}

/// Probes real servers over the network.
pub struct NetworkProbe {
    resolver: Resolver,
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(timeout: Duration) -> Result<Self, ResolverError> {
        Ok(NetworkProbe {
            resolver: Resolver::new()?,
            timeout,
        })
    }
}

#[async_trait]
impl ServerProbe for NetworkProbe {
    async fn probe_java(&self, address: &ServerAddress) -> ProtocolResult {
        let lookup = PingJava::ping(&self.resolver, address);
        settle("java", address, with_timeout(self.timeout, lookup).await)
    }

    async fn probe_bedrock(&self, address: &ServerAddress) -> ProtocolResult {
        let lookup = PingBedrock::ping(&self.resolver, address);
        settle("bedrock", address, with_timeout(self.timeout, lookup).await)
    }
}

pub async fn with_timeout<T, F>(limit: Duration, lookup: F) -> Result<T, ProbeError>
where
    F: std::future::Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::unreachable(format!(
            "no answer within {}s",
            limit.as_secs_f32()
        ))),
    }
}

/// Fold a lookup outcome into a [`ProtocolResult`], logging the failure.
pub fn settle<T>(
    protocol: &'static str,
    address: &ServerAddress,
    outcome: Result<T, ProbeError>,
) -> ProtocolResult
where
    T: Into<ProbeReport>,
{
    match outcome {
        Ok(ping) => ProtocolResult::Found(ping.into()),
        Err(ProbeError::Unreachable(reason)) => {
            debug!(protocol, address = %address, %reason, "server unreachable");
            ProtocolResult::Absent
        }
        Err(err @ ProbeError::Unexpected(_)) => {
            warn!(protocol, address = %address, error = %err, "probe failed");
            ProtocolResult::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ProbeReport {
        ProbeReport {
            players_online: 1,
            players_max: 2,
            version_name: "1.20".into(),
            sample_player_names: vec![],
        }
    }

    #[tokio::test]
    async fn timeout_becomes_unreachable() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ProbeError>(report())
        };
        let outcome = with_timeout(Duration::from_millis(10), slow).await;
        assert!(matches!(outcome, Err(ProbeError::Unreachable(_))));
    }

    #[test]
    fn errors_settle_to_absent() {
        let address = ServerAddress::new("a.com", None);
        let unreachable: Result<ProbeReport, _> = Err(ProbeError::unreachable("refused"));
        let unexpected: Result<ProbeReport, _> = Err(ProbeError::unexpected("garbage"));
        assert_eq!(settle("java", &address, unreachable), ProtocolResult::Absent);
        assert_eq!(settle("java", &address, unexpected), ProtocolResult::Absent);
        assert_eq!(
            settle("java", &address, Ok(report())),
            ProtocolResult::Found(report())
        );
    }

    #[test]
    fn bedrock_reports_carry_no_samples() {
        let ping = PingBedrock::parse_pong(0, "MCPE;motd;594;1.20.10;4;8;").unwrap();
        let report = ProbeReport::from(ping);
        assert_eq!(report.players_online, 4);
        assert!(report.sample_player_names.is_empty());
    }
}
