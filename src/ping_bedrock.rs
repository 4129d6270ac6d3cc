use phf::phf_map;
use rust_raknet::RaknetSocket;

use crate::{error::ProbeError, resolve_address::Resolver, ServerAddress};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BedrockServerEdition {
    BedrockEdition,
    EducationEdition,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BedrockServerGamemode {
    Creative,
    Survival,
    Adventure,
    Spectator,
    Unknown,
}

static EDITIONS: phf::Map<&'static str, BedrockServerEdition> = phf_map! {
    "MCPE" => BedrockServerEdition::BedrockEdition,
    "MCEE" => BedrockServerEdition::EducationEdition,
};

static GAMEMODES: phf::Map<&'static str, BedrockServerGamemode> = phf_map! {
    "Creative" => BedrockServerGamemode::Creative,
    "Survival" => BedrockServerGamemode::Survival,
    "Adventure" => BedrockServerGamemode::Adventure,
    "Spectator" => BedrockServerGamemode::Spectator,
};

/// Fields up to and including the max player count are required.
const REQUIRED_SECTIONS: usize = 6;

#[derive(Debug, Clone)]
pub struct PingBedrock {
    pub response_time: i64,
    pub edition: BedrockServerEdition,
    pub motd: String,
    pub protocol_version: i64,
    pub version_name: String,
    pub player_count: u32,
    pub max_player_count: u32,
    pub server_unique_id: String,
    pub game_mode: BedrockServerGamemode,
    pub port_v4: Option<u16>,
    pub port_v6: Option<u16>,
}

impl PingBedrock {
    pub async fn ping(resolver: &Resolver, addr: &ServerAddress) -> Result<Self, ProbeError> {
        let socket_addr = resolver.resolve_bedrock(addr).await?;
        let (latency, pong) = RaknetSocket::ping(&socket_addr)
            .await
            .map_err(|err| ProbeError::unreachable(format!("RakNet ping failed: {err:?}")))?;
        Self::parse_pong(latency, &pong)
    }

    /// Parse the `;`-separated server id string of an unconnected pong.
    ///
    /// `MCPE;motd;protocol;version;online;max;server_id;motd2;gamemode;gamemode_num;port_v4;port_v6;`
    pub fn parse_pong(response_time: i64, pong: &str) -> Result<Self, ProbeError> {
        let sections: Vec<&str> = pong.split(';').collect();
        if sections.len() < REQUIRED_SECTIONS {
            return Err(ProbeError::unexpected(format!(
                "Received invalid data: {} sections",
                sections.len()
            )));
        }
        let field = |index: usize| sections.get(index).copied().unwrap_or_default();
        let optional_port = |index: usize| field(index).parse::<u16>().ok();

        let edition = EDITIONS
            .get(field(0))
            .copied()
            .unwrap_or(BedrockServerEdition::Unknown);
        let mut motd = field(1).to_string();
        let second_motd = field(7);
        if !second_motd.is_empty() {
            motd = format!("{motd}\n{second_motd}");
        }

        Ok(PingBedrock {
            response_time,
            edition,
            motd,
            protocol_version: field(2).parse()?,
            version_name: field(3).to_string(),
            player_count: field(4).parse()?,
            max_player_count: field(5).parse()?,
            server_unique_id: field(6).to_string(),
            game_mode: GAMEMODES
                .get(field(8))
                .copied()
                .unwrap_or(BedrockServerGamemode::Unknown),
            port_v4: optional_port(10),
            port_v6: optional_port(11),
        })
    }
}
