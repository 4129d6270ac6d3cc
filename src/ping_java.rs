use serde::Deserialize;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use crate::{
    error::ProbeError,
    packetutil::{read_packet, read_varint, send_prefixed_packet, write_string, write_varint},
    resolve_address::Resolver,
    ServerAddress,
};

/// Protocol version sent in the handshake - 760 (1.19.2). Servers answer
/// status requests for any version.
const HANDSHAKE_PROTOCOL_VERSION: i32 = 760;
const NEXT_STATE_STATUS: i32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct JavaVersion {
    pub name: String,
    #[serde(default)]
    pub protocol: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JavaPlayerSample {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JavaPlayers {
    pub online: u32,
    pub max: u32,
    #[serde(default)]
    pub sample: Vec<JavaPlayerSample>,
}

/// The JSON document returned by a Java edition status request.
#[derive(Debug, Clone, Deserialize)]
pub struct PingJava {
    pub version: JavaVersion,
    pub players: JavaPlayers,
    #[serde(default)]
    pub description: serde_json::Value,
}

impl PingJava {
    pub async fn ping(resolver: &Resolver, addr: &ServerAddress) -> Result<Self, ProbeError> {
        let socket_addr = resolver.resolve_java(addr).await?;
        let mut connection = TcpStream::connect(socket_addr).await?;
        Self::query(&mut connection, &addr.host, socket_addr.port()).await
    }

    /// Run the handshake and status request over an established stream.
    pub async fn query<S>(connection: &mut S, host: &str, port: u16) -> Result<Self, ProbeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut connect_packet: Vec<u8> = vec![0x00];
        write_varint(&mut connect_packet, HANDSHAKE_PROTOCOL_VERSION);
        write_string(&mut connect_packet, host);
        connect_packet.extend_from_slice(&port.to_be_bytes());
        write_varint(&mut connect_packet, NEXT_STATE_STATUS);
        send_prefixed_packet(connection, &connect_packet).await?;

        send_prefixed_packet(connection, &[0x00]).await?;

        let (packet_id, body) = read_packet(connection).await?;
        Self::parse_status(packet_id, &body).await
    }

    async fn parse_status(packet_id: i32, body: &[u8]) -> Result<Self, ProbeError> {
        if packet_id != 0x00 {
            return Err(ProbeError::unexpected(format!(
                "Expected status response, got packet {packet_id:#04x}"
            )));
        }
        let mut body = body;
        let len = read_varint(&mut body).await?;
        if len < 0 || len as usize > body.len() {
            return Err(ProbeError::unexpected("Status string length out of bounds"));
        }
        let json = &body[..len as usize];
        Ok(serde_json::from_slice(json)?)
    }

    pub fn sample_names(&self) -> Vec<String> {
        self.players
            .sample
            .iter()
            .map(|player| player.name.clone())
            .collect()
    }
}
