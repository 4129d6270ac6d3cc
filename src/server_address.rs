//! Parsing and printing of `host[:port]` server addresses.
//!
//! Adapted from azalea's `ServerAddress`, with the port made optional so an
//! address can be probed with each protocol's own default port.

use std::{
    fmt::Display,
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default port of the Java edition status protocol.
pub const DEFAULT_JAVA_PORT: u16 = 25565;
/// Default port of the Bedrock edition RakNet listener.
pub const DEFAULT_BEDROCK_PORT: u16 = 19132;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,
    #[error("No host specified")]
    NoHost,
    #[error("Invalid port specified: {0}")]
    InvalidPort(String),
    #[error("Too many ':' in address: {0}")]
    TooManyColons(String),
}

/// A host and an optional port. It's possible that the host doesn't resolve
/// to anything.
///
/// # Examples
///
/// ```
/// use minecraft_status::ServerAddress;
///
/// let addr = ServerAddress::try_from("localhost:25565").unwrap();
/// assert_eq!(addr.host, "localhost");
/// assert_eq!(addr.port, Some(25565));
/// assert_eq!(addr.java_port(), 25565);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
}

impl ServerAddress {
    pub fn new(host: &str, port: Option<u16>) -> Self {
        ServerAddress {
            host: host.to_string(),
            port,
        }
    }

    /// Port used for the Java status query when none was given.
    pub fn java_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_JAVA_PORT)
    }

    /// Port used for the Bedrock ping when none was given.
    pub fn bedrock_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_BEDROCK_PORT)
    }

    /// Hosts are compared case-insensitively; the port is ignored.
    pub fn same_host(&self, other: &ServerAddress) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
    }

    pub fn host_starts_with(&self, prefix: &str) -> bool {
        self.host
            .to_ascii_lowercase()
            .starts_with(&prefix.to_ascii_lowercase())
    }

    /// The address as a socket address, if the host is already an IP.
    pub fn socket_addr(&self, port: u16) -> Option<SocketAddr> {
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, port))
    }
}

impl FromStr for ServerAddress {
    type Err = AddressError;

    /// Convert a Minecraft server address (host:port, the port is optional) to
    /// a `ServerAddress`
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let string = string.trim();
        if string.is_empty() {
            return Err(AddressError::Empty);
        }
        let mut parts = string.split(':');
        let host = parts.next().unwrap_or_default().trim();
        if host.is_empty() {
            return Err(AddressError::NoHost);
        }
        let port = match parts.next() {
            Some(port) => Some(
                u16::from_str(port)
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| AddressError::InvalidPort(port.to_string()))?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(AddressError::TooManyColons(string.to_string()));
        }
        Ok(ServerAddress::new(host, port))
    }
}

impl<'a> TryFrom<&'a str> for ServerAddress {
    type Error = AddressError;

    fn try_from(string: &str) -> Result<Self, Self::Error> {
        string.parse()
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = AddressError;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        string.parse()
    }
}

impl From<ServerAddress> for String {
    fn from(addr: ServerAddress) -> Self {
        addr.to_string()
    }
}

impl From<SocketAddr> for ServerAddress {
    /// Convert an existing `SocketAddr` into a `ServerAddress`. The resolver
    /// will realize it's already an IP address and not do any DNS requests.
    fn from(addr: SocketAddr) -> Self {
        ServerAddress {
            host: addr.ip().to_string(),
            port: Some(addr.port()),
        }
    }
}

impl Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_without_port() {
        let addr: ServerAddress = "play.example.com".parse().unwrap();
        assert_eq!(addr.host, "play.example.com");
        assert_eq!(addr.port, None);
        assert_eq!(addr.java_port(), DEFAULT_JAVA_PORT);
        assert_eq!(addr.bedrock_port(), DEFAULT_BEDROCK_PORT);
        assert_eq!(addr.to_string(), "play.example.com");
    }

    #[test]
    fn parses_host_with_port() {
        let addr: ServerAddress = " a.com:19132 ".parse().unwrap();
        assert_eq!(addr, ServerAddress::new("a.com", Some(19132)));
        assert_eq!(addr.to_string(), "a.com:19132");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!("".parse::<ServerAddress>(), Err(AddressError::Empty));
        assert_eq!(":25565".parse::<ServerAddress>(), Err(AddressError::NoHost));
        assert!(matches!(
            "a.com:port".parse::<ServerAddress>(),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            "a.com:".parse::<ServerAddress>(),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            "a.com:1:2".parse::<ServerAddress>(),
            Err(AddressError::TooManyColons(_))
        ));
    }

    #[test]
    fn same_host_ignores_port_and_case() {
        let a = ServerAddress::new("A.com", Some(25565));
        let b = ServerAddress::new("a.com", Some(19132));
        assert!(a.same_host(&b));
        assert!(a.host_starts_with("a."));
        assert!(!a.same_host(&ServerAddress::new("b.com", None)));
    }

    #[test]
    fn socket_addr_only_for_ip_hosts() {
        let ip = ServerAddress::new("127.0.0.1", None);
        assert_eq!(
            ip.socket_addr(19132),
            Some("127.0.0.1:19132".parse().unwrap())
        );
        assert_eq!(ServerAddress::new("localhost", None).socket_addr(1), None);
    }

    #[test]
    fn serializes_as_string() {
        let addr = ServerAddress::new("a.com", Some(25565));
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"a.com:25565\"");
        let back: ServerAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
