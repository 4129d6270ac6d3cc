use std::path::PathBuf;

use thiserror::Error;

use crate::{resolve_address::ResolverError, server_address::AddressError};

/// Why a single protocol lookup did not produce a result.
///
/// Never leaves the probe: both variants fold into `ProtocolResult::Absent`.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Timeouts, refused connections, failed lookups.
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    /// The peer answered with something we could not make sense of.
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ProbeError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        ProbeError::Unexpected(message.into())
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        ProbeError::Unreachable(message.into())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Unreachable(err.to_string())
    }
}

impl From<ResolverError> for ProbeError {
    fn from(err: ResolverError) -> Self {
        ProbeError::Unreachable(err.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Unexpected(format!("Invalid status JSON: {err}"))
    }
}

impl From<std::num::ParseIntError> for ProbeError {
    fn from(err: std::num::ParseIntError) -> Self {
        ProbeError::Unexpected(format!("Invalid number in response: {err}"))
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Server list {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode server list: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("In-memory server list is poisoned")]
    Poisoned,
}

/// Malformed command arguments. The message is shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid server address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}
