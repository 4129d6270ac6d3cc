use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{error::ConfigError, scheduler::RefreshScope};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_servers_file")]
    pub servers_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_update_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub scope: RefreshScope,
    /// Cached statuses older than this are refreshed on read. Defaults to
    /// the refresh interval.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

fn default_log_level() -> String {
    "minecraft_status=info".to_string()
}

fn default_servers_file() -> PathBuf {
    PathBuf::from("servers.json")
}

fn default_probe_timeout() -> u64 {
    crate::probe::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_max_concurrent_probes() -> usize {
    crate::status::DEFAULT_MAX_CONCURRENT_PROBES
}

fn default_true() -> bool {
    true
}

fn default_update_interval() -> u64 {
    crate::scheduler::DEFAULT_UPDATE_INTERVAL.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            probe: ProbeConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            servers_file: default_servers_file(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
            max_concurrent_probes: default_max_concurrent_probes(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_update_interval(),
            scope: RefreshScope::default(),
            max_age_secs: None,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn max_age(&self) -> Duration {
        self.max_age_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.interval())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        Self::parse(&contents).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
