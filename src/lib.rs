#![doc = include_str!("../README.md")]

mod packetutil;

pub mod error;
pub use error::{ConfigError, ProbeError, RegistryError, UsageError};

mod server_address;
pub use server_address::{AddressError, ServerAddress, DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT};

mod resolve_address;
pub use resolve_address::{Resolver, ResolverError};

mod ping_java;
pub use ping_java::PingJava;

mod ping_bedrock;
pub use ping_bedrock::{BedrockServerEdition, BedrockServerGamemode, PingBedrock};

pub mod probe;
pub use probe::{NetworkProbe, ProbeReport, ProtocolResult, ServerProbe};

pub mod status;
pub use status::{Classification, ServerStatus, StatusAggregator};

pub mod registry;
pub use registry::{
    AddOutcome, JsonFileStore, MemoryStore, RegistryStore, RemoveOutcome, ServerRegistry,
};

pub mod cache;
pub use cache::{CacheEntry, StatusCache};

pub mod scheduler;
pub use scheduler::{RefreshScheduler, RefreshScope, SchedulerState};

pub mod commands;
pub use commands::{Command, CommandHandler, ErrorCode, Reply, StatusPresenter};

pub mod config;
pub use config::Config;
