use beacon_chain::ChainConfig;
use network::NetworkConfig;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use types::ChainSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    Archive,
    Prune,
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::Prune
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2pConfig {
    pub enabled: bool,
    pub interface: String,
    pub advertised_ip: Option<String>,
    pub port: u16,
    pub advertised_port: Option<u16>,
    pub static_peers: Vec<String>,
    pub discovery_enabled: bool,
    pub bootnodes: Vec<String>,
    pub peer_lower_bound: usize,
    pub peer_upper_bound: usize,
    pub private_key_file: Option<PathBuf>,
    pub snappy_enabled: bool,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: "0.0.0.0".to_string(),
            advertised_ip: None,
            port: 9000,
            advertised_port: None,
            static_peers: vec![],
            discovery_enabled: true,
            bootnodes: vec![],
            peer_lower_bound: 10,
            peer_upper_bound: 50,
            private_key_file: None,
            snappy_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireLogsConfig {
    pub cipher: bool,
    pub plain: bool,
    pub mux_frames: bool,
    pub gossip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    pub target_peer_count: usize,
    pub timeout_seconds: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            target_peer_count: 1,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Eth1Config {
    pub enabled: bool,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteropConfig {
    pub enabled: bool,
    pub genesis_time: u64,
    pub number_of_validators: usize,
    pub initial_state: Option<PathBuf>,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            genesis_time: 0,
            number_of_validators: 0,
            initial_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub mode: StorageMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
        }
    }
}

/// Everything the orchestrator needs to start a node, deserialised directly from a TOML file by
/// its caller -- parsing command-line arguments into this struct is the CLI/config loader's job,
/// out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    #[serde(skip, default = "ChainSpec::mainnet")]
    pub spec: ChainSpec,
    pub chain: ChainConfig,
    pub network: NetworkConfig,
    pub p2p: P2pConfig,
    pub wire_logs: WireLogsConfig,
    pub startup: StartupConfig,
    pub eth1: Eth1Config,
    pub interop: InteropConfig,
    pub storage: StorageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".lighthouse"),
            spec: ChainSpec::mainnet(),
            chain: ChainConfig::default(),
            network: NetworkConfig::default(),
            p2p: P2pConfig::default(),
            wire_logs: WireLogsConfig::default(),
            startup: StartupConfig::default(),
            eth1: Eth1Config::default(),
            interop: InteropConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses a config previously serialised from a `ClientConfig`, e.g. loaded from disk by the
    /// binary entry point. Malformed input is an `InvalidConfiguration` failure: fatal at
    /// startup, never started.
    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| format!("invalid configuration: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_storage_mode_is_prune() {
        assert_eq!(ClientConfig::default().storage.mode, StorageMode::Prune);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = ClientConfig::default();
        let raw = toml::to_string(&config).expect("serialisable");
        let parsed = ClientConfig::from_toml(&raw).expect("valid");
        assert_eq!(parsed.p2p.port, config.p2p.port);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(ClientConfig::from_toml("not valid toml {{{").is_err());
    }
}
