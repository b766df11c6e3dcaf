mod client;
mod client_config;

pub use crate::client::{Client, Error};
pub use client_config::{
    ClientConfig, Eth1Config, InteropConfig, P2pConfig, StartupConfig, StorageConfig,
    StorageMode, WireLogsConfig,
};
