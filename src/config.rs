// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::db::parity_db_config::ParityDbConfig;
use crate::libp2p::Libp2pConfig;

/// Daemon configuration, deserialized from a toml file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub network: Libp2pConfig,
    pub parity_db: ParityDbConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw).context("Failed to parse config file")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Block store directory, exclusively owned by the running daemon.
    pub data_dir: PathBuf,
    /// Listen address of the HTTP API.
    pub rpc_address: SocketAddr,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("p2p-storage-data"),
            rpc_address: SocketAddr::from(([127, 0, 0, 1], 2998)),
        }
    }
}
