// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod subcommands;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::daemon;
use subcommands::{add_cmd::AddCommand, get_cmd::GetCommand};

/// Command-line interface for the peer-to-peer storage node.
#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"), version, about)]
pub struct Cli {
    #[command(flatten)]
    pub opts: CliOpts,
    #[command(subcommand)]
    pub cmd: Subcommand,
}

#[derive(Debug, clap::Args)]
pub struct CliOpts {
    /// Path to a toml configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address of the daemon HTTP API, overriding the config file.
    #[arg(long)]
    pub rpc_address: Option<SocketAddr>,
}

impl CliOpts {
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(rpc_address) = self.rpc_address {
            config.client.rpc_address = rpc_address;
        }
        Ok(config)
    }
}

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Run the storage node daemon
    Daemon,
    /// Add a file to the network through a running daemon
    Add(AddCommand),
    /// Fetch a file from the network through a running daemon
    Get(GetCommand),
}

pub async fn process(cmd: Subcommand, config: Config) -> anyhow::Result<()> {
    match cmd {
        Subcommand::Daemon => daemon::start(config).await,
        Subcommand::Add(cmd) => cmd.run(&config).await,
        Subcommand::Get(cmd) => cmd.run(&config).await,
    }
}
