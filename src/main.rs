// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use clap::Parser;
use p2p_storage::cli::{Cli, process};
use p2p_storage::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli { opts, cmd } = Cli::parse();
    logger::setup_logger();

    let config = opts.to_config()?;
    process(cmd, config).await
}
