// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wires the block store, the libp2p service, the node and the HTTP API
//! together and keeps them running.

use std::sync::Arc;

use anyhow::Context as _;
use libp2p::identity::Keypair;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::db::parity_db::ParityDb;
use crate::libp2p::Libp2pService;
use crate::node::Node;
use crate::rpc::start_rpc;

/// Starts the daemon. This future resolves only when one of the services
/// stops.
pub async fn start(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(
        ParityDb::open(config.client.data_dir.join("blocks"), &config.parity_db)
            .context("Failed to open the block store")?,
    );

    let net_keypair = Keypair::generate_ed25519();
    let p2p_service = Libp2pService::new(config.network.clone(), store.clone(), net_keypair)?;
    let local_peer_id = p2p_service.local_peer_id();
    info!("Starting storage node with peer id {local_peer_id}");

    let node = Arc::new(Node::new(
        store,
        p2p_service.network_sender(),
        local_peer_id,
    ));

    let mut services = JoinSet::new();
    services.spawn(p2p_service.run());
    services.spawn(start_rpc(node, config.client.rpc_address));

    // Propagate the first failure; every service is load-bearing.
    if let Some(result) = services.join_next().await {
        result??;
    }
    Ok(())
}
