// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use libp2p::{
    identify,
    identity::PublicKey,
    kad,
    kad::store::MemoryStore,
    ping, request_response,
    swarm::NetworkBehaviour,
};

use super::{
    block_exchange::{BLOCK_EXCHANGE_PROTOCOL_ID, BlockExchangeCodec},
    config::Libp2pConfig,
    discovery::{KADEMLIA_PROTOCOL_ID, new_kademlia},
};

/// Libp2p behaviour for the storage node. This composes the sub-protocols
/// needed to announce, discover and exchange blocks.
#[derive(NetworkBehaviour)]
pub(crate) struct StorageBehaviour {
    pub(crate) kademlia: kad::Behaviour<MemoryStore>,
    pub(crate) ping: ping::Behaviour,
    pub(crate) identify: identify::Behaviour,
    pub(crate) block_exchange: request_response::Behaviour<BlockExchangeCodec>,
}

impl StorageBehaviour {
    pub fn new(local_public_key: &PublicKey, config: &Libp2pConfig) -> Self {
        let peer_id = local_public_key.to_peer_id();
        let kademlia = new_kademlia(peer_id, KADEMLIA_PROTOCOL_ID);
        let identify = identify::Behaviour::new(
            identify::Config::new("p2p-storage/0.1.0".into(), local_public_key.clone())
                .with_agent_version(format!("p2p-storage-{}", env!("CARGO_PKG_VERSION"))),
        );
        let block_exchange = request_response::Behaviour::with_codec(
            BlockExchangeCodec,
            [(
                BLOCK_EXCHANGE_PROTOCOL_ID,
                request_response::ProtocolSupport::Full,
            )],
            request_response::Config::default()
                .with_request_timeout(Duration::from_secs(config.block_request_timeout)),
        );

        StorageBehaviour {
            kademlia,
            ping: ping::Behaviour::default(),
            identify,
            block_exchange,
        }
    }
}
