// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::{PeerId, StreamProtocol, kad, kad::store::MemoryStore};

/// Kademlia protocol name for the storage network.
pub const KADEMLIA_PROTOCOL_ID: StreamProtocol = StreamProtocol::new("/p2p-storage/kad/1.0.0");

/// Creates a kademlia behaviour in server mode, so that the node both stores
/// and serves provider records instead of waiting for an external trigger.
pub fn new_kademlia(peer_id: PeerId, protocol: StreamProtocol) -> kad::Behaviour<MemoryStore> {
    let config = kad::Config::new(protocol);
    let store = MemoryStore::new(peer_id);
    let mut kademlia = kad::Behaviour::with_config(peer_id, store, config);
    kademlia.set_mode(Some(kad::Mode::Server));
    kademlia
}
