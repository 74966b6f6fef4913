// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::Multiaddr;
use serde::{Deserialize, Serialize};

/// Libp2p config for the storage node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Libp2pConfig {
    /// Local address.
    pub listening_multiaddr: Multiaddr,
    /// Bootstrap peer list. Addresses must carry a `/p2p/<peer-id>` suffix.
    pub bootstrap_peers: Vec<Multiaddr>,
    /// Deadline for a single block exchange request, in seconds.
    pub block_request_timeout: u64,
}

impl Default for Libp2pConfig {
    fn default() -> Self {
        Self {
            listening_multiaddr: "/ip4/0.0.0.0/tcp/0"
                .parse()
                .expect("Parsing hard-coded multiaddr must succeed"),
            bootstrap_peers: vec![],
            block_request_timeout: 60,
        }
    }
}
