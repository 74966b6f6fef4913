// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod codec;
mod provider;

pub use codec::BlockExchangeCodec;
pub use provider::make_block_exchange_response;

use libp2p::StreamProtocol;

/// Libp2p protocol ID for the block exchange protocol.
pub const BLOCK_EXCHANGE_PROTOCOL_ID: StreamProtocol =
    StreamProtocol::new("/p2p-storage/block/1.0.0");

/// A request for a single block: the textual CID, terminated by half-closing
/// the write side of the stream. The text is parsed on the serving side so a
/// garbled request can be answered with [`BlockExchangeResponse::BadCid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockExchangeRequest {
    pub cid: String,
}

impl BlockExchangeRequest {
    pub fn new(cid: impl ToString) -> Self {
        Self {
            cid: cid.to_string(),
        }
    }
}

/// Status-tagged response to a block request. `Block` carries the raw bytes;
/// every other variant is a single status byte on the wire, which keeps an
/// empty block distinguishable from a missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockExchangeResponse {
    Block(Vec<u8>),
    NotFound,
    BadCid,
    StorageError,
}
