// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use tracing::{debug, warn};

use super::{BlockExchangeRequest, BlockExchangeResponse};
use crate::db::Blockstore;

/// Builds a block exchange response out of the local block store.
pub fn make_block_exchange_response<DB>(
    store: &DB,
    request: &BlockExchangeRequest,
) -> BlockExchangeResponse
where
    DB: Blockstore,
{
    let cid = match Cid::try_from(request.cid.as_str()) {
        Ok(cid) => cid,
        Err(e) => {
            debug!("Cannot parse requested CID: {e}");
            return BlockExchangeResponse::BadCid;
        }
    };

    match store.get_block(&cid) {
        Ok(Some(data)) => BlockExchangeResponse::Block(data),
        Ok(None) => BlockExchangeResponse::NotFound,
        Err(e) => {
            warn!("Cannot read block {cid}: {e}");
            BlockExchangeResponse::StorageError
        }
    }
}
