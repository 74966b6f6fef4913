// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

use crate::db;
use crate::libp2p::RequestFailure;

/// Errors surfaced by node ingest and fetch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed textual CID. Raised before any I/O happens.
    #[error("invalid CID: {0}")]
    BadCid(#[from] cid::Error),
    /// Manifest bytes failed to decode, or a child CID inside the manifest is
    /// invalid.
    #[error("invalid manifest: {0}")]
    BadManifest(String),
    /// The block is absent from the local store.
    #[error("block {0} not found")]
    NotFound(Cid),
    /// The DHT knows no usable provider for the root.
    #[error("no providers found for {0}")]
    NoProviders(Cid),
    /// Stream open, read or write failed.
    #[error("transport error: {0}")]
    Transport(RequestFailure),
    /// The per-request deadline elapsed.
    #[error("request timed out")]
    Timeout,
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
    /// Block store engine failure.
    #[error(transparent)]
    StorageIo(#[from] db::Error),
    /// The input stream handed to ingest failed.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    /// A specific child block could not be fetched; the whole fetch fails.
    #[error("chunk {index} could not be fetched")]
    ChunkMissing { index: usize },
}

impl From<RequestFailure> for Error {
    fn from(err: RequestFailure) -> Self {
        match err {
            RequestFailure::Timeout => Self::Timeout,
            other => Self::Transport(other),
        }
    }
}

impl From<quick_protobuf::Error> for Error {
    fn from(err: quick_protobuf::Error) -> Self {
        Self::BadManifest(err.to_string())
    }
}
