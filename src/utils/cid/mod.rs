// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

/// Multicodec code for raw binary payloads.
pub const RAW: u64 = 0x55;

/// Extension methods for constructing content identifiers.
pub trait CidExt {
    /// Digests `data` with SHA-256 and wraps the multihash in a v1 CID with
    /// the RAW codec. Deterministic: byte-equal inputs yield equal CIDs.
    fn from_raw_sha256(data: &[u8]) -> Cid;
}

impl CidExt for Cid {
    fn from_raw_sha256(data: &[u8]) -> Cid {
        Cid::new_v1(RAW, Code::Sha2_256.digest(data))
    }
}
