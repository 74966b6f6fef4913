// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! A peer-to-peer content-addressed file store.
//!
//! Files are split into fixed-size blocks, each block is named by the SHA-256
//! digest of its content and persisted in an embedded key-value store. Block
//! availability is announced in a Kademlia DHT; any peer that knows the root
//! CID of a file can locate a provider, fetch the manifest and reassemble the
//! file block by block over the block exchange protocol.

pub mod chunker;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod db;
pub mod libp2p;
pub mod logger;
pub mod manifest;
pub mod node;
pub mod rpc;
pub mod utils;
