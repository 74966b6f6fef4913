// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod behaviour;
pub mod block_exchange;
mod config;
mod discovery;
mod service;

#[cfg(test)]
mod tests;

pub(crate) use behaviour::{StorageBehaviour, StorageBehaviourEvent};
pub use config::Libp2pConfig;
pub use service::{Libp2pService, NetworkMessage, RequestFailure};
