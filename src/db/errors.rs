// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Database error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] parity_db::Error),
    #[error("{0}")]
    Other(String),
}
