// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

use anyhow::Context as _;
use tokio_util::io::ReaderStream;

use crate::config::Config;
use crate::rpc::AddFileResponse;

#[derive(Debug, clap::Args)]
pub struct AddCommand {
    /// Path of the file to add
    pub path: PathBuf,
}

impl AddCommand {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let url = format!("http://{}/api/v0/add", config.client.rpc_address);
        let response = reqwest::Client::new()
            .post(&url)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .context("Is the daemon running?")?;

        anyhow::ensure!(
            response.status().is_success(),
            "daemon returned {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );

        let added: AddFileResponse = response.json().await?;
        println!("{}", added.root_cid);
        Ok(())
    }
}
