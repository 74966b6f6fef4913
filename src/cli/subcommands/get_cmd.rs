// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

use anyhow::Context as _;
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;

use crate::config::Config;

#[derive(Debug, clap::Args)]
pub struct GetCommand {
    /// Root CID of the file to fetch
    pub cid: String,
    /// Path the fetched file is written to
    pub output: PathBuf,
}

impl GetCommand {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let url = format!("http://{}/api/v0/get/{}", config.client.rpc_address, self.cid);
        let response = reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .context("Is the daemon running?")?;

        anyhow::ensure!(
            response.status().is_success(),
            "daemon returned {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );

        let mut file = tokio::fs::File::create(&self.output)
            .await
            .with_context(|| format!("Failed to create {}", self.output.display()))?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.try_next().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        println!("Saved {} to {}", self.cid, self.output.display());
        Ok(())
    }
}
