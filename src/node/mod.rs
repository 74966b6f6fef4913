// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;

#[cfg(test)]
mod tests;

pub use errors::Error;

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use cid::Cid;
use futures::channel::oneshot;
use libp2p::PeerId;
use tokio::io::AsyncRead;
use tokio::task::JoinSet;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chunker::Chunker;
use crate::db::Blockstore;
use crate::libp2p::{
    NetworkMessage, RequestFailure,
    block_exchange::{BlockExchangeRequest, BlockExchangeResponse},
};
use crate::manifest::Manifest;

/// Maximum number of child block fetches in flight for a single file fetch.
const FETCH_CONCURRENCY: usize = 16;

/// Orchestrates ingest and retrieval on top of the block store and the swarm
/// service. The node itself is stateless between calls; all mutable state
/// lives in the store and in the DHT.
pub struct Node<DB> {
    store: Arc<DB>,
    network_sender: flume::Sender<NetworkMessage>,
    local_peer_id: PeerId,
}

impl<DB> Node<DB>
where
    DB: Blockstore + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<DB>,
        network_sender: flume::Sender<NetworkMessage>,
        local_peer_id: PeerId,
    ) -> Self {
        Node {
            store,
            network_sender,
            local_peer_id,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Ingests a byte stream: splits it into blocks, persists each block,
    /// announces it in the DHT and finally stores and announces the manifest.
    /// Returns the root CID under which the file can be fetched.
    ///
    /// Leaf blocks are announced before the manifest, so a peer that learns
    /// the root can find providers for every child. On cancellation, blocks
    /// written so far are left behind; a retry converges onto the same CIDs.
    pub async fn add_file<R>(&self, reader: R, token: &CancellationToken) -> Result<Cid, Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunker = Chunker::new(reader);
        let mut manifest = Manifest::default();

        while let Some(chunk) = chunker.next_chunk().await? {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let cid = self.store.put_block(&chunk)?;
            self.start_providing(cid).await;
            manifest.block_cids.push(cid.to_string());
        }

        let manifest_bytes = manifest.to_bytes()?;
        let root = self.store.put_block(&manifest_bytes)?;
        self.start_providing(root).await;

        debug!(
            "Added file with {} chunks as {root}",
            manifest.block_cids.len()
        );
        Ok(root)
    }

    /// Retrieves the file named by `root` and returns it as a byte stream.
    ///
    /// The local store is authoritative when it holds the root: the file is
    /// then reassembled purely from local blocks and a missing child is
    /// fatal. Otherwise the first non-self provider found in the DHT serves
    /// the manifest and all children, children in parallel.
    pub async fn get_file(
        &self,
        root: &str,
        token: &CancellationToken,
    ) -> Result<impl AsyncRead + Unpin + Send + use<DB>, Error> {
        let root = Cid::try_from(root)?;

        if let Some(manifest_bytes) = self.store.get_block(&root)? {
            let children = parse_children(&Manifest::from_bytes(&manifest_bytes)?)?;
            let mut blocks = Vec::with_capacity(children.len());
            for (index, cid) in children.iter().enumerate() {
                let data = self
                    .store
                    .get_block(cid)?
                    .ok_or(Error::ChunkMissing { index })?;
                blocks.push(Bytes::from(data));
            }
            return Ok(into_reader(blocks));
        }

        let providers = self.find_providers(root).await?;
        let provider = providers
            .into_iter()
            .find(|peer| *peer != self.local_peer_id)
            .ok_or(Error::NoProviders(root))?;
        debug!("Fetching {root} from provider {provider}");

        let manifest_bytes = match self.request_block(provider, root).await? {
            BlockExchangeResponse::Block(data) => data,
            BlockExchangeResponse::NotFound => return Err(Error::NotFound(root)),
            other => {
                return Err(Error::Transport(RequestFailure::Io(format!(
                    "provider rejected manifest request: {other:?}"
                ))));
            }
        };
        let children = parse_children(&Manifest::from_bytes(&manifest_bytes)?)?;

        let blocks = self.fetch_children(provider, &children, token).await?;
        Ok(into_reader(blocks))
    }

    /// Fetches all children from `provider`, at most [`FETCH_CONCURRENCY`] in
    /// flight, and returns them ordered by child index.
    async fn fetch_children(
        &self,
        provider: PeerId,
        children: &[Cid],
        token: &CancellationToken,
    ) -> Result<Vec<Bytes>, Error> {
        let mut slots: Vec<Option<Bytes>> = vec![None; children.len()];
        let mut tasks: JoinSet<(usize, Result<BlockExchangeResponse, Error>)> = JoinSet::new();
        let mut next = 0;

        while next < children.len() || !tasks.is_empty() {
            while next < children.len() && tasks.len() < FETCH_CONCURRENCY {
                let sender = self.network_sender.clone();
                let cid = children[next];
                let index = next;
                tasks.spawn(async move { (index, request_block(sender, provider, cid).await) });
                next += 1;
            }

            tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => match result {
                        Ok(BlockExchangeResponse::Block(data)) => {
                            slots[index] = Some(Bytes::from(data));
                        }
                        Ok(response) => {
                            debug!("Child {index} unavailable: {response:?}");
                            return Err(Error::ChunkMissing { index });
                        }
                        Err(Error::Cancelled) => return Err(Error::Cancelled),
                        Err(e) => {
                            debug!("Child {index} fetch failed: {e}");
                            return Err(Error::ChunkMissing { index });
                        }
                    },
                    Some(Err(e)) if e.is_cancelled() => return Err(Error::Cancelled),
                    Some(Err(e)) => {
                        return Err(Error::Transport(RequestFailure::Io(e.to_string())));
                    }
                    None => break,
                },
            }
        }

        let mut blocks = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            blocks.push(slot.ok_or(Error::ChunkMissing { index })?);
        }
        Ok(blocks)
    }

    async fn request_block(
        &self,
        peer_id: PeerId,
        cid: Cid,
    ) -> Result<BlockExchangeResponse, Error> {
        request_block(self.network_sender.clone(), peer_id, cid).await
    }

    async fn find_providers(&self, cid: Cid) -> Result<HashSet<PeerId>, Error> {
        let (response_channel, rx) = oneshot::channel();
        self.network_sender
            .send_async(NetworkMessage::FindProviders {
                cid,
                response_channel,
            })
            .await
            .map_err(|_| Error::Transport(RequestFailure::ServiceStopped))?;
        rx.await
            .map_err(|_| Error::Transport(RequestFailure::ServiceStopped))
    }

    /// Best-effort provider announcement; the DHT re-publishes on its own
    /// schedule, so failures are logged and swallowed.
    async fn start_providing(&self, cid: Cid) {
        if self
            .network_sender
            .send_async(NetworkMessage::StartProviding { cid })
            .await
            .is_err()
        {
            warn!("Cannot announce {cid}: network service is down");
        }
    }
}

async fn request_block(
    sender: flume::Sender<NetworkMessage>,
    peer_id: PeerId,
    cid: Cid,
) -> Result<BlockExchangeResponse, Error> {
    let (response_channel, rx) = oneshot::channel();
    sender
        .send_async(NetworkMessage::BlockRequest {
            peer_id,
            request: BlockExchangeRequest::new(cid),
            response_channel,
        })
        .await
        .map_err(|_| Error::Transport(RequestFailure::ServiceStopped))?;
    match rx.await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(failure)) => Err(failure.into()),
        Err(_) => Err(Error::Transport(RequestFailure::ServiceStopped)),
    }
}

fn parse_children(manifest: &Manifest) -> Result<Vec<Cid>, Error> {
    manifest
        .block_cids
        .iter()
        .enumerate()
        .map(|(index, text)| {
            Cid::try_from(text.as_str())
                .map_err(|e| Error::BadManifest(format!("invalid child CID at index {index}: {e}")))
        })
        .collect()
}

fn into_reader(blocks: Vec<Bytes>) -> impl AsyncRead + Unpin + Send {
    StreamReader::new(tokio_stream::iter(
        blocks.into_iter().map(Ok::<Bytes, io::Error>),
    ))
}
