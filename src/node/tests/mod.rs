// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use cid::Cid;
use futures::channel::oneshot;
use libp2p::{Multiaddr, PeerId, identity::Keypair, multiaddr::Protocol};
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::chunker::CHUNK_SIZE;
use crate::db::{Blockstore, MemoryDB};
use crate::libp2p::{Libp2pConfig, Libp2pService, NetworkMessage};
use crate::manifest::Manifest;
use crate::node::{Error, Node};
use crate::utils::cid::CidExt;

async fn read_all<R>(mut reader: R) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut out = vec![];
    reader.read_to_end(&mut out).await.unwrap();
    out
}

/// Network double for tests that never leave the local store: provider
/// lookups come back empty, announcements are accepted and dropped.
fn stub_network() -> flume::Sender<NetworkMessage> {
    let (tx, rx) = flume::unbounded();
    tokio::spawn(async move {
        while let Ok(message) = rx.recv_async().await {
            if let NetworkMessage::FindProviders {
                response_channel, ..
            } = message
            {
                let _ = response_channel.send(Default::default());
            }
        }
    });
    tx
}

fn local_node() -> (Node<MemoryDB>, MemoryDB) {
    let store = MemoryDB::default();
    let node = Node::new(Arc::new(store.clone()), stub_network(), PeerId::random());
    (node, store)
}

fn stored_manifest(store: &MemoryDB, root: &Cid) -> Manifest {
    let bytes = store.get_block(root).unwrap().unwrap();
    Manifest::from_bytes(&bytes).unwrap()
}

#[tokio::test]
async fn add_then_get_locally() {
    let token = CancellationToken::new();
    let (node, store) = local_node();

    let root = node.add_file(&b"Hello, world!"[..], &token).await.unwrap();
    assert_eq!(stored_manifest(&store, &root).block_cids.len(), 1);

    let reader = node.get_file(&root.to_string(), &token).await.unwrap();
    assert_eq!(read_all(reader).await, b"Hello, world!");
}

#[tokio::test]
async fn empty_file_round_trips() {
    let token = CancellationToken::new();
    let (node, store) = local_node();

    let root = node.add_file(&[][..], &token).await.unwrap();
    assert!(stored_manifest(&store, &root).block_cids.is_empty());

    let reader = node.get_file(&root.to_string(), &token).await.unwrap();
    assert!(read_all(reader).await.is_empty());
}

#[tokio::test]
async fn chunk_count_matches_exact_multiples() {
    let token = CancellationToken::new();
    for k in 1..=3 {
        let (node, store) = local_node();
        let content = vec![0xC3; k * CHUNK_SIZE];
        let root = node.add_file(content.as_slice(), &token).await.unwrap();
        assert_eq!(stored_manifest(&store, &root).block_cids.len(), k);
    }
}

#[tokio::test]
async fn identical_chunks_deduplicate() {
    let token = CancellationToken::new();
    let (node, store) = local_node();

    let content = vec![0; 3 * CHUNK_SIZE + 7];
    let root = node.add_file(content.as_slice(), &token).await.unwrap();

    let manifest = stored_manifest(&store, &root);
    assert_eq!(manifest.block_cids.len(), 4);
    // chunks 0..=2 are the same megabyte of zeros, hence the same block
    assert_eq!(manifest.block_cids[0], manifest.block_cids[1]);
    assert_eq!(manifest.block_cids[0], manifest.block_cids[2]);
    assert_ne!(manifest.block_cids[0], manifest.block_cids[3]);
    // two distinct leaves plus the manifest
    assert_eq!(store.len(), 3);

    let reader = node.get_file(&root.to_string(), &token).await.unwrap();
    assert_eq!(read_all(reader).await, content);
}

#[tokio::test]
async fn repeated_add_converges() {
    let token = CancellationToken::new();
    let (node, store) = local_node();

    let first = node.add_file(&b"same bytes"[..], &token).await.unwrap();
    let keys = store.len();
    let second = node.add_file(&b"same bytes"[..], &token).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.len(), keys);
}

#[tokio::test]
async fn unknown_root_fails_with_no_providers() {
    let token = CancellationToken::new();
    let (node, _) = local_node();

    let absent = Cid::from_raw_sha256(b"nobody has this").to_string();
    let err = node.get_file(&absent, &token).await.err().unwrap();
    assert!(matches!(err, Error::NoProviders(_)), "got {err}");
}

#[tokio::test]
async fn malformed_cid_fails_before_io() {
    let token = CancellationToken::new();
    let (node, _) = local_node();

    let err = node.get_file("not-a-cid", &token).await.err().unwrap();
    assert!(matches!(err, Error::BadCid(_)), "got {err}");
}

#[tokio::test]
async fn missing_local_child_is_fatal() {
    let token = CancellationToken::new();
    let (node, store) = local_node();

    let present = store.put_block(b"present").unwrap();
    let absent = Cid::from_raw_sha256(b"absent");
    let manifest = Manifest::new(vec![present.to_string(), absent.to_string()]);
    let root = store.put_block(&manifest.to_bytes().unwrap()).unwrap();

    let err = node.get_file(&root.to_string(), &token).await.err().unwrap();
    assert!(matches!(err, Error::ChunkMissing { index: 1 }), "got {err}");
}

#[tokio::test]
async fn cancellation_aborts_ingest() {
    let token = CancellationToken::new();
    token.cancel();
    let (node, _) = local_node();

    let content = vec![1; CHUNK_SIZE];
    let err = node
        .add_file(content.as_slice(), &token)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::Cancelled), "got {err}");
}

/// Spawns a full swarm service over a memory store and waits until it
/// listens. Returns the node, its store, the dialable address and the raw
/// service sender.
async fn start_swarm(
    bootstrap_peers: Vec<Multiaddr>,
) -> (
    Node<MemoryDB>,
    MemoryDB,
    Multiaddr,
    flume::Sender<NetworkMessage>,
) {
    let config = Libp2pConfig {
        listening_multiaddr: "/ip4/127.0.0.1/tcp/0".parse().unwrap(),
        bootstrap_peers,
        block_request_timeout: 5,
    };
    let store = MemoryDB::default();
    let service =
        Libp2pService::new(config, Arc::new(store.clone()), Keypair::generate_ed25519()).unwrap();
    let peer_id = service.local_peer_id();
    let sender = service.network_sender();
    tokio::spawn(service.run());

    let addr = loop {
        let (tx, rx) = oneshot::channel();
        sender
            .send_async(NetworkMessage::AddrsListen(tx))
            .await
            .unwrap();
        let (_, listeners) = rx.await.unwrap();
        if let Some(addr) = listeners.into_iter().next() {
            break addr;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    let node = Node::new(Arc::new(store.clone()), sender.clone(), peer_id);
    (node, store, addr.with(Protocol::P2p(peer_id)), sender)
}

/// Retries a fetch until the provider records have propagated.
async fn fetch_with_retries(
    node: &Node<MemoryDB>,
    root: &str,
    token: &CancellationToken,
) -> Result<Vec<u8>, Error> {
    let mut last = None;
    for _ in 0..100 {
        match node.get_file(root, token).await {
            Ok(reader) => return Ok(read_all(reader).await),
            Err(e @ Error::NoProviders(_)) => {
                last = Some(e);
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last.expect("retry loop ran at least once"))
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_over_the_network() {
    let token = CancellationToken::new();
    let (seeder, _, seeder_addr, _) = start_swarm(vec![]).await;
    let (fetcher, _, _, _) = start_swarm(vec![seeder_addr]).await;
    // Let the dial and identify exchange settle.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut content = vec![0; 2 * CHUNK_SIZE + 3];
    rand::rngs::OsRng.fill_bytes(&mut content);
    let root = seeder.add_file(content.as_slice(), &token).await.unwrap();

    let fetched = fetch_with_retries(&fetcher, &root.to_string(), &token)
        .await
        .expect("provider records never propagated");
    assert_eq!(fetched, content);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_before_announcement_fails_with_no_providers() {
    let token = CancellationToken::new();
    let (_seeder, seeder_store, seeder_addr, _) = start_swarm(vec![]).await;
    let (fetcher, _, _, _) = start_swarm(vec![seeder_addr]).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The seeder holds the block but has never announced it.
    let root = seeder_store.put_block(b"abc").unwrap();
    let err = fetcher
        .get_file(&root.to_string(), &token)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::NoProviders(_)), "got {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_remote_child_fails_with_chunk_missing() {
    let token = CancellationToken::new();
    let (_seeder, seeder_store, seeder_addr, seeder_sender) = start_swarm(vec![]).await;
    let (fetcher, _, _, _) = start_swarm(vec![seeder_addr]).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    // A manifest whose second child was never stored anywhere.
    let present = seeder_store.put_block(b"present").unwrap();
    let absent = Cid::from_raw_sha256(b"absent");
    let manifest = Manifest::new(vec![present.to_string(), absent.to_string()]);
    let root = seeder_store
        .put_block(&manifest.to_bytes().unwrap())
        .unwrap();
    seeder_sender
        .send_async(NetworkMessage::StartProviding { cid: root })
        .await
        .unwrap();

    let err = fetch_with_retries(&fetcher, &root.to_string(), &token)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::ChunkMissing { index: 1 }), "got {err}");
}
