// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cid::Cid;
use futures::channel::oneshot::Sender as OneShotSender;
use futures::select;
use futures::stream::StreamExt;
use libp2p::{
    Multiaddr, PeerId, Swarm, SwarmBuilder,
    identify, identity::Keypair, kad,
    multiaddr::Protocol,
    noise,
    request_response::{self, OutboundFailure, OutboundRequestId, ResponseChannel},
    swarm::SwarmEvent,
    tcp, yamux,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::{
    StorageBehaviour, StorageBehaviourEvent,
    block_exchange::{BlockExchangeRequest, BlockExchangeResponse, make_block_exchange_response},
    config::Libp2pConfig,
};
use crate::db::Blockstore;

/// Messages into the service to handle.
#[derive(Debug)]
pub enum NetworkMessage {
    /// Request a single block from `peer_id` over the block exchange
    /// protocol.
    BlockRequest {
        peer_id: PeerId,
        request: BlockExchangeRequest,
        response_channel: OneShotSender<Result<BlockExchangeResponse, RequestFailure>>,
    },
    /// Announce this peer as a provider for `cid`. Best-effort: failures are
    /// logged and the DHT re-publishes on its own schedule.
    StartProviding { cid: Cid },
    /// Look up peers that announced themselves as providers for `cid`. The
    /// local peer may be part of the answer.
    FindProviders {
        cid: Cid,
        response_channel: OneShotSender<HashSet<PeerId>>,
    },
    /// Report the local peer id together with the active listen addresses.
    AddrsListen(OneShotSender<(PeerId, Vec<Multiaddr>)>),
}

/// Failure modes of an outbound block request. This mirrors the internal
/// libp2p type, but avoids having to expose that internal type.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// The request could not be sent because a dialing attempt failed.
    #[error("dial failure")]
    DialFailure,
    /// The request timed out before a response was received.
    #[error("request timed out")]
    Timeout,
    /// The connection closed before a response was received.
    #[error("connection closed")]
    ConnectionClosed,
    /// The remote supports none of the requested protocols.
    #[error("unsupported protocols")]
    UnsupportedProtocols,
    /// An I/O failure on the stream.
    #[error("i/o failure: {0}")]
    Io(String),
    /// The network service is no longer running.
    #[error("network service is down")]
    ServiceStopped,
}

impl From<OutboundFailure> for RequestFailure {
    fn from(err: OutboundFailure) -> Self {
        match err {
            OutboundFailure::DialFailure => Self::DialFailure,
            OutboundFailure::Timeout => Self::Timeout,
            OutboundFailure::ConnectionClosed => Self::ConnectionClosed,
            OutboundFailure::UnsupportedProtocols => Self::UnsupportedProtocols,
            OutboundFailure::Io(e) => Self::Io(e.to_string()),
        }
    }
}

/// An in-flight provider lookup. Kademlia reports discovered providers
/// incrementally; they are accumulated here until the query finishes.
struct ProviderQuery {
    providers: HashSet<PeerId>,
    response_channel: OneShotSender<HashSet<PeerId>>,
}

type RequestTable =
    HashMap<OutboundRequestId, OneShotSender<Result<BlockExchangeResponse, RequestFailure>>>;

/// The `Libp2pService` drives the libp2p swarm: it serves inbound block
/// requests from the shared block store and executes [`NetworkMessage`]s
/// coming from the node.
pub struct Libp2pService<DB> {
    config: Libp2pConfig,
    swarm: Swarm<StorageBehaviour>,
    store: Arc<DB>,
    network_receiver_in: flume::Receiver<NetworkMessage>,
    network_sender_in: flume::Sender<NetworkMessage>,
}

impl<DB> Libp2pService<DB>
where
    DB: Blockstore + Send + Sync + 'static,
{
    pub fn new(
        config: Libp2pConfig,
        store: Arc<DB>,
        net_keypair: Keypair,
    ) -> anyhow::Result<Self> {
        let swarm = SwarmBuilder::with_existing_identity(net_keypair)
            .with_tokio()
            .with_tcp(
                tcp::Config::default().nodelay(true),
                noise::Config::new,
                yamux::Config::default,
            )?
            .with_dns()?
            .with_behaviour(|keypair| StorageBehaviour::new(&keypair.public(), &config))?
            .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(Duration::from_secs(60)))
            .build();

        let (network_sender_in, network_receiver_in) = flume::unbounded();

        Ok(Libp2pService {
            config,
            swarm,
            store,
            network_receiver_in,
            network_sender_in,
        })
    }

    /// Returns a sender which allows sending messages to the libp2p service.
    pub fn network_sender(&self) -> flume::Sender<NetworkMessage> {
        self.network_sender_in.clone()
    }

    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    /// Starts the libp2p service networking stack. This Future resolves when
    /// shutdown occurs.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Running libp2p service");
        self.swarm
            .listen_on(self.config.listening_multiaddr.clone())?;

        for multiaddr in &self.config.bootstrap_peers {
            let mut addr = multiaddr.clone();
            if let Some(Protocol::P2p(peer_id)) = addr.pop() {
                self.swarm
                    .behaviour_mut()
                    .kademlia
                    .add_address(&peer_id, addr);
            } else {
                warn!("Skipping bootstrap peer without /p2p suffix: {multiaddr}");
            }
        }
        if !self.config.bootstrap_peers.is_empty() {
            if let Err(e) = self.swarm.behaviour_mut().kademlia.bootstrap() {
                warn!("Failed to bootstrap with Kademlia: {e}");
            }
        }

        let mut swarm_stream = self.swarm.fuse();
        let mut network_stream = self.network_receiver_in.stream().fuse();

        let mut provider_queries: HashMap<kad::QueryId, ProviderQuery> = HashMap::new();
        let mut request_table: RequestTable = HashMap::new();
        // Inbound block requests are answered off the event loop; finished
        // responses come back over this channel.
        let (response_tx, response_rx) = flume::unbounded();
        let mut response_rx_stream = response_rx.stream().fuse();

        loop {
            select! {
                swarm_event = swarm_stream.next() => match swarm_event {
                    Some(SwarmEvent::Behaviour(event)) => handle_behaviour_event(
                        swarm_stream.get_mut(),
                        event,
                        &self.store,
                        &mut provider_queries,
                        &mut request_table,
                        &response_tx,
                    ),
                    Some(SwarmEvent::NewListenAddr { address, .. }) => {
                        info!("Listening on {address}");
                    }
                    None => break,
                    _ => {}
                },
                message = network_stream.next() => match message {
                    Some(message) => handle_network_message(
                        swarm_stream.get_mut(),
                        message,
                        &mut provider_queries,
                        &mut request_table,
                    ),
                    None => break,
                },
                pair_opt = response_rx_stream.next() => {
                    if let Some((channel, response)) = pair_opt {
                        let behaviour = swarm_stream.get_mut().behaviour_mut();
                        if behaviour.block_exchange.send_response(channel, response).is_err() {
                            debug!("Failed to send block exchange response: stream closed");
                        }
                    }
                },
            }
        }
        Ok(())
    }
}

fn handle_network_message(
    swarm: &mut Swarm<StorageBehaviour>,
    message: NetworkMessage,
    provider_queries: &mut HashMap<kad::QueryId, ProviderQuery>,
    request_table: &mut RequestTable,
) {
    match message {
        NetworkMessage::BlockRequest {
            peer_id,
            request,
            response_channel,
        } => {
            let request_id = swarm
                .behaviour_mut()
                .block_exchange
                .send_request(&peer_id, request);
            request_table.insert(request_id, response_channel);
        }
        NetworkMessage::StartProviding { cid } => {
            let key = kad::RecordKey::new(&cid.to_bytes());
            match swarm.behaviour_mut().kademlia.start_providing(key) {
                Ok(query_id) => trace!("Providing {cid} (query {query_id:?})"),
                Err(e) => warn!("Failed to announce provider record for {cid}: {e}"),
            }
        }
        NetworkMessage::FindProviders {
            cid,
            response_channel,
        } => {
            let key = kad::RecordKey::new(&cid.to_bytes());
            let query_id = swarm.behaviour_mut().kademlia.get_providers(key);
            provider_queries.insert(
                query_id,
                ProviderQuery {
                    providers: HashSet::new(),
                    response_channel,
                },
            );
        }
        NetworkMessage::AddrsListen(response_channel) => {
            let listeners: Vec<_> = Swarm::listeners(swarm).cloned().collect();
            let peer_id = *Swarm::local_peer_id(swarm);
            if response_channel.send((peer_id, listeners)).is_err() {
                debug!("Failed to report libp2p listeners");
            }
        }
    }
}

fn handle_behaviour_event<DB>(
    swarm: &mut Swarm<StorageBehaviour>,
    event: StorageBehaviourEvent,
    store: &Arc<DB>,
    provider_queries: &mut HashMap<kad::QueryId, ProviderQuery>,
    request_table: &mut RequestTable,
    response_tx: &flume::Sender<(ResponseChannel<BlockExchangeResponse>, BlockExchangeResponse)>,
) where
    DB: Blockstore + Send + Sync + 'static,
{
    match event {
        StorageBehaviourEvent::Kademlia(event) => handle_kademlia_event(event, provider_queries),
        StorageBehaviourEvent::BlockExchange(event) => {
            handle_block_exchange_event(event, store, request_table, response_tx)
        }
        StorageBehaviourEvent::Identify(identify::Event::Received { peer_id, info, .. }) => {
            // Feed identified addresses into the routing table so provider
            // records can be published to this peer.
            for addr in info.listen_addrs {
                swarm
                    .behaviour_mut()
                    .kademlia
                    .add_address(&peer_id, addr);
            }
        }
        StorageBehaviourEvent::Identify(_) => {}
        StorageBehaviourEvent::Ping(event) => match event.result {
            Ok(rtt) => {
                trace!(
                    "PingSuccess::Ping rtt to {} is {} ms",
                    event.peer.to_base58(),
                    rtt.as_millis()
                );
            }
            Err(e) => {
                debug!("Ping failure with {}: {e}", event.peer.to_base58());
            }
        },
    }
}

fn handle_kademlia_event(
    event: kad::Event,
    provider_queries: &mut HashMap<kad::QueryId, ProviderQuery>,
) {
    match event {
        kad::Event::OutboundQueryProgressed {
            id,
            result: kad::QueryResult::GetProviders(result),
            step,
            ..
        } => {
            match result {
                Ok(kad::GetProvidersOk::FoundProviders { providers, .. }) => {
                    if let Some(query) = provider_queries.get_mut(&id) {
                        query.providers.extend(providers);
                    }
                }
                Ok(kad::GetProvidersOk::FinishedWithNoAdditionalRecord { .. }) => {}
                Err(e) => debug!("Provider lookup failed: {e}"),
            }
            if step.last {
                if let Some(query) = provider_queries.remove(&id) {
                    if query.response_channel.send(query.providers).is_err() {
                        debug!("Provider lookup receiver dropped");
                    }
                }
            }
        }
        kad::Event::OutboundQueryProgressed {
            result: kad::QueryResult::StartProviding(result),
            ..
        } => match result {
            Ok(kad::AddProviderOk { key }) => {
                trace!("Provider record published for key {key:?}");
            }
            Err(e) => {
                // Non-fatal by contract: the DHT retries on its own cadence.
                warn!("Failed to publish provider record: {e}");
            }
        },
        kad::Event::RoutingUpdated { peer, .. } => {
            trace!("Kademlia routing table updated with {peer}");
        }
        _ => {}
    }
}

fn handle_block_exchange_event<DB>(
    event: request_response::Event<BlockExchangeRequest, BlockExchangeResponse>,
    store: &Arc<DB>,
    request_table: &mut RequestTable,
    response_tx: &flume::Sender<(ResponseChannel<BlockExchangeResponse>, BlockExchangeResponse)>,
) where
    DB: Blockstore + Send + Sync + 'static,
{
    match event {
        request_response::Event::Message { peer, message, .. } => match message {
            request_response::Message::Request {
                request, channel, ..
            } => {
                trace!("Received block request for {} from {peer}", request.cid);
                let store = store.clone();
                let response_tx = response_tx.clone();
                tokio::task::spawn(async move {
                    let response = make_block_exchange_response(store.as_ref(), &request);
                    if let Err(e) = response_tx.send_async((channel, response)).await {
                        warn!("Failed to queue block exchange response: {e}");
                    }
                });
            }
            request_response::Message::Response {
                request_id,
                response,
            } => {
                if let Some(tx) = request_table.remove(&request_id) {
                    if tx.send(Ok(response)).is_err() {
                        debug!("Block exchange response receiver dropped");
                    }
                } else {
                    warn!("Block exchange response failed: channel not found");
                }
            }
        },
        request_response::Event::OutboundFailure {
            peer,
            request_id,
            error,
            ..
        } => {
            debug!("Block exchange outbound error (peer: {peer}) (id: {request_id:?}): {error}");
            if let Some(tx) = request_table.remove(&request_id) {
                if tx.send(Err(error.into())).is_err() {
                    debug!("Block exchange response receiver dropped");
                }
            }
        }
        request_response::Event::InboundFailure { peer, error, .. } => {
            debug!("Block exchange inbound error (peer: {peer}): {error}");
        }
        request_response::Event::ResponseSent { .. } => (),
    }
}
