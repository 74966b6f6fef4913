// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::db::Blockstore;
use crate::node::{self, Node};

/// Response chunk size for file downloads.
const GET_CHUNK_SIZE: usize = 64 * 1024;

/// Body of a successful ingest call.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddFileResponse {
    pub root_cid: String,
}

/// Starts the HTTP interface of the node: streaming ingest and fetch.
pub async fn start_rpc<DB>(node: Arc<Node<DB>>, rpc_address: SocketAddr) -> anyhow::Result<()>
where
    DB: Blockstore + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(rpc_address).await?;
    info!("HTTP API listening on {rpc_address}");
    axum::serve(listener, router(node)).await?;
    Ok(())
}

fn router<DB>(node: Arc<Node<DB>>) -> Router
where
    DB: Blockstore + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v0/add", post(add_file::<DB>))
        .route("/api/v0/get/{cid}", get(get_file::<DB>))
        .with_state(node)
}

async fn add_file<DB>(State(node): State<Arc<Node<DB>>>, body: Body) -> Response
where
    DB: Blockstore + Send + Sync + 'static,
{
    let reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
    match node.add_file(reader, &CancellationToken::new()).await {
        Ok(root) => Json(AddFileResponse {
            root_cid: root.to_string(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_file<DB>(State(node): State<Arc<Node<DB>>>, Path(cid): Path<String>) -> Response
where
    DB: Blockstore + Send + Sync + 'static,
{
    match node.get_file(&cid, &CancellationToken::new()).await {
        Ok(reader) => Body::from_stream(ReaderStream::with_capacity(reader, GET_CHUNK_SIZE))
            .into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &node::Error) -> Response {
    let status = match e {
        node::Error::BadCid(_) | node::Error::BadManifest(_) => StatusCode::BAD_REQUEST,
        node::Error::NotFound(_)
        | node::Error::NoProviders(_)
        | node::Error::ChunkMissing { .. } => StatusCode::NOT_FOUND,
        node::Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}
