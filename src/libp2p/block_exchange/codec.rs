// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;

use async_trait::async_trait;
use futures::prelude::*;
use libp2p::{StreamProtocol, request_response};

use super::{BlockExchangeRequest, BlockExchangeResponse};

/// Upper bound on a response payload. Leaf blocks are capped by the chunker;
/// manifest blocks scale with the child count, so allow generous headroom.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

// Textual CIDs are short; anything bigger than this is not a CID.
const MAX_REQUEST_SIZE: u64 = 256;

const STATUS_OK: u8 = 0x00;
const STATUS_NOT_FOUND: u8 = 0x01;
const STATUS_BAD_CID: u8 = 0x02;
const STATUS_STORAGE_ERROR: u8 = 0x03;

/// Wire codec for the block exchange protocol.
///
/// Request: the UTF-8 bytes of a textual CID; the request-response handler
/// half-closes the write side once `write_request` returns, which marks the
/// end of the request. Response: one status byte, followed for
/// `STATUS_OK` by an unsigned-varint length and the block payload.
#[derive(Debug, Clone, Default)]
pub struct BlockExchangeCodec;

#[async_trait]
impl request_response::Codec for BlockExchangeCodec {
    type Protocol = StreamProtocol;
    type Request = BlockExchangeRequest;
    type Response = BlockExchangeResponse;

    async fn read_request<T>(&mut self, _: &Self::Protocol, io: &mut T) -> io::Result<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        let mut cid = String::new();
        (&mut *io)
            .take(MAX_REQUEST_SIZE)
            .read_to_string(&mut cid)
            .await?;
        Ok(BlockExchangeRequest { cid })
    }

    async fn read_response<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
    ) -> io::Result<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        let mut status = [0; 1];
        io.read_exact(&mut status).await?;
        match status[0] {
            STATUS_OK => {
                let len = unsigned_varint::aio::read_usize(&mut *io)
                    .await
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                if len > MAX_PAYLOAD_SIZE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("block of {len} bytes exceeds the payload limit"),
                    ));
                }
                let mut data = vec![0; len];
                io.read_exact(&mut data).await?;
                Ok(BlockExchangeResponse::Block(data))
            }
            STATUS_NOT_FOUND => Ok(BlockExchangeResponse::NotFound),
            STATUS_BAD_CID => Ok(BlockExchangeResponse::BadCid),
            STATUS_STORAGE_ERROR => Ok(BlockExchangeResponse::StorageError),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown block exchange status {other:#04x}"),
            )),
        }
    }

    async fn write_request<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        req: Self::Request,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        io.write_all(req.cid.as_bytes()).await
    }

    async fn write_response<T>(
        &mut self,
        _: &Self::Protocol,
        io: &mut T,
        res: Self::Response,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        match res {
            BlockExchangeResponse::Block(data) => {
                io.write_all(&[STATUS_OK]).await?;
                let mut len_buf = unsigned_varint::encode::usize_buffer();
                io.write_all(unsigned_varint::encode::usize(data.len(), &mut len_buf))
                    .await?;
                io.write_all(&data).await
            }
            BlockExchangeResponse::NotFound => io.write_all(&[STATUS_NOT_FOUND]).await,
            BlockExchangeResponse::BadCid => io.write_all(&[STATUS_BAD_CID]).await,
            BlockExchangeResponse::StorageError => io.write_all(&[STATUS_STORAGE_ERROR]).await,
        }
    }
}
