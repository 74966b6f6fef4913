// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of a leaf block. Files are split at this boundary.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Splits a byte stream into fixed-size blocks, in stream order. Every block
/// except possibly the last holds exactly [`CHUNK_SIZE`] bytes; the last one
/// is sized to the bytes actually read, never padded.
pub struct Chunker<R> {
    reader: R,
}

impl<R> Chunker<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next block off the underlying stream. Returns `None` once
    /// the stream is exhausted; an empty stream yields no blocks at all.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0; CHUNK_SIZE];
        let mut filled = 0;
        while filled < CHUNK_SIZE {
            let read = self.reader.read(&mut buf[filled..]).await?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}
