// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use quick_protobuf::sizeofs::sizeof_len;
use quick_protobuf::{BytesReader, MessageRead, MessageWrite, Writer, WriterBackend};

/// Ordered list of the child block CIDs (textual form) that reassemble a
/// file. The manifest is serialized and stored as a block of its own; the CID
/// of that block is the public name of the file.
///
/// Wire format: a length-prefixed protobuf message with a single repeated
/// string field (tag 1). The length prefix keeps the zero-child manifest at a
/// nonzero byte encoding, so the empty file has a well-defined root CID.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub block_cids: Vec<String>,
}

impl Manifest {
    pub fn new(block_cids: Vec<String>) -> Self {
        Self { block_cids }
    }

    /// Deterministic encoding: equal child sequences produce equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, quick_protobuf::Error> {
        quick_protobuf::serialize_into_vec(self)
    }

    /// Decodes a manifest, skipping fields of unknown tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, quick_protobuf::Error> {
        quick_protobuf::deserialize_from_slice(bytes)
    }

    /// Decodes a manifest, rejecting fields of unknown tag.
    pub fn from_bytes_strict(bytes: &[u8]) -> Result<Self, quick_protobuf::Error> {
        let mut outer = BytesReader::from_bytes(bytes);
        let payload = outer.read_bytes(bytes)?;
        let mut r = BytesReader::from_bytes(payload);
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(payload)? {
                10 => msg.block_cids.push(r.read_string(payload)?.to_owned()),
                tag => {
                    return Err(quick_protobuf::Error::Message(format!(
                        "unexpected field tag {tag} in manifest"
                    )));
                }
            }
        }
        Ok(msg)
    }
}

impl<'a> MessageRead<'a> for Manifest {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes) {
                Ok(10) => msg.block_cids.push(r.read_string(bytes)?.to_owned()),
                Ok(t) => {
                    r.read_unknown(bytes, t)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(msg)
    }
}

impl MessageWrite for Manifest {
    fn get_size(&self) -> usize {
        self.block_cids
            .iter()
            .map(|s| 1 + sizeof_len(s.len()))
            .sum()
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        for s in &self.block_cids {
            w.write_with_tag(10, |w| w.write_string(s))?;
        }
        Ok(())
    }
}
