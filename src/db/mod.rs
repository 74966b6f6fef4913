// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod memory;
pub mod parity_db;
pub mod parity_db_config;

#[cfg(test)]
mod tests;

pub use errors::Error;
pub use memory::MemoryDB;

use cid::Cid;

use crate::utils::cid::CidExt;

/// Store interface used as a KV store implementation.
pub trait Store {
    /// Read a single value and return `None` if the key doesn't exist.
    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>;

    /// Write a single value to the data store.
    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>;

    /// Delete the value at `key`.
    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>;

    /// Returns `Ok(true)` if the key exists in the store.
    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>;

    /// Write a slice of KV pairs to the data store.
    fn bulk_write<K, V>(&self, values: &[(K, V)]) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        values
            .iter()
            .try_for_each(|(key, value)| self.write(key, value))
    }
}

impl<BS: Store> Store for &BS {
    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>,
    {
        (*self).read(key)
    }

    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        (*self).write(key, value)
    }

    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
    {
        (*self).delete(key)
    }

    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
    {
        (*self).exists(key)
    }

    fn bulk_write<K, V>(&self, values: &[(K, V)]) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        (*self).bulk_write(values)
    }
}

/// Content-addressed view over a [`Store`]. Blocks are keyed by the binary
/// form of their CID; the CID is derived from the block bytes, so writing the
/// same bytes twice lands on the same key.
pub trait Blockstore: Store {
    /// Computes the CID of `data` and persists the block under it in a single
    /// commit. Idempotent.
    fn put_block(&self, data: &[u8]) -> Result<Cid, Error> {
        let cid = Cid::from_raw_sha256(data);
        self.write(cid.to_bytes(), data)?;
        Ok(cid)
    }

    /// Returns an owned copy of the block, or `None` if it is absent.
    fn get_block(&self, cid: &Cid) -> Result<Option<Vec<u8>>, Error> {
        self.read(cid.to_bytes())
    }

    /// Existence probe that does not materialize the value.
    fn has_block(&self, cid: &Cid) -> Result<bool, Error> {
        self.exists(cid.to_bytes())
    }
}

impl<BS: Store> Blockstore for BS {}
