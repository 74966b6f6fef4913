// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use parity_db::{CompressionType, Db, Options};

use super::{Store, errors::Error, parity_db_config::ParityDbConfig};

/// Single-column parity-db store holding content-addressed blocks. The
/// database directory is exclusively locked by the running process.
#[derive(Clone)]
pub struct ParityDb {
    pub db: Arc<Db>,
}

impl ParityDb {
    fn to_options(path: PathBuf, config: &ParityDbConfig) -> anyhow::Result<Options> {
        let mut opts = Options::with_columns(&path, 1);
        opts.sync_wal = true;
        opts.sync_data = true;
        opts.stats = config.enable_statistics;
        opts.columns[0].compression = compression_type_from_str(&config.compression_type)?;
        Ok(opts)
    }

    pub fn open(path: impl Into<PathBuf>, config: &ParityDbConfig) -> anyhow::Result<Self> {
        let opts = Self::to_options(path.into(), config)?;
        let db = Db::open_or_create(&opts).context("Error opening block store database")?;
        Ok(Self { db: Arc::new(db) })
    }
}

fn compression_type_from_str(s: &str) -> anyhow::Result<CompressionType> {
    match s.to_lowercase().as_str() {
        "none" => Ok(CompressionType::NoCompression),
        "lz4" => Ok(CompressionType::Lz4),
        "snappy" => Ok(CompressionType::Snappy),
        _ => anyhow::bail!("invalid compression option: {s}"),
    }
}

impl Store for ParityDb {
    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>,
    {
        self.db.get(0, key.as_ref()).map_err(Error::from)
    }

    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let tx = [(0, key.as_ref(), Some(value.as_ref().to_owned()))];
        self.db.commit(tx).map_err(Error::from)
    }

    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
    {
        let tx = [(0, key.as_ref(), None)];
        self.db.commit(tx).map_err(Error::from)
    }

    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
    {
        self.db
            .get_size(0, key.as_ref())
            .map(|size| size.is_some())
            .map_err(Error::from)
    }

    fn bulk_write<K, V>(&self, values: &[(K, V)]) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let tx = values
            .iter()
            .map(|(k, v)| (0, k.as_ref(), Some(v.as_ref().to_owned())))
            .collect::<Vec<_>>();
        self.db.commit(tx).map_err(Error::from)
    }
}
