// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use crate::db::{Blockstore, Store};
use crate::utils::cid::CidExt;

pub fn write<DB>(db: &DB)
where
    DB: Store,
{
    let key = [1];
    let value = [1];
    db.write(key, value).unwrap();
}

pub fn read<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.read(key).unwrap().unwrap();
    assert_eq!(value.as_ref(), res.as_slice());
}

pub fn exists<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.exists(key).unwrap();
    assert!(res);
}

pub fn does_not_exist<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    assert!(!db.exists(key).unwrap());
    assert!(db.read(key).unwrap().is_none());
}

pub fn delete<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    assert!(db.exists(key).unwrap());
    db.delete(key).unwrap();
    assert!(!db.exists(key).unwrap());
}

pub fn bulk_write<DB>(db: &DB)
where
    DB: Store,
{
    let values = [([0], [0]), ([1], [1]), ([2], [2])];
    db.bulk_write(&values).unwrap();
    for (k, _) in values.iter() {
        let res = db.exists(*k).unwrap();
        assert!(res);
    }
}

pub fn block_round_trip<DB>(db: &DB)
where
    DB: Blockstore,
{
    let data = b"Hello World Buddy!!!";
    let cid = db.put_block(data).unwrap();
    assert_eq!(cid, Cid::from_raw_sha256(data));
    assert!(db.has_block(&cid).unwrap());
    let res = db.get_block(&cid).unwrap().unwrap();
    assert_eq!(res.as_slice(), data.as_ref());
}

pub fn block_put_is_idempotent<DB>(db: &DB)
where
    DB: Blockstore,
{
    let data = [0xAA; 1024];
    let first = db.put_block(&data).unwrap();
    let second = db.put_block(&data).unwrap();
    assert_eq!(first, second);
    assert_eq!(db.get_block(&first).unwrap().unwrap(), data.to_vec());
}

pub fn absent_block<DB>(db: &DB)
where
    DB: Blockstore,
{
    let cid = Cid::from_raw_sha256(b"was never written");
    assert!(!db.has_block(&cid).unwrap());
    assert!(db.get_block(&cid).unwrap().is_none());
}
