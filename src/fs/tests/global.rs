//! Testes da facade global
//!
//! O cache global é único no processo: todo o uso dele fica neste teste.

#![cfg(test)]

use std::panic::{self, AssertUnwindSafe};

use super::{create_test_disk, first_byte, TEST_DEV};
use crate::fs::bcache::{self, BcacheConfig};

#[test]
fn test_global_facade() {
    let (disk, table) = create_test_disk(64);
    let cache = bcache::binit(BcacheConfig::with_nbuf(8), table.clone());
    assert_eq!(cache.config().nbuf, 8);

    let mut buf = bcache::bread(TEST_DEV, 12).unwrap();
    buf.data_mut()[0] = 0x33;
    bcache::bwrite(&mut buf).unwrap();
    bcache::bpin(&buf);
    bcache::brelse(buf);
    assert_eq!(first_byte(&disk, 12), 0x33);

    let buf = bcache::bread(TEST_DEV, 12).unwrap();
    assert_eq!(buf.data()[0], 0x33);
    assert_eq!(buf.ref_count(), 2);
    bcache::bunpin(&buf);
    bcache::brelse(buf);

    let stats = bcache::stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.disk_reads, 1);
    assert_eq!(stats.disk_writes, 1);

    let again = panic::catch_unwind(AssertUnwindSafe(|| {
        bcache::binit(BcacheConfig::default(), table.clone());
    }));
    assert!(again.is_err());
    assert!(core::ptr::eq(bcache::global(), cache));
    cache.check_invariants();
}
