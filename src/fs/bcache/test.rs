//! Self tests do Buffer Cache

use alloc::sync::Arc;

use super::{BcacheConfig, BlockCache};
use crate::drivers::block::{BlockDevice, DeviceTable, RamDisk};
use crate::klib::test_framework::{run_test_suite, SuiteReport, TestCase, TestResult};

/// Casos de teste do bcache
const BCACHE_TESTS: &[TestCase] = &[
    TestCase::new("bcache_hit_after_release", test_hit_after_release),
    TestCase::new("bcache_lru_victim", test_lru_victim),
    TestCase::new("bcache_write_back", test_write_back),
    TestCase::new("bcache_pin_keeps_block", test_pin_keeps_block),
    TestCase::new("bcache_cross_device", test_cross_device),
];

/// Executa todos os testes do bcache
pub fn run_bcache_tests() -> SuiteReport {
    run_test_suite("Buffer Cache", BCACHE_TESTS)
}

/// Cache privado de `nbuf` buffers sobre um ramdisk no dispositivo 1
fn setup(nbuf: usize) -> Option<(BlockCache, Arc<RamDisk>)> {
    let disk = Arc::new(RamDisk::new(512, 256));
    let table = DeviceTable::new(super::NDEV);
    if let Err(err) = table.register(1, disk.clone() as Arc<dyn BlockDevice>) {
        crate::kerror!("(Bcache) setup: ramdisk recusado pelo registro");
        crate::kerror!(err.as_str());
        return None;
    }
    Some((BlockCache::new(BcacheConfig::with_nbuf(nbuf), Arc::new(table)), disk))
}

fn test_hit_after_release() -> TestResult {
    let Some((cache, disk)) = setup(4) else {
        return TestResult::Fail;
    };

    match cache.read(1, 7) {
        Ok(buf) => cache.release(buf),
        Err(_) => return TestResult::Fail,
    }
    let reads = disk.reads();
    match cache.read(1, 7) {
        Ok(buf) => cache.release(buf),
        Err(_) => return TestResult::Fail,
    }

    if disk.reads() != reads || cache.stats().hits != 1 {
        crate::kerror!("(Bcache) Hit foi ao disco, leituras=", disk.reads());
        return TestResult::Fail;
    }
    TestResult::Pass
}

fn test_lru_victim() -> TestResult {
    let Some((cache, _disk)) = setup(4) else {
        return TestResult::Fail;
    };

    for blockno in 1..=5 {
        match cache.read(1, blockno) {
            Ok(buf) => drop(buf),
            Err(_) => return TestResult::Fail,
        }
    }

    if cache.is_cached(1, 1) || !cache.is_cached(1, 5) {
        crate::kerror!("(Bcache) Vítima errada no LRU");
        return TestResult::Fail;
    }
    TestResult::Pass
}

fn test_write_back() -> TestResult {
    let Some((cache, disk)) = setup(4) else {
        return TestResult::Fail;
    };

    let mut buf = match cache.read(1, 3) {
        Ok(buf) => buf,
        Err(_) => return TestResult::Fail,
    };
    buf.data_mut()[0] = 0xAB;
    if cache.write_back(&mut buf).is_err() || buf.is_dirty() {
        return TestResult::Fail;
    }
    drop(buf);

    // Bloco 3 = setores 6 e 7
    let mut sector = [0u8; 512];
    disk.peek(6, &mut sector);
    if sector[0] != 0xAB {
        crate::kerror!("(Bcache) write_back não chegou ao disco, byte=", sector[0]);
        return TestResult::Fail;
    }
    TestResult::Pass
}

fn test_pin_keeps_block() -> TestResult {
    let Some((cache, _disk)) = setup(2) else {
        return TestResult::Fail;
    };

    let buf = match cache.read(1, 10) {
        Ok(buf) => buf,
        Err(_) => return TestResult::Fail,
    };
    cache.pin(&buf);
    drop(buf);

    for blockno in 20..24 {
        match cache.read(1, blockno) {
            Ok(buf) => drop(buf),
            Err(_) => return TestResult::Fail,
        }
    }
    if !cache.is_cached(1, 10) {
        crate::kerror!("(Bcache) Bloco com pin foi reaproveitado");
        return TestResult::Fail;
    }

    let buf = cache.acquire(1, 10);
    cache.unpin(&buf);
    let pins = buf.pin_count();
    drop(buf);
    if pins != 0 {
        return TestResult::Fail;
    }
    TestResult::Pass
}

fn test_cross_device() -> TestResult {
    let Some((cache, _disk)) = setup(4) else {
        return TestResult::Fail;
    };

    // Mesmo blockno em outro dispositivo é outro bloco
    let a = cache.acquire(1, 5);
    let b = cache.acquire(2, 5);
    let distinct = a.slot_id() != b.slot_id();
    drop(a);
    drop(b);

    if !distinct {
        crate::kerror!("(Bcache) Dispositivos diferentes no mesmo slot");
        return TestResult::Fail;
    }
    cache.check_invariants();
    TestResult::Pass
}
