//! Testes do buffer cache
//!
//! # Como Executar os Testes
//!
//! ```bash
//! # Todos os testes do cache
//! cargo test --lib fs::tests
//!
//! # Um módulo específico
//! cargo test --lib fs::tests::concurrency
//! ```
//!
//! # Estrutura dos Testes
//!
//! - `bcache.rs` - Hit/miss, LRU, write back, pin, erros fatais
//! - `concurrency.rs` - Várias threads sobre o mesmo cache
//! - `global.rs` - Facade global (binit/bread/brelse)
//!
//! # Convenções
//!
//! - Prefixo `test_` para testes unitários
//! - Use `#[should_panic]` para caminhos fatais

#![cfg(test)]

pub mod bcache;
pub mod global;

use alloc::sync::Arc;

use crate::drivers::block::{BlockDevice, DeviceTable, RamDisk};
use crate::fs::bcache::{BcacheConfig, BlockCache, BSIZE, NDEV};

/// Dispositivo onde o ramdisk de teste fica registrado
pub const TEST_DEV: u32 = 1;

/// Tamanho de setor do ramdisk de teste
pub const SECTOR: usize = 512;

/// Setores por bloco do cache
pub const SECTORS_PER_BLOCK: u64 = (BSIZE / SECTOR) as u64;

/// Helper: ramdisk de `blocks` blocos do cache, registrado em `TEST_DEV`
pub fn create_test_disk(blocks: u64) -> (Arc<RamDisk>, Arc<DeviceTable>) {
    let disk = Arc::new(RamDisk::new(SECTOR, blocks * SECTORS_PER_BLOCK));
    let table = Arc::new(DeviceTable::new(NDEV));
    table
        .register(TEST_DEV, disk.clone() as Arc<dyn BlockDevice>)
        .expect("register test disk");
    (disk, table)
}

/// Helper: cache de `nbuf` buffers e 13 buckets sobre um ramdisk novo
pub fn create_test_cache(nbuf: usize) -> (BlockCache, Arc<RamDisk>) {
    let (disk, table) = create_test_disk(256);
    (BlockCache::new(BcacheConfig::with_nbuf(nbuf), table), disk)
}

/// Helper: grava `byte` em todo o bloco `blockno` direto no ramdisk
pub fn fill_block(disk: &RamDisk, blockno: u32, byte: u8) {
    let sector = [byte; SECTOR];
    for i in 0..SECTORS_PER_BLOCK {
        disk.poke(blockno as u64 * SECTORS_PER_BLOCK + i, &sector);
    }
}

/// Helper: primeiro byte do bloco `blockno` lido direto do ramdisk
pub fn first_byte(disk: &RamDisk, blockno: u32) -> u8 {
    let mut sector = [0u8; SECTOR];
    disk.peek(blockno as u64 * SECTORS_PER_BLOCK, &mut sector);
    sector[0]
}
