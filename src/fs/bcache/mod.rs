//! # Buffer Cache
//!
//! Cache de blocos de disco com pool fixo de buffers.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ BucketTable  [Spinlock<Shard>; nbuckets]   │
//! │   bucket = blockno % nbuckets              │
//! │   célula → SlotId                          │
//! └────────────────────────────────────────────┘
//!                     ↓ SlotId
//! ┌────────────────────────────────────────────┐
//! │ BufferPool   [BufferSlot; nbuf]            │
//! │   identidade, refcnt, pins, recency, flags │
//! │   SleepLock<BlockData>                     │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Uso
//!
//! ```text
//! let mut buf = bread(dev, blockno)?;   // travado e válido
//! buf.data_mut()[0] = 1;
//! bwrite(&mut buf)?;                    // grava, continua travado
//! brelse(buf);                          // ou só deixar sair do escopo
//! ```
//!
//! ## Regras
//!
//! - Um bloco tem no máximo um slot no pool
//! - Slot com refcnt > 0 nunca é reaproveitado (pins contam no refcnt)
//! - Pool esgotado e quebra de contrato são fatais (panic)
//! - Só a falha do disco volta como `BlockError`

pub mod buf;
pub mod cache;
pub mod config;
pub mod evict;
pub mod slot;
pub mod stats;
pub mod table;

#[cfg(feature = "self_test")]
pub mod test;

pub use buf::LockedBuf;
pub use cache::BlockCache;
pub use config::{BcacheConfig, BSIZE, FSSIZE, MAXOPBLOCKS, NBUCKETS, NBUF, NDEV};
pub use evict::{EvictionPolicy, LruTimestamp};
pub use slot::{BufferSlot, SlotFlags, SlotId};
pub use stats::BcacheStats;

use alloc::sync::Arc;
use spin::Once;

use crate::drivers::block::{BlockError, BlockTransfer};

// =============================================================================
// CACHE GLOBAL
// =============================================================================

static BCACHE: Once<BlockCache> = Once::new();

/// Cria o cache global.
///
/// # Panics
/// Se chamado mais de uma vez.
pub fn binit(config: BcacheConfig, disk: Arc<dyn BlockTransfer>) -> &'static BlockCache {
    let mut fresh = false;
    let cache = BCACHE.call_once(|| {
        fresh = true;
        BlockCache::new(config, disk)
    });
    if !fresh {
        crate::kerror!("(Bcache) binit: cache já inicializado");
        panic!("binit: already initialized");
    }
    cache
}

/// Cache global, se já inicializado.
pub fn try_cache() -> Option<&'static BlockCache> {
    BCACHE.get()
}

/// Cache global.
///
/// # Panics
/// Se `binit` ainda não foi chamado.
pub fn global() -> &'static BlockCache {
    match BCACHE.get() {
        Some(cache) => cache,
        None => {
            crate::kerror!("(Bcache) cache usado antes do binit");
            panic!("bcache: not initialized");
        }
    }
}

pub fn bread(dev: u32, blockno: u32) -> Result<LockedBuf<'static>, BlockError> {
    global().read(dev, blockno)
}

pub fn bwrite(buf: &mut LockedBuf<'static>) -> Result<(), BlockError> {
    global().write_back(buf)
}

pub fn brelse(buf: LockedBuf<'static>) {
    global().release(buf)
}

pub fn bpin(buf: &LockedBuf<'static>) {
    global().pin(buf)
}

pub fn bunpin(buf: &LockedBuf<'static>) {
    global().unpin(buf)
}

pub fn stats() -> BcacheStats {
    try_cache().map(BlockCache::stats).unwrap_or_default()
}
