//! Forge Buffer Cache.
//!
//! Cache de blocos de disco do kernel Forge. Fica entre o filesystem e os
//! drivers de bloco: mantém cópias em memória dos blocos mais usados e serve
//! de ponto de sincronização para blocos acessados por várias CPUs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        FILESYSTEM / LOG (bread, bwrite, brelse)     │
//! └─────────────────────────────────────────────────────┘
//!                          ↓
//! ┌─────────────────────────────────────────────────────┐
//! │  fs::bcache  BucketTable + BufferPool + Eviction    │
//! │              Spinlock por bucket, SleepLock por buf │
//! └─────────────────────────────────────────────────────┘
//!                          ↓
//! ┌─────────────────────────────────────────────────────┐
//! │  drivers::block  BlockTransfer → BlockDevice        │
//! └─────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Habilitar alocação dinâmica (pool e shards são alocados uma vez no binit)
extern crate alloc;

// --- Infraestrutura ---
pub mod core; // Logging
pub mod drivers; // Serial (sink de log) e dispositivos de bloco
pub mod klib; // Framework de self test

// --- Primitivas ---
pub mod sched; // Hook do scheduler (tid, futex wait/wake)
pub mod sync; // Spinlock e SleepLock

// --- Subsistema ---
pub mod fs; // Buffer cache

pub use crate::drivers::block::{BlockDevice, BlockError, BlockTransfer, DeviceTable, RamDisk};
pub use crate::fs::bcache::{
    BcacheConfig, BcacheStats, BlockCache, EvictionPolicy, LockedBuf, LruTimestamp, SlotId, BSIZE,
};
