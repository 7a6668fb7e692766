//! Estatísticas do buffer cache.

use core::sync::atomic::{AtomicU64, Ordering};

/// Snapshot dos contadores do cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BcacheStats {
    /// bget que encontrou o bloco no cache
    pub hits: u64,
    /// bget que precisou reaproveitar um slot
    pub misses: u64,
    /// Slots que trocaram de identidade (um slot vazio não conta)
    pub evictions: u64,
    /// Leituras do disco
    pub disk_reads: u64,
    /// Escritas no disco
    pub disk_writes: u64,
}

/// Contadores vivos. Incrementos Relaxed: são só diagnóstico.
#[derive(Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self, evicted: bool) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn disk_read(&self) {
        self.disk_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn disk_write(&self) {
        self.disk_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BcacheStats {
        BcacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            disk_reads: self.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.disk_writes.load(Ordering::Relaxed),
        }
    }
}
