//! # BucketTable
//!
//! Tabela de lookup `(dev, blockno) → SlotId` dividida em buckets.
//!
//! - Bucket de um bloco: `blockno % nbuckets`
//! - Célula dentro do bucket: `dev * (fs_size / nbuckets + 1) + blockno / nbuckets`
//! - Cada bucket tem seu próprio Spinlock, segurado só durante a leitura ou
//!   mutação de células (O(1)). Nunca se dorme com um bucket travado.
//!
//! ## Ordem de Lock
//!
//! Uma eviction pode precisar de dois buckets (o do bloco novo e o do bloco
//! antigo do slot). Os dois são SEMPRE travados em ordem crescente de
//! índice, por `lock_pair`; é o único ponto do cache que trava mais de um
//! bucket, além de `lock_all` (também crescente).

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use super::config::BcacheConfig;
use super::slot::SlotId;
use crate::sync::{Spinlock, SpinlockGuard};

/// Um bucket: mapeamento limitado célula → slot.
pub struct Shard {
    cells: Box<[Option<SlotId>]>,
    used: usize,
}

impl Shard {
    fn new(cells: usize) -> Self {
        Self {
            cells: vec![None; cells].into_boxed_slice(),
            used: 0,
        }
    }

    /// Slot mapeado na célula.
    #[inline]
    pub fn lookup(&self, cell: usize) -> Option<SlotId> {
        self.cells[cell]
    }

    /// Mapeia a célula para `id`. A célula deve estar vazia.
    pub fn insert(&mut self, cell: usize, id: SlotId) {
        if let Some(current) = self.cells[cell] {
            crate::kerror!("(Bcache) insert: célula já ocupada pelo slot ", current.index());
            panic!("bcache: invariant violated (cell already mapped)");
        }
        self.cells[cell] = Some(id);
        self.used += 1;
    }

    /// Remove o mapeamento da célula, se ele apontar para `id`.
    pub fn remove(&mut self, cell: usize, id: SlotId) -> bool {
        if self.cells[cell] == Some(id) {
            self.cells[cell] = None;
            self.used -= 1;
            true
        } else {
            false
        }
    }

    /// Células ocupadas.
    pub(crate) fn len(&self) -> usize {
        self.used
    }

    /// Itera `(célula, slot)` das células ocupadas.
    pub fn iter(&self) -> impl Iterator<Item = (usize, SlotId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(cell, id)| id.map(|id| (cell, id)))
    }
}

/// Dois buckets travados na ordem global: o do bloco pedido e o do bloco
/// antigo do slot vítima (podem ser o mesmo).
pub struct BucketPair<'a> {
    target: SpinlockGuard<'a, Shard>,
    old: Option<SpinlockGuard<'a, Shard>>,
}

impl BucketPair<'_> {
    /// Bucket do bloco pedido.
    pub fn target(&mut self) -> &mut Shard {
        &mut *self.target
    }

    /// Bucket do bloco antigo (o próprio target se for o mesmo bucket).
    pub fn old(&mut self) -> &mut Shard {
        match self.old.as_mut() {
            Some(old) => &mut **old,
            None => &mut *self.target,
        }
    }
}

/// Array de buckets, cada um com seu Spinlock.
pub struct BucketTable {
    config: BcacheConfig,
    shards: Box<[Spinlock<Shard>]>,
}

impl BucketTable {
    pub fn new(config: BcacheConfig) -> Self {
        let cells = config.cells_per_bucket();
        let shards = (0..config.nbuckets)
            .map(|_| Spinlock::new("bcache.bucket", Shard::new(cells)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { config, shards }
    }

    /// Trava um bucket.
    #[inline]
    pub fn lock(&self, bucket: usize) -> SpinlockGuard<'_, Shard> {
        self.shards[bucket].lock()
    }

    /// Lookup isolado: trava o bucket, lê a célula e solta.
    pub fn lookup(&self, dev: u32, blockno: u32) -> Option<SlotId> {
        let cell = self.config.cell_of(dev, blockno);
        self.lock(self.config.bucket_of(blockno)).lookup(cell)
    }

    /// Trava o bucket `target` e, se diferente, o bucket `old`, sempre em
    /// ordem crescente de índice.
    pub fn lock_pair(&self, target: usize, old: Option<usize>) -> BucketPair<'_> {
        match old {
            Some(old) if old != target => {
                let (lo, hi) = if target < old { (target, old) } else { (old, target) };
                let first = self.shards[lo].lock();
                let second = self.shards[hi].lock();
                if target == lo {
                    BucketPair {
                        target: first,
                        old: Some(second),
                    }
                } else {
                    BucketPair {
                        target: second,
                        old: Some(first),
                    }
                }
            }
            _ => BucketPair {
                target: self.shards[target].lock(),
                old: None,
            },
        }
    }

    /// Trava todos os buckets em ordem crescente (auditoria).
    pub fn lock_all(&self) -> Vec<SpinlockGuard<'_, Shard>> {
        self.shards.iter().map(|shard| shard.lock()).collect()
    }
}
