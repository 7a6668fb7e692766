//! # BlockCache
//!
//! Compõe o pool de slots, a tabela de buckets e a política de eviction.
//!
//! ## Protocolo do bget
//!
//! ```text
//! trava bucket(blockno) ──hit──▶ refcnt++, recency, solta bucket ──▶ sleep lock
//!        │
//!       miss
//!        ▼
//! solta bucket ──▶ scan (sem lock) ──▶ lock_pair(alvo, antigo) em ordem crescente
//!        ▲                                     │
//!        └──────── revalidação falhou ◀────────┤
//!                                              ▼
//!                  claim (refcnt 0→1), nova identidade, insere no alvo,
//!                  remove do antigo, solta os dois ──▶ sleep lock
//! ```
//!
//! Nenhum Spinlock de bucket é segurado enquanto se dorme no SleepLock do
//! slot.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};

use super::buf::LockedBuf;
use super::config::BcacheConfig;
use super::evict::{EvictionPolicy, LruTimestamp};
use super::slot::{BufferSlot, SlotFlags, SlotId};
use super::stats::{BcacheStats, Counters};
use super::table::BucketTable;
use crate::drivers::block::{BlockError, BlockTransfer};

/// Buffer cache de blocos.
pub struct BlockCache {
    config: BcacheConfig,
    slots: Box<[BufferSlot]>,
    table: BucketTable,
    policy: Box<dyn EvictionPolicy>,
    disk: Arc<dyn BlockTransfer>,
    /// Relógio lógico do recency
    clock: AtomicU64,
    counters: Counters,
}

impl BlockCache {
    /// Cria o cache com a política LRU por timestamp.
    ///
    /// # Panics
    /// Se a configuração for inválida.
    pub fn new(config: BcacheConfig, disk: Arc<dyn BlockTransfer>) -> Self {
        Self::with_policy(config, disk, Box::new(LruTimestamp))
    }

    /// Cria o cache com uma política de eviction própria.
    pub fn with_policy(
        config: BcacheConfig,
        disk: Arc<dyn BlockTransfer>,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        config.validate();

        let slots = (0..config.nbuf)
            .map(|_| BufferSlot::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let table = BucketTable::new(config);

        crate::kinfo!("(Bcache) Inicializado: nbuf=", config.nbuf as u64);
        crate::kinfo!("(Bcache) buckets=", config.nbuckets as u64);

        Self {
            config,
            slots,
            table,
            policy,
            disk,
            clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &BcacheConfig {
        &self.config
    }

    /// Slot do pool (diagnóstico).
    pub fn slot(&self, id: SlotId) -> &BufferSlot {
        &self.slots[id.index()]
    }

    /// Avança o relógio lógico. Cada valor é único e crescente.
    #[inline]
    pub(crate) fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    // =========================================================================
    // ACQUIRE / READ
    // =========================================================================

    /// Retorna o buffer de `(dev, blockno)` travado, com refcnt incrementado.
    ///
    /// O conteúdo pode não ser válido; use `read` para garantir.
    ///
    /// # Panics
    /// Se o bloco está fora da geometria ou não há buffer livre.
    pub fn acquire(&self, dev: u32, blockno: u32) -> LockedBuf<'_> {
        if !self.config.contains(dev, blockno) {
            crate::kerror!("(Bcache) bget: bloco fora da geometria, blockno=", blockno);
            panic!("bget: block out of range");
        }

        let id = self.bget(dev, blockno);
        let guard = self.slots[id.index()].data.lock();
        LockedBuf::new(self, id, dev, blockno, guard)
    }

    /// Acha ou reaproveita o slot e retorna com refcnt já contado.
    fn bget(&self, dev: u32, blockno: u32) -> SlotId {
        let bucket = self.config.bucket_of(blockno);
        let cell = self.config.cell_of(dev, blockno);

        loop {
            {
                let shard = self.table.lock(bucket);
                if let Some(id) = shard.lookup(cell) {
                    let slot = &self.slots[id.index()];
                    slot.add_ref();
                    slot.stamp(self.tick());
                    drop(shard);
                    self.counters.hit();
                    return id;
                }
            }

            let victim = match self.policy.select_victim(&self.slots) {
                Some(id) => id,
                None => {
                    crate::kerror!("(Bcache) bget: todos os buffers em uso, nbuf=", self.slots.len());
                    panic!("bget: no buffers");
                }
            };
            let slot = &self.slots[victim.index()];
            let old = slot.key();
            let old_bucket = old.map(|(_, b)| self.config.bucket_of(b));

            let mut pair = self.table.lock_pair(bucket, old_bucket);

            // Outro bget instalou o bloco enquanto o bucket estava solto
            if pair.target().lookup(cell).is_some() {
                continue;
            }
            // Vítima ganhou referência ou mudou de identidade desde o scan
            if !self.claim_victim(slot, old) {
                continue;
            }

            slot.set_key(dev, blockno);
            slot.reset_flags();
            slot.stamp(self.tick());

            if let Some((odev, oblock)) = old {
                let old_cell = self.config.cell_of(odev, oblock);
                if !pair.old().remove(old_cell, victim) {
                    crate::kerror!("(Bcache) bget: vítima sem mapeamento, slot=", victim.index());
                    panic!("bcache: invariant violated (victim not mapped)");
                }
                crate::ktrace!("(Bcache) eviction: bloco antigo=", oblock);
            }
            pair.target().insert(cell, victim);
            drop(pair);

            crate::ktrace!("(Bcache) bget miss: slot=", victim.index());
            self.counters.miss(old.is_some());
            return victim;
        }
    }

    /// Reivindica a vítima se ela ainda tem a identidade `old` vista no scan.
    ///
    /// A identidade só muda depois de um claim, então o claim vem primeiro:
    /// com refcnt em 1 a identidade fica congelada e pode ser comparada.
    /// Um slot nunca usado não tem bucket antigo travado pelo chamador.
    pub(crate) fn claim_victim(&self, slot: &BufferSlot, old: Option<(u32, u32)>) -> bool {
        if !slot.claim() {
            return false;
        }
        if slot.key() != old {
            // Volta para 0 sem stamp: o recency é o do dono anterior
            slot.drop_ref();
            return false;
        }
        true
    }

    /// Retorna o buffer travado com o conteúdo do disco.
    ///
    /// Em falha do disco o buffer é liberado antes de retornar o erro.
    pub fn read(&self, dev: u32, blockno: u32) -> Result<LockedBuf<'_>, BlockError> {
        let mut buf = self.acquire(dev, blockno);
        if !buf.is_valid() {
            self.transfer(&mut buf, false)?;
            buf.slot().set_flags(SlotFlags::VALID);
            self.counters.disk_read();
        }
        Ok(buf)
    }

    // =========================================================================
    // WRITE BACK / RELEASE
    // =========================================================================

    /// Grava o conteúdo do buffer no disco. Não solta o lock.
    ///
    /// # Panics
    /// Se o buffer não é deste cache ou a thread atual não segura o lock.
    pub fn write_back(&self, buf: &mut LockedBuf<'_>) -> Result<(), BlockError> {
        self.check_owner(buf, "bwrite: buffer not locked");

        self.transfer(buf, true)?;
        buf.slot().clear_flags(SlotFlags::DIRTY);
        self.counters.disk_write();
        Ok(())
    }

    /// Solta o lock e a referência do buffer.
    ///
    /// # Panics
    /// Se o buffer não é deste cache ou a thread atual não segura o lock.
    pub fn release(&self, buf: LockedBuf<'_>) {
        self.check_owner(&buf, "brelse: buffer not locked");
        drop(buf);
    }

    /// Decrementa o refcnt sob o lock do bucket. Chamado pelo Drop do
    /// LockedBuf, depois de soltar o SleepLock.
    pub(crate) fn unref(&self, id: SlotId, blockno: u32) {
        let slot = &self.slots[id.index()];
        let _shard = self.table.lock(self.config.bucket_of(blockno));

        match slot.drop_ref() {
            Some(0) => slot.stamp(self.tick()),
            Some(_) => {}
            None => {
                crate::kerror!("(Bcache) brelse: refcnt já era zero, slot=", id.index());
                panic!("brelse: reference count underflow");
            }
        }
    }

    // =========================================================================
    // PIN / UNPIN
    // =========================================================================

    /// Segura uma referência extra sem o lock do buffer, mantendo o bloco
    /// residente até o `unpin`.
    pub fn pin(&self, buf: &LockedBuf<'_>) {
        self.check_owner(buf, "bpin: buffer not locked");

        let slot = buf.slot();
        let _shard = self.table.lock(self.config.bucket_of(buf.blockno()));
        slot.add_ref();
        slot.add_pin();
    }

    /// Solta uma referência tomada por `pin`.
    ///
    /// # Panics
    /// Se o bloco não tem pin.
    pub fn unpin(&self, buf: &LockedBuf<'_>) {
        self.check_owner(buf, "bunpin: buffer not locked");

        let slot = buf.slot();
        let _shard = self.table.lock(self.config.bucket_of(buf.blockno()));
        if !slot.drop_pin() {
            crate::kerror!("(Bcache) bunpin: bloco sem pin, blockno=", buf.blockno());
            panic!("bunpin: block not pinned");
        }
        match slot.drop_ref() {
            Some(0) => slot.stamp(self.tick()),
            Some(_) => {}
            None => {
                crate::kerror!("(Bcache) bunpin: refcnt já era zero, slot=", buf.slot_id().index());
                panic!("bunpin: reference count underflow");
            }
        }
    }

    // =========================================================================
    // DIAGNÓSTICO
    // =========================================================================

    pub fn stats(&self) -> BcacheStats {
        self.counters.snapshot()
    }

    /// O bloco está mapeado na tabela? Não toca em refcnt nem no slot.
    pub fn is_cached(&self, dev: u32, blockno: u32) -> bool {
        self.config.contains(dev, blockno) && self.table.lookup(dev, blockno).is_some()
    }

    /// Verifica a coerência entre tabela e pool com todos os buckets
    /// travados.
    ///
    /// # Panics
    /// Na primeira violação encontrada.
    pub fn check_invariants(&self) {
        let shards = self.table.lock_all();
        let mut mapped = vec![false; self.slots.len()];

        for (bucket, shard) in shards.iter().enumerate() {
            if shard.iter().count() != shard.len() {
                crate::kerror!("(Bcache) invariant: contador de células errado, bucket=", bucket);
                panic!("bcache: invariant violated (shard cell count)");
            }
            for (cell, id) in shard.iter() {
                let slot = &self.slots[id.index()];
                let coherent = match slot.key() {
                    Some((dev, blockno)) => {
                        self.config.bucket_of(blockno) == bucket
                            && self.config.cell_of(dev, blockno) == cell
                    }
                    None => false,
                };
                if !coherent {
                    crate::kerror!("(Bcache) invariant: célula aponta para slot errado, slot=", id.index());
                    panic!("bcache: invariant violated (cell/slot identity mismatch)");
                }
                if mapped[id.index()] {
                    crate::kerror!("(Bcache) invariant: slot mapeado duas vezes, slot=", id.index());
                    panic!("bcache: invariant violated (slot mapped twice)");
                }
                mapped[id.index()] = true;
            }
        }

        for (index, slot) in self.slots.iter().enumerate() {
            if slot.key().is_some() != mapped[index] {
                crate::kerror!("(Bcache) invariant: slot com identidade fora da tabela, slot=", index);
                panic!("bcache: invariant violated (slot identity not mapped)");
            }
            if slot.pin_count() > slot.ref_count() {
                crate::kerror!("(Bcache) invariant: pins acima do refcnt, slot=", index);
                panic!("bcache: invariant violated (pins above reference count)");
            }
        }
    }

    // =========================================================================
    // INTERNOS
    // =========================================================================

    fn check_owner(&self, buf: &LockedBuf<'_>, msg: &'static str) {
        if !ptr::eq(buf.cache(), self) {
            crate::kerror!("(Bcache) buffer de outro cache, slot=", buf.slot_id().index());
            panic!("{}", msg);
        }
        if !buf.holding() {
            crate::kerror!("(Bcache) lock do buffer não pertence à thread, slot=", buf.slot_id().index());
            panic!("{}", msg);
        }
    }

    fn transfer(&self, buf: &mut LockedBuf<'_>, write: bool) -> Result<(), BlockError> {
        crate::ktrace!("(Bcache) transfer: blockno=", buf.blockno());
        let (dev, blockno) = (buf.dev(), buf.blockno());
        self.disk
            .transfer(dev, blockno, buf.raw_mut(), write)
            .map_err(|err| {
                crate::kwarn!("(Bcache) falha no disco, blockno=", blockno);
                err
            })
    }
}
