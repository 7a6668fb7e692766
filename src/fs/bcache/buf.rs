//! # LockedBuf
//!
//! Handle de um buffer com o SleepLock do slot adquirido pela thread
//! atual. Enquanto o handle existe, a identidade do slot não muda.
//!
//! O Drop faz o `brelse`: solta o SleepLock e depois decrementa o refcnt sob
//! o lock do bucket. Por isso o buffer é liberado exatamente uma vez.

use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use super::cache::BlockCache;
use super::config::BSIZE;
use super::slot::{BlockData, BufferSlot, SlotFlags, SlotId};
use crate::sync::SleepLockGuard;

/// Buffer travado.
///
/// Não é `Send`: o SleepLock pertence à thread que o adquiriu.
pub struct LockedBuf<'a> {
    cache: &'a BlockCache,
    id: SlotId,
    dev: u32,
    blockno: u32,
    guard: ManuallyDrop<SleepLockGuard<'a, BlockData>>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> LockedBuf<'a> {
    pub(crate) fn new(
        cache: &'a BlockCache,
        id: SlotId,
        dev: u32,
        blockno: u32,
        guard: SleepLockGuard<'a, BlockData>,
    ) -> Self {
        Self {
            cache,
            id,
            dev,
            blockno,
            guard: ManuallyDrop::new(guard),
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn dev(&self) -> u32 {
        self.dev
    }

    #[inline]
    pub fn blockno(&self) -> u32 {
        self.blockno
    }

    #[inline]
    pub fn slot_id(&self) -> SlotId {
        self.id
    }

    /// Conteúdo do bloco.
    #[inline]
    pub fn data(&self) -> &[u8; BSIZE] {
        &self.guard.0
    }

    /// Conteúdo do bloco para escrita. Marca o buffer como DIRTY.
    pub fn data_mut(&mut self) -> &mut [u8; BSIZE] {
        self.slot().set_flags(SlotFlags::DIRTY);
        &mut self.guard.0
    }

    pub fn is_valid(&self) -> bool {
        self.slot().flags().contains(SlotFlags::VALID)
    }

    pub fn is_dirty(&self) -> bool {
        self.slot().flags().contains(SlotFlags::DIRTY)
    }

    /// Referências atuais (este handle incluso).
    pub fn ref_count(&self) -> u32 {
        self.slot().ref_count()
    }

    pub fn pin_count(&self) -> u32 {
        self.slot().pin_count()
    }

    pub(crate) fn cache(&self) -> &'a BlockCache {
        self.cache
    }

    pub(crate) fn slot(&self) -> &'a BufferSlot {
        self.cache.slot(self.id)
    }

    pub(crate) fn holding(&self) -> bool {
        self.guard.lock().holding()
    }

    /// Conteúdo sem marcar DIRTY (transferência do disco).
    pub(crate) fn raw_mut(&mut self) -> &mut [u8; BSIZE] {
        &mut self.guard.0
    }
}

impl Drop for LockedBuf<'_> {
    fn drop(&mut self) {
        if !self.holding() {
            crate::kerror!("(Bcache) brelse: lock do buffer não pertence à thread, slot=", self.id.index());
            panic!("brelse: buffer not locked");
        }

        // SAFETY: o guard não é usado depois daqui
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.cache.unref(self.id, self.blockno);
    }
}
