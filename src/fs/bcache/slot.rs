//! # BufferSlot
//!
//! Unidade fixa de armazenamento do cache. Os slots são criados no `binit`
//! e nunca destruídos; a eviction apenas troca a identidade
//! `(dev, blockno)` de um slot sem referências.
//!
//! ## Quem protege o quê
//!
//! | Campo     | Protegido por                                          |
//! |-----------|--------------------------------------------------------|
//! | `key`     | Lock do bucket antigo E do novo (só muda na eviction)  |
//! | `refcnt`  | Lock do bucket da identidade atual                     |
//! | `pins`    | Lock do bucket da identidade atual                     |
//! | `recency` | Lock do bucket da identidade atual                     |
//! | `flags`   | SleepLock do slot (ou refcnt 0→1 na eviction)          |
//! | `data`    | SleepLock do slot                                      |
//!
//! Os campos de metadados são atômicos para que o scan de eviction possa
//! lê-los sem lock; toda decisão tomada a partir dessa leitura é
//! revalidada com os locks certos.

use bitflags::bitflags;
use core::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use super::config::BSIZE;
use crate::sync::SleepLock;

/// Identidade vazia (slot nunca usado)
const NO_KEY: u64 = u64::MAX;

bitflags! {
    /// Estado do conteúdo de um slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// `data` reflete o conteúdo do disco
        const VALID = 1 << 0;
        /// `data` foi alterado desde o último write_back
        const DIRTY = 1 << 1;
    }
}

/// Índice de um slot no pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Posição no pool
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Conteúdo de um bloco.
#[repr(C, align(8))]
pub struct BlockData(pub [u8; BSIZE]);

impl BlockData {
    const fn new() -> Self {
        Self([0; BSIZE])
    }
}

#[inline]
const fn pack(dev: u32, blockno: u32) -> u64 {
    ((dev as u64) << 32) | blockno as u64
}

#[inline]
const fn unpack(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, key as u32)
}

/// Um buffer do pool.
pub struct BufferSlot {
    key: AtomicU64,
    refcnt: AtomicU32,
    pins: AtomicU32,
    recency: AtomicU64,
    flags: AtomicU8,
    pub(crate) data: SleepLock<BlockData>,
}

impl BufferSlot {
    /// Slot vazio: sem identidade, refcnt 0, inválido.
    pub fn new() -> Self {
        Self {
            key: AtomicU64::new(NO_KEY),
            refcnt: AtomicU32::new(0),
            pins: AtomicU32::new(0),
            recency: AtomicU64::new(0),
            flags: AtomicU8::new(0),
            data: SleepLock::new("buffer", BlockData::new()),
        }
    }

    // =========================================================================
    // IDENTIDADE
    // =========================================================================

    /// `(dev, blockno)` atual, ou `None` se o slot nunca foi usado.
    #[inline]
    pub fn key(&self) -> Option<(u32, u32)> {
        match self.key.load(Ordering::Acquire) {
            NO_KEY => None,
            key => Some(unpack(key)),
        }
    }

    /// Troca a identidade. Exige os locks do bucket antigo e do novo.
    #[inline]
    pub(crate) fn set_key(&self, dev: u32, blockno: u32) {
        self.key.store(pack(dev, blockno), Ordering::Release);
    }

    // =========================================================================
    // REFERÊNCIAS
    // =========================================================================

    #[inline]
    pub fn ref_count(&self) -> u32 {
        self.refcnt.load(Ordering::Acquire)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Acquire)
    }

    #[inline]
    pub fn recency(&self) -> u64 {
        self.recency.load(Ordering::Acquire)
    }

    /// Reivindica um slot livre (refcnt 0 → 1). Falha se alguém chegou antes.
    #[inline]
    pub(crate) fn claim(&self) -> bool {
        self.refcnt
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub(crate) fn add_ref(&self) -> u32 {
        self.refcnt.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrementa o refcnt e retorna o novo valor, ou `None` se já era 0.
    #[inline]
    pub(crate) fn drop_ref(&self) -> Option<u32> {
        self.refcnt
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }

    #[inline]
    pub(crate) fn add_pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrementa o contador de pins; `false` se não havia pin.
    #[inline]
    pub(crate) fn drop_pin(&self) -> bool {
        self.pins
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    #[inline]
    pub(crate) fn stamp(&self, now: u64) {
        self.recency.store(now, Ordering::Release);
    }

    // =========================================================================
    // FLAGS
    // =========================================================================

    #[inline]
    pub fn flags(&self) -> SlotFlags {
        SlotFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_flags(&self, flags: SlotFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn clear_flags(&self, flags: SlotFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Zera as flags (conteúdo de outro bloco).
    #[inline]
    pub(crate) fn reset_flags(&self) {
        self.flags.store(0, Ordering::Release);
    }
}

impl Default for BufferSlot {
    fn default() -> Self {
        Self::new()
    }
}
