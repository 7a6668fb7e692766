//! # Ramdisk
//!
//! Disco em memória. Usado pelos self tests e pelos testes do cache.
//!
//! Conta leituras e gravações de setores e permite injetar falhas de I/O,
//! o que deixa os testes verificar quando o cache foi (ou não) ao disco.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

use super::traits::{BlockDevice, BlockError};

/// Disco em memória com setores de `block_size` bytes.
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    block_size: usize,
    total_blocks: u64,
    read_only: bool,
    /// Setores lidos desde a criação
    reads: AtomicUsize,
    /// Setores gravados desde a criação
    writes: AtomicUsize,
    /// Quando ligado, toda operação retorna `IoError`
    fail: AtomicBool,
}

impl RamDisk {
    /// Cria disco zerado com `total_blocks` setores de `block_size` bytes.
    pub fn new(block_size: usize, total_blocks: u64) -> Self {
        Self {
            data: Mutex::new(vec![0u8; block_size * total_blocks as usize]),
            block_size,
            total_blocks,
            read_only: false,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Mesmo disco, mas rejeitando gravações.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Setores lidos até agora.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Setores gravados até agora.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Liga/desliga a injeção de falhas.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Copia o conteúdo cru do setor `lba` (sem contar como leitura).
    pub fn peek(&self, lba: u64, buf: &mut [u8]) {
        let start = lba as usize * self.block_size;
        let data = self.data.lock();
        buf.copy_from_slice(&data[start..start + self.block_size]);
    }

    /// Grava direto no setor `lba` (sem contar como gravação).
    pub fn poke(&self, lba: u64, buf: &[u8]) {
        let start = lba as usize * self.block_size;
        let mut data = self.data.lock();
        data[start..start + self.block_size].copy_from_slice(buf);
    }

    fn check(&self, lba: u64, len: usize) -> Result<usize, BlockError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(BlockError::IoError);
        }
        if lba >= self.total_blocks {
            return Err(BlockError::InvalidBlock);
        }
        if len != self.block_size {
            return Err(BlockError::InvalidBuffer);
        }
        Ok(lba as usize * self.block_size)
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, lba: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let start = self.check(lba, buf.len())?;
        let data = self.data.lock();
        buf.copy_from_slice(&data[start..start + self.block_size]);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError> {
        if self.read_only {
            return Err(BlockError::ReadOnly);
        }
        let start = self.check(lba, buf.len())?;
        let mut data = self.data.lock();
        data[start..start + self.block_size].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}
