//! # Camada de Abstração de Dispositivos de Bloco
//!
//! Contratos entre o buffer cache e os drivers de bloco.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              BUFFER CACHE (fs::bcache)              │
//! └─────────────────────────────────────────────────────┘
//!                          ↓
//! ┌─────────────────────────────────────────────────────┐
//! │              BlockTransfer Trait                    │
//! │   transfer(dev, blockno, data, write)               │
//! └─────────────────────────────────────────────────────┘
//!                          ↓
//! ┌─────────────────────────────────────────────────────┐
//! │              BlockDevice Trait (por dispositivo)    │
//! │   read_block() write_block() block_size()           │
//! └─────────────────────────────────────────────────────┘
//! ```

use core::fmt;

use crate::fs::bcache::config::BSIZE;

/// Tipos de erro para dispositivos de bloco
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Dispositivo não encontrado ou não inicializado
    NotFound,
    /// Endereço de bloco inválido (fora do intervalo)
    InvalidBlock,
    /// Erro de I/O durante leitura/escrita
    IoError,
    /// Dispositivo somente leitura
    ReadOnly,
    /// Tamanho do buffer incorreto
    InvalidBuffer,
    /// Dispositivo ocupado
    Busy,
    /// Erro genérico de hardware
    HardwareError,
}

impl BlockError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockError::NotFound => "Dispositivo não encontrado",
            BlockError::InvalidBlock => "Endereço de bloco inválido",
            BlockError::IoError => "Erro de I/O",
            BlockError::ReadOnly => "Dispositivo somente leitura",
            BlockError::InvalidBuffer => "Tamanho do buffer inválido",
            BlockError::Busy => "Dispositivo ocupado",
            BlockError::HardwareError => "Erro de hardware",
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait para dispositivos de bloco
///
/// Todos os drivers de dispositivos de bloco devem implementar esta trait.
pub trait BlockDevice: Send + Sync {
    /// Lê um único setor do dispositivo
    ///
    /// # Argumentos
    /// * `lba` - Endereço Lógico de Bloco (Logical Block Address)
    /// * `buf` - Buffer para armazenar os dados (exatamente block_size bytes)
    fn read_block(&self, lba: u64, buf: &mut [u8]) -> Result<(), BlockError>;

    /// Escreve um único setor no dispositivo
    ///
    /// # Argumentos
    /// * `lba` - Endereço Lógico de Bloco
    /// * `buf` - Buffer com os dados a escrever (exatamente block_size bytes)
    fn write_block(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError>;

    /// Retorna o tamanho do setor em bytes (normalmente 512)
    fn block_size(&self) -> usize;

    /// Retorna o número total de setores no dispositivo
    fn total_blocks(&self) -> u64;

    /// Verifica se o dispositivo é somente leitura
    fn is_read_only(&self) -> bool {
        false
    }

    /// Força a escrita de dados em cache para o dispositivo
    fn flush(&self) -> Result<(), BlockError> {
        Ok(())
    }

    /// Lê múltiplos setores contíguos
    fn read_blocks(&self, start_lba: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let block_size = self.block_size();
        if block_size == 0 || buf.len() % block_size != 0 {
            return Err(BlockError::InvalidBuffer);
        }

        let num_blocks = buf.len() / block_size;
        for i in 0..num_blocks {
            let offset = i * block_size;
            self.read_block(start_lba + i as u64, &mut buf[offset..offset + block_size])?;
        }
        Ok(())
    }

    /// Escreve múltiplos setores contíguos
    fn write_blocks(&self, start_lba: u64, buf: &[u8]) -> Result<(), BlockError> {
        let block_size = self.block_size();
        if block_size == 0 || buf.len() % block_size != 0 {
            return Err(BlockError::InvalidBuffer);
        }

        let num_blocks = buf.len() / block_size;
        for i in 0..num_blocks {
            let offset = i * block_size;
            self.write_block(start_lba + i as u64, &buf[offset..offset + block_size])?;
        }
        Ok(())
    }
}

/// Transferência síncrona de um bloco do cache.
///
/// É o único colaborador de I/O do buffer cache. Deve completar (ou falhar)
/// antes de retornar; o cache nunca faz I/O parcial ou assíncrono.
///
/// * `write == false` - lê o bloco `(dev, blockno)` para `data`
/// * `write == true`  - grava `data` no bloco `(dev, blockno)`
pub trait BlockTransfer: Send + Sync {
    fn transfer(
        &self,
        dev: u32,
        blockno: u32,
        data: &mut [u8; BSIZE],
        write: bool,
    ) -> Result<(), BlockError>;
}
