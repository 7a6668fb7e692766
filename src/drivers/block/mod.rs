//! # Dispositivos de Bloco
//!
//! Registro de dispositivos e tradução bloco do cache → setores.
//!
//! | Driver      | Status      | Descrição                    |
//! |-------------|-------------|------------------------------|
//! | Ramdisk     | Funcional   | Disco em memória (testes)    |
//! | Externo     | Via trait   | Qualquer `BlockDevice`       |
//!
//! Um bloco do cache tem `BSIZE` bytes e ocupa `BSIZE / block_size`
//! setores consecutivos do dispositivo.

pub mod ramdisk;
pub mod traits;

pub use ramdisk::RamDisk;
pub use traits::{BlockDevice, BlockError, BlockTransfer};

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::fs::bcache::config::BSIZE;

/// Registro de dispositivos de bloco indexado pelo número do dispositivo.
///
/// Implementa `BlockTransfer`: é o colaborador que o buffer cache usa para
/// ler e gravar blocos.
pub struct DeviceTable {
    devices: Mutex<Vec<Option<Arc<dyn BlockDevice>>>>,
}

impl DeviceTable {
    /// Cria registro vazio com `ndev` posições (dispositivos `0..ndev`).
    pub fn new(ndev: usize) -> Self {
        let mut devices = Vec::with_capacity(ndev);
        devices.resize_with(ndev, || None);
        Self {
            devices: Mutex::new(devices),
        }
    }

    /// Registra `device` como dispositivo `dev`, substituindo o anterior.
    pub fn register(&self, dev: u32, device: Arc<dyn BlockDevice>) -> Result<(), BlockError> {
        let mut devices = self.devices.lock();
        let slot = devices
            .get_mut(dev as usize)
            .ok_or(BlockError::NotFound)?;
        if device.block_size() == 0 || BSIZE % device.block_size() != 0 {
            crate::kwarn!("(Block) Tamanho de setor incompatível com BSIZE: ", device.block_size());
            return Err(BlockError::InvalidBuffer);
        }
        crate::kdebug!("(Block) Dispositivo registrado: dev=", dev);
        *slot = Some(device);
        Ok(())
    }

    /// Remove o dispositivo `dev` do registro.
    pub fn unregister(&self, dev: u32) -> Option<Arc<dyn BlockDevice>> {
        self.devices
            .lock()
            .get_mut(dev as usize)
            .and_then(|slot| slot.take())
    }

    /// Retorna o dispositivo `dev`, se registrado.
    pub fn get(&self, dev: u32) -> Option<Arc<dyn BlockDevice>> {
        self.devices
            .lock()
            .get(dev as usize)
            .and_then(|slot| slot.clone())
    }
}

impl BlockTransfer for DeviceTable {
    fn transfer(
        &self,
        dev: u32,
        blockno: u32,
        data: &mut [u8; BSIZE],
        write: bool,
    ) -> Result<(), BlockError> {
        // Clona o Arc e solta o lock: a transferência pode demorar
        let device = self.get(dev).ok_or(BlockError::NotFound)?;

        let sectors = (BSIZE / device.block_size()) as u64;
        let lba = blockno as u64 * sectors;
        if lba + sectors > device.total_blocks() {
            return Err(BlockError::InvalidBlock);
        }

        if write {
            if device.is_read_only() {
                return Err(BlockError::ReadOnly);
            }
            device.write_blocks(lba, &data[..])
        } else {
            device.read_blocks(lba, &mut data[..])
        }
    }
}
