//! # Configuração do Buffer Cache
//!
//! Constantes de build e a configuração fixada no `binit`.

// =============================================================================
// CONSTANTES
// =============================================================================

/// Tamanho de um bloco do cache (bytes)
pub const BSIZE: usize = 1024;

/// Máximo de blocos que uma operação do filesystem escreve
pub const MAXOPBLOCKS: usize = 10;

/// Número de buffers no pool
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// Número de buckets (shards) da tabela de lookup
pub const NBUCKETS: usize = 13;

/// Máximo de blocos endereçáveis por dispositivo
pub const FSSIZE: usize = 2000;

/// Número de dispositivos (ids `0..NDEV`)
pub const NDEV: usize = 4;

// =============================================================================
// CONFIGURAÇÃO
// =============================================================================

/// Geometria do cache, fixada na construção.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcacheConfig {
    /// Buffers no pool
    pub nbuf: usize,
    /// Buckets da tabela
    pub nbuckets: usize,
    /// Blocos por dispositivo
    pub fs_size: usize,
    /// Dispositivos
    pub ndev: usize,
}

impl Default for BcacheConfig {
    fn default() -> Self {
        Self {
            nbuf: NBUF,
            nbuckets: NBUCKETS,
            fs_size: FSSIZE,
            ndev: NDEV,
        }
    }
}

impl BcacheConfig {
    /// Configuração padrão com `nbuf` buffers.
    pub fn with_nbuf(nbuf: usize) -> Self {
        Self {
            nbuf,
            ..Self::default()
        }
    }

    /// Células por dispositivo em cada bucket: `fs_size / nbuckets + 1`.
    pub fn cells_per_dev(&self) -> usize {
        self.fs_size / self.nbuckets + 1
    }

    /// Células por bucket (todos os dispositivos).
    pub fn cells_per_bucket(&self) -> usize {
        self.ndev * self.cells_per_dev()
    }

    /// Bucket dono de `blockno`.
    #[inline]
    pub fn bucket_of(&self, blockno: u32) -> usize {
        blockno as usize % self.nbuckets
    }

    /// Célula de `(dev, blockno)` dentro do seu bucket.
    #[inline]
    pub fn cell_of(&self, dev: u32, blockno: u32) -> usize {
        dev as usize * self.cells_per_dev() + blockno as usize / self.nbuckets
    }

    /// `(dev, blockno)` está dentro da geometria?
    #[inline]
    pub fn contains(&self, dev: u32, blockno: u32) -> bool {
        (dev as usize) < self.ndev && (blockno as usize) < self.fs_size
    }

    /// Valida a geometria.
    ///
    /// # Panics
    /// Em geometria vazia ou com mais buffers do que cabem em um `SlotId`.
    pub fn validate(&self) {
        if self.nbuf == 0 || self.nbuckets == 0 || self.fs_size == 0 || self.ndev == 0 {
            crate::kerror!("(Bcache) binit: geometria com campo zero");
            panic!("binit: invalid config (zero field)");
        }
        if self.nbuf > u32::MAX as usize || self.ndev > u32::MAX as usize {
            crate::kerror!("(Bcache) binit: pool grande demais, nbuf=", self.nbuf as u64);
            panic!("binit: invalid config (pool too large)");
        }
    }
}
