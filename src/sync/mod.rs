//! # Synchronization Primitives
//!
//! Primitivas de sincronização para ambiente SMP.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! Spinlock   → Seções críticas curtas (não pode dormir)
//! SleepLock  → Seções que podem bloquear (dorme via scheduler)
//! ```
//!
//! ## Regras
//!
//! - **Spinlock**: Apenas para mutações O(1) (buckets do cache)
//! - **SleepLock**: Conteúdo de buffers, pode ser segurado durante I/O
//! - **Nunca** dormir em um SleepLock segurando um Spinlock
//! - **Ordem de Lock**: Sempre adquirir na mesma ordem para evitar deadlock

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

/// SleepLock (pode bloquear thread)
pub mod sleeplock;


#[cfg(test)]
mod tests;

pub use sleeplock::{SleepLock, SleepLockGuard};
pub use spinlock::{Spinlock, SpinlockGuard};
