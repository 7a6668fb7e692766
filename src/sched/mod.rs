//! # Scheduler Hook
//!
//! O buffer cache não tem scheduler próprio. Quem o embarca (o kernel)
//! fornece três operações e as instala uma vez no boot:
//!
//! | Operação       | Uso no cache                                   |
//! |----------------|------------------------------------------------|
//! | `current_tid`  | Dono do SleepLock (`holding()`)                |
//! | `futex_wait`   | Dormir enquanto o SleepLock estiver ocupado    |
//! | `futex_wake`   | Acordar quem dorme no SleepLock                |
//!
//! A semântica de `futex_wait` é a do futex: dorme somente se
//! `*word == expected` no momento da verificação; retornos espúrios são
//! permitidos (o chamador sempre revalida).
//!
//! Com a feature `std`, um scheduler de host (threads do SO) é usado se
//! nenhum outro for instalado.

use core::sync::atomic::AtomicU32;
use spin::Once;

#[cfg(any(test, feature = "std"))]
pub mod host;

/// Identificador de thread. `0` significa "nenhuma".
pub type Tid = u32;

/// Operações de escalonamento exigidas pelas primitivas que dormem.
pub trait Scheduler: Send + Sync {
    /// Thread em execução na CPU atual (nunca 0).
    fn current_tid(&self) -> Tid;

    /// Bloqueia a thread atual enquanto `word == expected`.
    fn futex_wait(&self, word: &AtomicU32, expected: u32);

    /// Acorda até `count` threads bloqueadas em `word`.
    fn futex_wake(&self, word: &AtomicU32, count: u32);
}

static SCHEDULER: Once<&'static dyn Scheduler> = Once::new();

/// Instala o scheduler. Apenas a primeira chamada tem efeito.
pub fn install(scheduler: &'static dyn Scheduler) -> bool {
    let mut installed = false;
    SCHEDULER.call_once(|| {
        installed = true;
        scheduler
    });
    if installed {
        crate::kinfo!("(Sched) Scheduler instalado");
    }
    installed
}

/// Scheduler em uso.
#[cfg(any(test, feature = "std"))]
pub fn current() -> &'static dyn Scheduler {
    *SCHEDULER.call_once(|| &host::HOST as &'static dyn Scheduler)
}

/// Scheduler em uso.
///
/// # Panics
/// Se nenhum scheduler foi instalado: nenhuma primitiva que dorme pode
/// funcionar sem ele.
#[cfg(not(any(test, feature = "std")))]
pub fn current() -> &'static dyn Scheduler {
    match SCHEDULER.get() {
        Some(scheduler) => *scheduler,
        None => {
            crate::kerror!("(Sched) current: scheduler não instalado");
            panic!("sched: scheduler not installed");
        }
    }
}
