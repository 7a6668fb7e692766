//! SleepLock - lock que dorme
//!
//! Lock de longa duração: quem não consegue o lock é suspenso pelo
//! scheduler (futex wait) em vez de girar. Registra o dono para que o
//! chamador possa verificar `holding()`.
//!
//! ## Estados
//!
//! ```text
//! FREE (0) ──lock──▶ LOCKED (1) ──outro lock──▶ CONTENDED (2)
//!     ▲                  │                          │
//!     └─────unlock───────┴──────unlock + wake───────┘
//! ```

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

use crate::sched::{self, Tid};

const FREE: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// SleepLock - bloqueia a thread se não conseguir o lock
///
/// # Diferença do Spinlock
///
/// - SleepLock PODE dormir (chama o scheduler)
/// - Spinlock NÃO pode dormir (busy-wait)
///
/// Nunca adquira um SleepLock segurando um Spinlock.
pub struct SleepLock<T> {
    /// Estado do lock (FREE / LOCKED / CONTENDED)
    state: AtomicU32,
    /// Tid do dono (0 = livre)
    owner: AtomicU32,
    /// Nome (diagnóstico)
    name: &'static str,
    /// Dados protegidos
    data: UnsafeCell<T>,
}

// SAFETY: SleepLock protege acesso com lock
unsafe impl<T: Send> Send for SleepLock<T> {}
unsafe impl<T: Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            state: AtomicU32::new(FREE),
            owner: AtomicU32::new(0),
            name,
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock (pode dormir)
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        let scheduler = sched::current();

        if self
            .state
            .compare_exchange(FREE, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Marca como disputado e dorme até pegar o lock livre.
            // Quem sai com CONTENDED fica responsável por acordar o próximo.
            while self.state.swap(CONTENDED, Ordering::Acquire) != FREE {
                scheduler.futex_wait(&self.state, CONTENDED);
            }
        }

        self.owner
            .store(scheduler.current_tid(), Ordering::Relaxed);
        SleepLockGuard { lock: self }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<SleepLockGuard<'_, T>> {
        if self
            .state
            .compare_exchange(FREE, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.owner
                .store(sched::current().current_tid(), Ordering::Relaxed);
            Some(SleepLockGuard { lock: self })
        } else {
            None
        }
    }

    /// A thread atual segura este lock?
    pub fn holding(&self) -> bool {
        self.state.load(Ordering::Relaxed) != FREE
            && self.owner.load(Ordering::Relaxed) == sched::current().current_tid()
    }

    /// Tid do dono atual (0 = livre)
    pub fn owner(&self) -> Tid {
        self.owner.load(Ordering::Relaxed)
    }

    /// Nome do lock (diagnóstico)
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn unlock(&self) {
        self.owner.store(0, Ordering::Relaxed);
        if self.state.swap(FREE, Ordering::Release) == CONTENDED {
            sched::current().futex_wake(&self.state, 1);
        }
    }
}

/// Guard do SleepLock - libera (e acorda um waiter) ao sair do escopo
pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
}

impl<'a, T> SleepLockGuard<'a, T> {
    /// Lock ao qual este guard pertence
    pub fn lock(&self) -> &'a SleepLock<T> {
        self.lock
    }
}

impl<T> Deref for SleepLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
