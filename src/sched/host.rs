//! Scheduler de host.
//!
//! Mapeia as operações do hook para threads do SO: `current_tid` vem de um
//! contador por thread e `futex_wait`/`futex_wake` estacionam a thread em
//! uma tabela de filas (Mutex + Condvar) indexada pelo endereço da palavra,
//! como a FUTEX_TABLE do kernel.

use core::sync::atomic::{AtomicU32, Ordering};
use std::cell::Cell;
use std::sync::{Condvar, Mutex, PoisonError};

use super::{Scheduler, Tid};

/// Número de filas na tabela de espera
const WAIT_BUCKETS: usize = 16;

/// Instância usada como fallback por `sched::current()`.
pub static HOST: HostScheduler = HostScheduler::new();

static NEXT_TID: AtomicU32 = AtomicU32::new(1);

std::thread_local! {
    static TID: Cell<Tid> = const { Cell::new(0) };
}

struct WaitBucket {
    lock: Mutex<()>,
    cond: Condvar,
}

/// Scheduler baseado em threads do SO.
pub struct HostScheduler {
    buckets: [WaitBucket; WAIT_BUCKETS],
}

impl HostScheduler {
    pub const fn new() -> Self {
        const EMPTY: WaitBucket = WaitBucket {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        };
        Self {
            buckets: [EMPTY; WAIT_BUCKETS],
        }
    }

    fn bucket(&self, word: &AtomicU32) -> &WaitBucket {
        let addr = word as *const AtomicU32 as usize;
        &self.buckets[(addr >> 2) % WAIT_BUCKETS]
    }
}

impl Default for HostScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for HostScheduler {
    fn current_tid(&self) -> Tid {
        TID.with(|tid| {
            if tid.get() == 0 {
                tid.set(NEXT_TID.fetch_add(1, Ordering::Relaxed));
            }
            tid.get()
        })
    }

    fn futex_wait(&self, word: &AtomicU32, expected: u32) {
        let bucket = self.bucket(word);
        let guard = bucket.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Verificação sob o lock da fila: quem acorda pega o mesmo lock
        // depois de mudar a palavra, então o wake não se perde.
        if word.load(Ordering::Acquire) != expected {
            return;
        }
        drop(
            bucket
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    fn futex_wake(&self, word: &AtomicU32, _count: u32) {
        let bucket = self.bucket(word);
        let _guard = bucket.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A fila é compartilhada por várias palavras: acordar só uma thread
        // poderia acordar a thread errada.
        bucket.cond.notify_all();
    }
}
