//! Testes das primitivas de sincronização (host)

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{SleepLock, Spinlock};

#[test]
fn test_spinlock_counter() {
    let lock = Spinlock::new("counter", 0u64);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    *lock.lock() += 1;
                }
            });
        }
    });

    assert_eq!(*lock.lock(), 40_000);
    assert_eq!(lock.name(), "counter");
}

#[test]
fn test_sleeplock_counter_under_contention() {
    let lock = SleepLock::new("counter", 0u64);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..2_000 {
                    let mut guard = lock.lock();
                    let value = *guard;
                    thread::yield_now();
                    *guard = value + 1;
                }
            });
        }
    });

    assert_eq!(*lock.lock(), 8_000);
}

#[test]
fn test_sleeplock_owner_is_per_thread() {
    let lock = Arc::new(SleepLock::new("owner", ()));
    let guard = lock.lock();
    let owner = lock.owner();
    assert!(lock.holding());

    let other = Arc::clone(&lock);
    let seen = thread::spawn(move || (other.holding(), other.try_lock().is_none()))
        .join()
        .unwrap();
    assert_eq!(seen, (false, true));

    drop(guard);
    assert!(!lock.holding());
    assert_ne!(owner, 0);
}

#[test]
fn test_sleeplock_waiter_is_woken() {
    let lock = SleepLock::new("wake", 0u32);
    let started = AtomicBool::new(false);
    let woke = AtomicU32::new(0);

    thread::scope(|s| {
        let mut guard = lock.lock();

        s.spawn(|| {
            started.store(true, Ordering::Release);
            let guard = lock.lock();
            woke.store(*guard, Ordering::Release);
        });

        while !started.load(Ordering::Acquire) {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(20));
        *guard = 9;
        drop(guard);
    });

    assert_eq!(woke.load(Ordering::Acquire), 9);
}

#[cfg(feature = "self_test")]
#[test]
fn test_self_test_suite() {
    assert!(super::test::run_sync_tests().ok());
}
