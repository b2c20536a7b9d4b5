//! Lock helpers that recover from poisoning instead of propagating it.
//!
//! A handler that panics while holding a lock must not take the whole session
//! down with it; the guarded data is still structurally valid because every
//! mutation is a single step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

static LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_lock_poison_once(operation: &'static str) {
    if LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "state lock poisoned; recovered inner value");
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn_lock_poison_once("read");
        poisoned.into_inner()
    })
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn_lock_poison_once("write");
        poisoned.into_inner()
    })
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn_lock_poison_once("lock");
        poisoned.into_inner()
    })
}

/// A single independently-locked value.
///
/// Reads and writes of one `Field` never contend with any other `Field`.
#[derive(Debug, Default)]
pub struct Field<T> {
    value: RwLock<T>,
}

impl<T> Field<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    pub fn set(&self, value: T) {
        *write(&self.value) = value;
    }

    /// Read-modify-write under one write lock. Returns the result of `f`.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut write(&self.value))
    }
}

impl<T: Clone> Field<T> {
    pub fn get(&self) -> T {
        read(&self.value).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn field_get_set() {
        let field = Field::new(1u32);
        field.set(5);
        assert_eq!(field.get(), 5);
    }

    #[test]
    fn field_update_has_no_lost_writes() {
        let field = Arc::new(Field::new(0u64));
        std::thread::scope(|s| {
            for _ in 0..8 {
                let field = Arc::clone(&field);
                s.spawn(move || {
                    for _ in 0..1000 {
                        field.update(|v| *v += 1);
                    }
                });
            }
        });
        assert_eq!(field.get(), 8000);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(RwLock::new(7));
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison state lock");
        })
        .join();
        assert!(lock.is_poisoned());
        assert_eq!(*read(&lock), 7);
        *write(&lock) = 8;
        assert_eq!(*read(&lock), 8);
    }
}
