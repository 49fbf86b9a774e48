//! Spinlock dos caminhos do kmalloc
//!
//! Trava de busy-wait sem desabilitar interrupções. Quem segura uma destas
//! nunca dorme e nunca chama o kmalloc de novo.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// Trava de exclusão mútua por espera ativa.
///
/// Protege diretório, Caches, região e o bitmap de cada slab. As seções
/// críticas são curtas: mexer em ponteiros de lista ou achar um bit livre.
///
/// Não serve para handlers de interrupção: o kfree pode estar com o lock.
pub struct Spinlock<T> {
    held: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: o acesso a `value` só acontece com `held` adquirido
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            held: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Adquire, girando enquanto outro CPU segura a trava
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        match self.try_lock() {
            Some(guard) => guard,
            None => self.lock_contended(),
        }
    }

    #[cold]
    fn lock_contended(&self) -> SpinlockGuard<'_, T> {
        loop {
            // Só leitura até parecer livre: a cache line fica compartilhada
            while self.held.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
            if self
                .held
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinlockGuard::new(self);
            }
        }
    }

    /// Uma única tentativa
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinlockGuard::new(self))
    }

    /// Estado instantâneo, só para asserts e diagnóstico
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

/// Posse da trava. Soltar o guard libera o lock.
pub struct SpinlockGuard<'a, T> {
    owner: &'a Spinlock<T>,
    // Guard não atravessa threads: quem trava destrava
    _not_send: PhantomData<*const ()>,
}

impl<'a, T> SpinlockGuard<'a, T> {
    fn new(owner: &'a Spinlock<T>) -> Self {
        Self {
            owner,
            _not_send: PhantomData,
        }
    }
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: o guard prova a posse da trava
        unsafe { &*self.owner.value.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: idem, e `&mut self` impede outro empréstimo do guard
        unsafe { &mut *self.owner.value.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unlock() {
        let lock = Spinlock::new(5usize);
        {
            let mut guard = lock.lock();
            *guard += 1;
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn test_concurrent_increment() {
        let lock = Spinlock::new(0usize);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        *lock.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(*lock.lock(), 40_000);
    }
}
