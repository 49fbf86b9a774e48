//! # Cache
//!
//! Todos os slabs de uma size-class, separados em três listas:
//!
//! - `empty`: count == 0
//! - `partial`: 0 < count < max
//! - `full`: count == max
//!
//! O lock do Cache protege as listas, as contagens dos slabs e as decisões
//! de transição. Recortar o objeto acontece fora dele, sob o lock do slab.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::sync::Spinlock;

use super::list::SlabList;
use super::slab::{Slab, SlabState};
use super::stats::SlabStats;

pub struct SlabLists {
    empty: SlabList,
    partial: SlabList,
    full: SlabList,
}

// SAFETY: os slabs apontados vivem na região do kmalloc para sempre e só
// são alterados com o lock do Cache.
unsafe impl Send for SlabLists {}

/// Tamanho de cada lista num instante
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCounts {
    pub empty: usize,
    pub partial: usize,
    pub full: usize,
    pub slab_count: usize,
}

impl SlabLists {
    const fn new() -> Self {
        Self {
            empty: SlabList::new(),
            partial: SlabList::new(),
            full: SlabList::new(),
        }
    }

    fn list(&mut self, state: SlabState) -> &mut SlabList {
        match state {
            SlabState::Empty => &mut self.empty,
            SlabState::Partial => &mut self.partial,
            SlabState::Full => &mut self.full,
        }
    }

    /// Move `slab` de `from` (None = slab novo) para `to`.
    ///
    /// O estado gravado no nó precisa bater com `from`: um slab nunca entra
    /// duas vezes numa lista.
    fn transition(&mut self, slab: NonNull<Slab>, from: Option<SlabState>, to: SlabState) {
        // SAFETY: lock do Cache segurado por quem tem `&mut self`
        let header = unsafe { slab.as_ref() };
        assert_eq!(
            header.state(),
            from,
            "(Slab) transição de lista inválida"
        );

        unsafe {
            if let Some(from) = from {
                self.list(from).remove(slab);
            }
            self.list(to).push_back(slab);
            (*header.node()).state = Some(to);
        }
    }
}

pub struct Cache {
    lists: Spinlock<SlabLists>,
    /// Total de slabs; lido sem lock pelo relatório
    slab_count: AtomicUsize,
    object_size: usize,
}

impl Cache {
    pub const fn new(object_size: usize) -> Self {
        Self {
            lists: Spinlock::new(SlabLists::new()),
            slab_count: AtomicUsize::new(0),
            object_size,
        }
    }

    pub fn object_size(&self) -> usize {
        self.object_size
    }

    pub fn slab_count(&self) -> usize {
        self.slab_count.load(Ordering::Relaxed)
    }

    /// Escolhe um slab e reserva uma vaga nele.
    ///
    /// Ordem: parcial, vazio, novo (`grow`, chamado com o lock do Cache).
    pub fn acquire_slot<F>(&self, stats: &SlabStats, grow: F) -> NonNull<Slab>
    where
        F: FnOnce() -> NonNull<Slab>,
    {
        let mut lists = self.lists.lock();

        let slab = if let Some(slab) = lists.partial.front() {
            // SAFETY: slabs nas listas são cabeçalhos válidos
            let header = unsafe { slab.as_ref() };
            if header.count() == header.max() - 1 {
                lists.transition(slab, Some(SlabState::Partial), SlabState::Full);
                stats.record_move(Some(SlabState::Partial), SlabState::Full);
            }
            slab
        } else if let Some(slab) = lists.empty.front() {
            lists.transition(slab, Some(SlabState::Empty), SlabState::Partial);
            stats.record_move(Some(SlabState::Empty), SlabState::Partial);
            slab
        } else {
            let slab = grow();
            lists.transition(slab, None, SlabState::Partial);
            stats.record_move(None, SlabState::Partial);
            self.slab_count.fetch_add(1, Ordering::Relaxed);
            slab
        };

        // SAFETY: idem
        unsafe { slab.as_ref() }.take_slot();
        slab
    }

    /// Devolve uma vaga de `slab` e ajusta a lista.
    ///
    /// O objeto já voltou ao sub-alocador do slab.
    pub fn release_slot(&self, slab: &Slab, stats: &SlabStats) {
        let mut lists = self.lists.lock();
        let count = slab.put_slot();
        let ptr = NonNull::from(slab);

        if count == slab.max() - 1 {
            lists.transition(ptr, Some(SlabState::Full), SlabState::Partial);
            stats.record_move(Some(SlabState::Full), SlabState::Partial);
        } else if count == 0 {
            lists.transition(ptr, Some(SlabState::Partial), SlabState::Empty);
            stats.record_move(Some(SlabState::Partial), SlabState::Empty);
        }
    }

    /// Registra o primeiro slab do cache-de-caches, que já tem um objeto
    /// (o próprio Cache).
    ///
    /// # Safety
    ///
    /// Apenas no bootstrap; `slab` ainda não está em lista alguma e teve
    /// exatamente um objeto recortado.
    pub unsafe fn adopt_bootstrap_slab(&self, slab: NonNull<Slab>, stats: &SlabStats) {
        let mut lists = self.lists.lock();
        lists.transition(slab, None, SlabState::Partial);
        stats.record_move(None, SlabState::Partial);
        self.slab_count.fetch_add(1, Ordering::Relaxed);
        slab.as_ref().take_slot();
    }

    /// Estado de um slab deste cache
    pub fn state_of(&self, slab: &Slab) -> Option<SlabState> {
        let _lists = self.lists.lock();
        slab.state()
    }

    /// Contagens das listas sob o lock
    pub fn counts(&self) -> ListCounts {
        let lists = self.lists.lock();
        ListCounts {
            empty: lists.empty.len(),
            partial: lists.partial.len(),
            full: lists.full.len(),
            slab_count: self.slab_count(),
        }
    }

    /// Confere as invariantes de todas as listas (diagnóstico)
    pub fn check_lists(&self) -> bool {
        let lists = self.lists.lock();
        let total = lists.empty.len() + lists.partial.len() + lists.full.len();
        if total != self.slab_count() {
            return false;
        }

        let mut ok = true;
        for (list, state) in [
            (&lists.empty, SlabState::Empty),
            (&lists.partial, SlabState::Partial),
            (&lists.full, SlabState::Full),
        ] {
            for slab in list.iter() {
                // SAFETY: lock segurado
                let slab = unsafe { slab.as_ref() };
                let count = slab.count();
                ok &= slab.is_valid() && slab.state() == Some(state);
                ok &= match state {
                    SlabState::Empty => count == 0,
                    SlabState::Partial => count > 0 && count < slab.max(),
                    SlabState::Full => count == slab.max(),
                };
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::config::SLAB_SIZE;
    use crate::mm::slab::testing::{RecordingMapper, TestRegion};

    struct Fixture {
        backing: TestRegion,
        mapper: RecordingMapper,
        next: core::cell::Cell<usize>,
        cache: Cache,
        stats: SlabStats,
    }

    impl Fixture {
        fn new(object_size: usize, slabs: usize) -> Self {
            Self {
                backing: TestRegion::new(slabs),
                mapper: RecordingMapper::new(),
                next: core::cell::Cell::new(0),
                cache: Cache::new(object_size),
                stats: SlabStats::new(),
            }
        }

        fn grow(&self) -> NonNull<Slab> {
            let base = self.backing.start() + self.next.get() * SLAB_SIZE;
            self.next.set(self.next.get() + 1);
            let cache = NonNull::from(&self.cache);
            unsafe { Slab::create(base, cache, self.cache.object_size(), &self.mapper) }.unwrap()
        }

        fn alloc(&self) -> (NonNull<Slab>, usize) {
            let slab = self.cache.acquire_slot(&self.stats, || self.grow());
            let obj = unsafe { slab.as_ref() }.carve(&self.mapper);
            (slab, obj)
        }

        fn free(&self, obj: usize) {
            let slab = unsafe { Slab::containing(obj).as_ref() };
            slab.release(obj);
            self.cache.release_slot(slab, &self.stats);
        }
    }

    #[test]
    fn test_partial_to_full_and_back() {
        // 64 KiB: 3 objetos por slab
        let f = Fixture::new(SLAB_SIZE / 4, 2);

        let (s1, a) = f.alloc();
        let (_, b) = f.alloc();
        assert_eq!(f.cache.counts().partial, 1);

        let (s3, c) = f.alloc();
        assert_eq!(s1, s3);
        let counts = f.cache.counts();
        assert_eq!((counts.partial, counts.full), (0, 1));
        assert_eq!(f.cache.state_of(unsafe { s1.as_ref() }), Some(SlabState::Full));

        // Slab cheio: o próximo vem de um slab novo
        let (s4, d) = f.alloc();
        assert_ne!(s1, s4);
        assert_eq!(f.cache.counts().slab_count, 2);

        // Primeiro free num slab cheio: volta para parcial
        f.free(b);
        let counts = f.cache.counts();
        assert_eq!((counts.partial, counts.full), (2, 0));
        assert!(f.cache.check_lists());

        f.free(a);
        f.free(c);
        f.free(d);
        let counts = f.cache.counts();
        assert_eq!((counts.empty, counts.partial, counts.full), (2, 0, 0));
        assert_eq!(f.stats.snapshot().empty_slabs, 2);
        assert!(f.cache.check_lists());
    }

    #[test]
    fn test_empty_slab_reused_before_growing() {
        let f = Fixture::new(256, 2);
        let (s1, a) = f.alloc();
        f.free(a);
        assert_eq!(f.cache.counts().empty, 1);

        let (s2, _) = f.alloc();
        assert_eq!(s1, s2);
        assert_eq!(f.cache.counts().slab_count, 1);
        assert_eq!(f.cache.state_of(unsafe { s2.as_ref() }), Some(SlabState::Partial));
    }
}
