//! # Estatísticas do kmalloc
//!
//! Contadores globais consultivos. Nenhuma decisão do alocador depende
//! deles; são atualizados dentro das mesmas seções críticas que movem slabs
//! entre listas, então um snapshot em repouso é consistente.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::slab::SlabState;

pub struct SlabStats {
    full: AtomicUsize,
    partial: AtomicUsize,
    empty: AtomicUsize,
    total_allocated: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub full_slabs: usize,
    pub partial_slabs: usize,
    pub empty_slabs: usize,
    pub total_allocated: usize,
}

impl StatsSnapshot {
    pub fn total_slabs(&self) -> usize {
        self.full_slabs + self.partial_slabs + self.empty_slabs
    }
}

impl SlabStats {
    pub const fn new() -> Self {
        Self {
            full: AtomicUsize::new(0),
            partial: AtomicUsize::new(0),
            empty: AtomicUsize::new(0),
            total_allocated: AtomicUsize::new(0),
        }
    }

    fn counter(&self, state: SlabState) -> &AtomicUsize {
        match state {
            SlabState::Empty => &self.empty,
            SlabState::Partial => &self.partial,
            SlabState::Full => &self.full,
        }
    }

    /// Registra a entrada de um slab em `to`, vindo de `from` (None = novo).
    pub fn record_move(&self, from: Option<SlabState>, to: SlabState) {
        if let Some(from) = from {
            self.counter(from).fetch_sub(1, Ordering::Relaxed);
        }
        self.counter(to).fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_allocated(&self, bytes: usize) {
        self.total_allocated.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn sub_allocated(&self, bytes: usize) {
        self.total_allocated.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            full_slabs: self.full.load(Ordering::Relaxed),
            partial_slabs: self.partial.load(Ordering::Relaxed),
            empty_slabs: self.empty.load(Ordering::Relaxed),
            total_allocated: self.total_allocated.load(Ordering::Relaxed),
        }
    }
}

impl Default for SlabStats {
    fn default() -> Self {
        Self::new()
    }
}
