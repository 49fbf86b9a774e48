//! # Synchronization Primitives
//!
//! Primitivas de sincronização usadas pelo alocador de objetos.
//!
//! ## Hierarquia de Locks do kmalloc
//!
//! ```text
//! Diretório de caches  → serializa criação de caches
//!   └─ Lock do Cache   → listas empty/partial/full e transições
//!        ├─ Lock da Região → reserva de slabs novos
//!        └─ Lock do Slab   → sub-alocador interno + mapeamento lazy
//! ```
//!
//! ## Regras
//!
//! - **Spinlock**: seções curtas, nunca atravessam algo que bloqueie
//! - **Ordem de Lock**: sempre de cima para baixo na hierarquia acima;
//!   o lock do slab nunca é mantido enquanto se adquire o do cache

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

pub use spinlock::{Spinlock, SpinlockGuard};
