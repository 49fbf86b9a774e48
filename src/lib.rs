//! Forge Slab: alocador de objetos do kernel Forge.
//!
//! Ponto central de exportação dos módulos do kmalloc.
//! O kernel fornece o VMM (`mm::PageMapper`) e, opcionalmente, um sink de
//! log (`logging::install_sink`); todo o resto vive aqui.

#![cfg_attr(not(test), no_std)]

// --- Infraestrutura (macros de log primeiro para ficarem visíveis) ---
#[macro_use]
pub mod logging;
pub mod klib; // Utilitários Internos (Bitmaps, Hash, Alinhamento)
pub mod sync; // Primitivas de Sincronização (Spinlock)

// --- Alocador ---
pub mod mm; // kmalloc, slabs, caches

pub use mm::kmalloc::{kfree, kmalloc, kmalloc_report, KmallocHeap};
