//! # Memory Management: Alocador de Objetos (kmalloc)
//!
//! Alocador de objetos do kernel Forge, o análogo de `malloc` dentro do
//! kernel. Caches de objetos de tamanho fixo recortados de slabs de
//! `SLAB_SIZE` bytes.
//!
//! ## 🏗️ Arquitetura dos Módulos
//!
//! | Módulo     | Responsabilidade |
//! |------------|------------------|
//! | `config`   | Constantes de layout (SLAB_SIZE, magic, guardas). |
//! | `error`    | `MmError` dos colaboradores e `SlabFault` fatais. |
//! | `valloc`   | Sub-alocador de unidades fixas com índice em bitmap. |
//! | `region`   | Alocador de região: um bloco alinhado por slab. |
//! | `mapper`   | Contrato com o VMM para mapear páginas sob demanda. |
//! | `slab`     | Slabs, Caches, diretório, guardas e relatório. |
//! | `kmalloc`  | Instância do kernel, `kmalloc`/`kfree` e `GlobalAlloc`. |
//!
//! ## Ordem de Inicialização
//!
//! 1. VMM pronto (implementa `PageMapper`)
//! 2. `kmalloc::init(start, end, mapper)`: região + bootstrap do cache-de-caches
//! 3. SMP e o resto do kernel
//!
//! ## ⚠️ Regras
//!
//! - Nada de `kfree` em contexto de interrupção.
//! - Slabs nunca voltam para a região. Memória do kmalloc só cresce.
//! - Não há OOM recuperável: esgotar a região derruba o kernel.

pub mod config;
pub mod error;
pub mod kmalloc;
pub mod mapper;
pub mod region;
pub mod slab;
pub mod valloc;

#[cfg(any(test, feature = "self_test"))]
pub mod test;

pub use error::{MmError, MmResult, SlabFault};
pub use kmalloc::{kfree, kmalloc, kmalloc_report, KmallocHeap};
pub use mapper::{MapFlags, PageMapper};
pub use region::{RegionAllocator, SlabRegion};
pub use slab::{SlabAllocator, SlabReport};
