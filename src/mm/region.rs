//! # Alocador de Região
//!
//! Fonte de blocos de tamanho `SLAB_SIZE` para o kmalloc. O kmalloc pede
//! exatamente um bloco por slab e nunca devolve nenhum.

use crate::klib::{align_down, align_up};
use crate::mm::config::SLAB_SIZE;
use crate::mm::error::{MmError, MmResult};
use crate::mm::mapper::{pages, PageMapper};
use crate::mm::valloc::{Region, Valloc};
use crate::sync::Spinlock;

/// Colaborador que reserva faixas alinhadas de memória virtual
pub trait RegionAllocator: Sync {
    /// Reserva `count` unidades contíguas
    fn reserve(&self, count: usize) -> MmResult<Region>;

    /// Devolve unidades. O kmalloc não chama isso: slabs vivem para sempre.
    fn release(&self, region: Region) -> MmResult<()>;

    /// Tamanho de uma unidade em bytes
    fn unit_size(&self) -> usize;

    fn units_used(&self) -> usize;

    fn units_total(&self) -> usize;
}

/// Região de slabs: um `Valloc` com unidade e alinhamento `SLAB_SIZE`.
///
/// O índice ocupa o primeiro slab da região.
pub struct SlabRegion {
    inner: Spinlock<Valloc>,
}

impl SlabRegion {
    /// Cria a região sobre `[start, end)`, ajustada para múltiplos de SLAB_SIZE.
    ///
    /// As páginas do índice são mapeadas (zeradas) via `mapper`.
    ///
    /// # Safety
    ///
    /// A faixa deve ser memória virtual reservada ao kmalloc, sem outro dono.
    pub unsafe fn new<M: PageMapper>(start: usize, end: usize, mapper: &M) -> MmResult<Self> {
        let start = align_up(start, SLAB_SIZE);
        let end = align_down(end, SLAB_SIZE);
        if end <= start {
            return Err(MmError::RegionTooSmall);
        }

        let index_end = Valloc::index_end(start, end, SLAB_SIZE);
        for page in pages(start, index_end - start) {
            mapper.map_zeroed(page)?;
        }

        let valloc = Valloc::create(start, end, SLAB_SIZE, SLAB_SIZE)?;
        crate::kinfo!("(Slab) Região base=", valloc.base());
        crate::kinfo!("(Slab) Região slabs=", valloc.npages());

        Ok(Self {
            inner: Spinlock::new(valloc),
        })
    }
}

impl RegionAllocator for SlabRegion {
    fn reserve(&self, count: usize) -> MmResult<Region> {
        self.inner.lock().allocate(count).ok_or(MmError::OutOfMemory)
    }

    fn release(&self, region: Region) -> MmResult<()> {
        self.inner.lock().deallocate(region)
    }

    fn unit_size(&self) -> usize {
        SLAB_SIZE
    }

    fn units_used(&self) -> usize {
        self.inner.lock().count_used()
    }

    fn units_total(&self) -> usize {
        self.inner.lock().npages()
    }
}
