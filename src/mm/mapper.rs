//! # Serviço de Mapeamento de Páginas
//!
//! O kmalloc reserva endereços virtuais; a memória física por trás deles é
//! mapeada sob demanda através deste colaborador. O VMM do kernel implementa
//! `PageMapper`.

use bitflags::bitflags;

use crate::klib::align_down;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::MmResult;

bitflags! {
    /// Flags de mapeamento pedidas pelo kmalloc.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        /// Página gravável
        const WRITABLE = 1 << 0;
        /// Não zerar o frame novo (caminho rápido de alocação)
        const NO_CLEAR = 1 << 1;
    }
}

/// Mapeia páginas sob demanda.
pub trait PageMapper: Sync {
    /// Garante que a página que contém `addr` está mapeada.
    ///
    /// Idempotente: página já mapeada não é alterada. Sem `NO_CLEAR`, um
    /// frame novo é entregue zerado.
    fn map_if_not_mapped(&self, addr: usize, flags: MapFlags) -> MmResult<()>;

    /// Variante que zera o frame novo
    fn map_zeroed(&self, addr: usize) -> MmResult<()> {
        self.map_if_not_mapped(addr, MapFlags::WRITABLE)
    }

    /// Variante rápida, sem zerar
    fn map_noclear(&self, addr: usize) -> MmResult<()> {
        self.map_if_not_mapped(addr, MapFlags::WRITABLE | MapFlags::NO_CLEAR)
    }
}

impl<T: PageMapper + ?Sized> PageMapper for &T {
    fn map_if_not_mapped(&self, addr: usize, flags: MapFlags) -> MmResult<()> {
        (**self).map_if_not_mapped(addr, flags)
    }
}

/// Páginas tocadas por `[start, start + len)`, em ordem.
pub fn pages(start: usize, len: usize) -> impl Iterator<Item = usize> {
    let first = align_down(start, PAGE_SIZE);
    let end = if len == 0 { first } else { start + len };
    (first..end).step_by(PAGE_SIZE)
}
