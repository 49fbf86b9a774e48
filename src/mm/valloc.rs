//! # Valloc - sub-alocador de unidades fixas
//!
//! Divide um intervalo `[start, end)` em unidades de tamanho fixo e controla
//! a ocupação com um bitmap gravado NO PRÓPRIO intervalo, logo no início.
//!
//! ```text
//! start                base = align_up(índice, align)            end
//! | índice (bitmap) | pad | unidade 0 | unidade 1 | ... | unidade n-1 |
//! ```
//!
//! O espaço consumido pelo índice (em unidades) é reportado em `nindex`.
//!
//! Dois usos no kmalloc:
//! - região de slabs: unidade = SLAB_SIZE, alinhamento = SLAB_SIZE
//! - interior de cada slab: unidade = tamanho do objeto
//!
//! # Segurança
//!
//! As páginas do índice precisam estar mapeadas antes de `create`
//! (ver [`Valloc::index_end`]). As unidades em si nunca são tocadas.

use crate::klib::bitmap::Bitmap;
use crate::klib::align_up;
use crate::mm::error::{MmError, MmResult};

/// Faixa contígua de unidades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub count: usize,
}

pub struct Valloc {
    /// Endereço do bitmap (alinhado a 8)
    index: usize,
    /// Palavras de 64 bits do bitmap
    words: usize,
    /// Endereço da primeira unidade
    base: usize,
    unit: usize,
    npages: usize,
    nindex: usize,
}

impl Valloc {
    /// Fim (exclusivo) do índice que `create` gravará para estes parâmetros.
    pub const fn index_end(start: usize, end: usize, unit: usize) -> usize {
        let index = align_up(start, 8);
        let bits = (end - start) / unit;
        index + bits.div_ceil(64) * 8
    }

    /// Cria o sub-alocador sobre `[start, end)`.
    ///
    /// # Safety
    ///
    /// `[start, index_end)` deve estar mapeado, gravável e sem outro dono.
    pub unsafe fn create(start: usize, end: usize, unit: usize, align: usize) -> MmResult<Self> {
        if unit == 0 || !align.is_power_of_two() || end <= start {
            return Err(MmError::InvalidParameter);
        }

        let index = align_up(start, 8);
        let index_end = Self::index_end(start, end, unit);
        let words = (index_end - index) / 8;
        let base = align_up(index_end, align);
        if base >= end || (end - base) < unit {
            return Err(MmError::RegionTooSmall);
        }

        let npages = (end - base) / unit;
        let nindex = (end - start) / unit - npages;

        let mut valloc = Self {
            index,
            words,
            base,
            unit,
            npages,
            nindex,
        };
        valloc.bitmap().clear_all();

        crate::ktrace!("(Valloc) create base=", base);
        crate::ktrace!("(Valloc) create npages=", npages);
        Ok(valloc)
    }

    fn bitmap(&mut self) -> Bitmap<'_> {
        // SAFETY: o índice foi reservado em `create` e pertence a este Valloc
        let words = unsafe { core::slice::from_raw_parts_mut(self.index as *mut u64, self.words) };
        Bitmap::new(words, self.npages)
    }

    fn words(&self) -> &[u64] {
        // SAFETY: idem `bitmap`
        unsafe { core::slice::from_raw_parts(self.index as *const u64, self.words) }
    }

    /// Reserva `count` unidades contíguas (first-fit)
    pub fn allocate(&mut self, count: usize) -> Option<Region> {
        let base = self.base;
        let unit = self.unit;
        let mut bitmap = self.bitmap();
        let first = bitmap.find_zero_run(count, 0)?;
        for bit in first..first + count {
            bitmap.set(bit);
        }
        Some(Region {
            start: base + first * unit,
            count,
        })
    }

    /// Devolve unidades. Falha se alguma delas já estava livre.
    pub fn deallocate(&mut self, region: Region) -> MmResult<()> {
        if !self.contains(region.start) || region.count == 0 {
            return Err(MmError::InvalidAddress);
        }
        let offset = region.start - self.base;
        if offset % self.unit != 0 {
            return Err(MmError::InvalidAlignment);
        }

        let first = offset / self.unit;
        if first + region.count > self.npages {
            return Err(MmError::InvalidAddress);
        }

        let mut bitmap = self.bitmap();
        if (first..first + region.count).any(|bit| !bitmap.test(bit)) {
            return Err(MmError::DoubleFree);
        }
        for bit in first..first + region.count {
            bitmap.clear(bit);
        }
        Ok(())
    }

    /// Unidades ocupadas
    pub fn count_used(&self) -> usize {
        self.words().iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Unidades utilizáveis
    pub fn npages(&self) -> usize {
        self.npages
    }

    /// Unidades perdidas para o índice
    pub fn nindex(&self) -> usize {
        self.nindex
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base + self.npages * self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Memória de teste alinhada a 64
    #[repr(C, align(64))]
    struct Arena([u8; 8192]);

    #[test]
    fn test_layout_and_allocate() {
        let mut arena = Box::new(Arena([0xFF; 8192]));
        let start = arena.0.as_mut_ptr() as usize;
        let end = start + 8192;

        let mut v = unsafe { Valloc::create(start, end, 64, 64) }.unwrap();
        // 128 bits -> 16 bytes de índice -> base na unidade 1
        assert_eq!(v.base(), start + 64);
        assert_eq!(v.npages(), 127);
        assert_eq!(v.nindex(), 1);
        assert_eq!(v.count_used(), 0);

        let a = v.allocate(1).unwrap();
        let b = v.allocate(1).unwrap();
        assert_eq!(a.start, start + 64);
        assert_eq!(b.start, start + 128);
        assert_eq!(v.count_used(), 2);

        v.deallocate(a).unwrap();
        assert_eq!(v.allocate(1).unwrap().start, a.start);
    }

    #[test]
    fn test_contiguous_and_exhaustion() {
        let mut arena = Box::new(Arena([0; 8192]));
        let start = arena.0.as_mut_ptr() as usize;
        let mut v = unsafe { Valloc::create(start, start + 8192, 1024, 1024) }.unwrap();
        assert_eq!(v.npages(), 7);

        let run = v.allocate(3).unwrap();
        assert_eq!(run.count, 3);
        assert!(v.allocate(5).is_none());
        assert!(v.allocate(4).is_some());
        assert!(v.allocate(1).is_none());
    }

    #[test]
    fn test_double_free_and_foreign_address() {
        let mut arena = Box::new(Arena([0; 8192]));
        let start = arena.0.as_mut_ptr() as usize;
        let mut v = unsafe { Valloc::create(start, start + 8192, 256, 64) }.unwrap();

        let r = v.allocate(1).unwrap();
        assert_eq!(v.deallocate(r), Ok(()));
        assert_eq!(v.deallocate(r), Err(MmError::DoubleFree));
        assert_eq!(
            v.deallocate(Region { start: start + 8192, count: 1 }),
            Err(MmError::InvalidAddress)
        );
        assert_eq!(
            v.deallocate(Region { start: r.start + 8, count: 1 }),
            Err(MmError::InvalidAlignment)
        );
    }

    #[test]
    fn test_region_too_small() {
        let mut arena = Box::new(Arena([0; 8192]));
        let start = arena.0.as_mut_ptr() as usize;
        assert!(matches!(
            unsafe { Valloc::create(start, start + 8192, 8192, 64) },
            Err(MmError::RegionTooSmall)
        ));
        assert!(matches!(
            unsafe { Valloc::create(start, start + 8192, 0, 64) },
            Err(MmError::InvalidParameter)
        ));
    }
}
