//! # Slab
//!
//! Bloco de `SLAB_SIZE` bytes alinhado a `SLAB_SIZE`, com o cabeçalho no
//! início e objetos de tamanho fixo depois do índice do sub-alocador.
//!
//! ```text
//! base (múltiplo de SLAB_SIZE)
//! | Slab | índice Valloc | pad | obj 0 | obj 1 | ... | obj max-1 |
//! ```
//!
//! O dono de qualquer objeto é recuperado mascarando o endereço com
//! `SLAB_MASK`. Slabs nunca são destruídos.
//!
//! ## Locks
//!
//! - `objects` (lock do slab): sub-alocador e mapeamento das páginas dos objetos
//! - `node` e as escritas de `count`: protegidos pelo lock do Cache dono

use core::cell::UnsafeCell;
use core::mem::size_of;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::mm::config::{OBJECT_GRANULE, SLAB_MAGIC, SLAB_MASK, SLAB_SIZE};
use crate::mm::error::{fatal, MmError, MmResult, SlabFault};
use crate::mm::mapper::{pages, PageMapper};
use crate::mm::valloc::{Region, Valloc};
use crate::sync::Spinlock;

use super::cache::Cache;

/// Lista em que o slab está
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabState {
    Empty,
    Partial,
    Full,
}

/// Ligação do slab na lista do Cache
pub(super) struct SlabNode {
    pub prev: Option<NonNull<Slab>>,
    pub next: Option<NonNull<Slab>>,
    /// None enquanto o slab não está em nenhuma lista
    pub state: Option<SlabState>,
}

#[repr(C)]
pub struct Slab {
    magic: u32,
    cache: NonNull<Cache>,
    max: usize,
    count: AtomicUsize,
    objects: Spinlock<Valloc>,
    node: UnsafeCell<SlabNode>,
}

/// Bytes do cabeçalho no início do slab
pub const HEADER_SIZE: usize = size_of::<Slab>();

impl Slab {
    /// Formata um slab novo em `base`.
    ///
    /// As páginas do cabeçalho e do índice são mapeadas zeradas e limpas.
    ///
    /// # Safety
    ///
    /// `base` deve ser um bloco de SLAB_SIZE, alinhado, reservado para este
    /// slab. `cache` pode ser provisório (ver [`Slab::bind`]).
    pub unsafe fn create<M: PageMapper + ?Sized>(
        base: usize,
        cache: NonNull<Cache>,
        object_size: usize,
        mapper: &M,
    ) -> MmResult<NonNull<Slab>> {
        if base & !SLAB_MASK != 0 {
            return Err(MmError::InvalidAlignment);
        }

        let end = base + SLAB_SIZE;
        let index_end = Valloc::index_end(base + HEADER_SIZE, end, object_size);
        for page in pages(base, index_end - base) {
            mapper.map_zeroed(page)?;
        }
        core::ptr::write_bytes(base as *mut u8, 0, index_end - base);

        let objects = Valloc::create(base + HEADER_SIZE, end, object_size, OBJECT_GRANULE)?;
        let max = objects.npages();
        if max <= 2 {
            return Err(MmError::RegionTooSmall);
        }

        let slab = base as *mut Slab;
        slab.write(Slab {
            magic: SLAB_MAGIC,
            cache,
            max,
            count: AtomicUsize::new(0),
            objects: Spinlock::new(objects),
            node: UnsafeCell::new(SlabNode {
                prev: None,
                next: None,
                state: None,
            }),
        });

        crate::kdebug!("(Slab) Novo slab em ", base);
        crate::ktrace!("(Slab) max=", max);
        Ok(NonNull::new_unchecked(slab))
    }

    /// Liga o slab ao Cache dono.
    ///
    /// # Safety
    ///
    /// Apenas durante o bootstrap, antes do slab ser visível a outra CPU.
    pub unsafe fn bind(slab: NonNull<Slab>, cache: NonNull<Cache>) {
        (*slab.as_ptr()).cache = cache;
    }

    /// Cabeçalho do slab que contém `addr`
    #[inline]
    pub fn containing(addr: usize) -> NonNull<Slab> {
        // SAFETY: o endereço nunca é nulo para objetos vindos do kmalloc;
        // o chamador valida o magic antes de usar o cabeçalho.
        unsafe { NonNull::new_unchecked((addr & SLAB_MASK) as *mut Slab) }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == SLAB_MAGIC
    }

    pub fn base(&self) -> usize {
        self as *const Slab as usize
    }

    pub fn cache(&self) -> &Cache {
        // SAFETY: Caches vivem até o fim do kernel
        unsafe { self.cache.as_ref() }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Objetos reservados (leitura sem lock, apenas diagnóstico)
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Reserva uma vaga. Chamado com o lock do Cache.
    pub(super) fn take_slot(&self) -> usize {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if count > self.max {
            fatal(SlabFault::CountOutOfRange, count);
        }
        count
    }

    /// Devolve uma vaga. Chamado com o lock do Cache.
    pub(super) fn put_slot(&self) -> usize {
        let previous = self.count.fetch_sub(1, Ordering::Relaxed);
        if previous == 0 || previous > self.max {
            fatal(SlabFault::CountOutOfRange, previous);
        }
        previous - 1
    }

    pub(super) fn node(&self) -> *mut SlabNode {
        self.node.get()
    }

    /// Estado atual. Exige o lock do Cache.
    pub(super) fn state(&self) -> Option<SlabState> {
        // SAFETY: o chamador segura o lock do Cache dono
        unsafe { (*self.node.get()).state }
    }

    /// Recorta um objeto e mapeia suas páginas.
    ///
    /// A vaga já foi reservada com `take_slot`, então o sub-alocador sempre
    /// tem uma unidade livre aqui.
    pub fn carve<M: PageMapper + ?Sized>(&self, mapper: &M) -> usize {
        let mut objects = self.objects.lock();
        let object_size = objects.unit();
        let region = match objects.allocate(1) {
            Some(region) => region,
            None => fatal(SlabFault::CountOutOfRange, self.base()),
        };

        // Objetos vizinhos dividem páginas: mapear sob o lock do slab
        for page in pages(region.start, object_size) {
            if mapper.map_noclear(page).is_err() {
                fatal(SlabFault::MappingFailed, page);
            }
        }

        region.start
    }

    /// Devolve o objeto em `addr` ao sub-alocador.
    pub fn release(&self, addr: usize) {
        let result = self.objects.lock().deallocate(Region {
            start: addr,
            count: 1,
        });
        match result {
            Ok(()) => {}
            Err(MmError::DoubleFree) => fatal(SlabFault::DoubleFree, addr),
            Err(_) => fatal(SlabFault::NotAnObject, addr),
        }
    }

    /// Objetos efetivamente recortados no sub-alocador
    pub fn carved(&self) -> usize {
        self.objects.lock().count_used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::config::PAGE_SIZE;
    use crate::mm::slab::testing::{RecordingMapper, TestRegion};

    fn make_slab(backing: &TestRegion, object_size: usize) -> NonNull<Slab> {
        let mapper = RecordingMapper::new();
        unsafe { Slab::create(backing.start(), NonNull::dangling(), object_size, &mapper) }
            .unwrap()
    }

    #[test]
    fn test_header_fits_first_page() {
        assert!(HEADER_SIZE < 256);
        assert_eq!(HEADER_SIZE % 8, 0);
    }

    #[test]
    fn test_capacity() {
        let backing = TestRegion::new(1);
        let slab = unsafe { make_slab(&backing, 64).as_ref() };
        assert!(slab.is_valid());
        // Cabeçalho + índice custam algumas unidades de 64 bytes
        assert!(slab.max() > 4000 && slab.max() < SLAB_SIZE / 64);

        let backing = TestRegion::new(1);
        let slab = unsafe { make_slab(&backing, SLAB_SIZE / 4).as_ref() };
        assert_eq!(slab.max(), 3);
    }

    #[test]
    fn test_carve_and_mask() {
        let backing = TestRegion::new(1);
        let mapper = RecordingMapper::new();
        let slab = unsafe { make_slab(&backing, 128).as_ref() };

        slab.take_slot();
        let a = slab.carve(&mapper);
        slab.take_slot();
        let b = slab.carve(&mapper);

        assert_ne!(a, b);
        assert!(b >= a + 128 || a >= b + 128);
        assert_eq!(a % OBJECT_GRANULE, 0);
        assert_eq!(Slab::containing(a).as_ptr() as usize, backing.start());
        assert_eq!(Slab::containing(b + 127).as_ptr() as usize, backing.start());
        assert!(mapper.is_mapped(a));
        assert_eq!(slab.carved(), 2);

        slab.release(a);
        assert_eq!(slab.put_slot(), 1);
        assert_eq!(slab.carved(), 1);
    }

    #[test]
    fn test_misaligned_base_rejected() {
        let backing = TestRegion::new(1);
        let mapper = RecordingMapper::new();
        let result =
            unsafe { Slab::create(backing.start() + 64, NonNull::dangling(), 64, &mapper) };
        assert!(matches!(result, Err(MmError::InvalidAlignment)));
    }

    #[test]
    #[should_panic(expected = "kfree: double free")]
    fn test_double_release_is_fatal() {
        let backing = TestRegion::new(1);
        let mapper = RecordingMapper::new();
        let slab = unsafe { make_slab(&backing, 64).as_ref() };
        slab.take_slot();
        let a = slab.carve(&mapper);
        slab.release(a);
        slab.release(a);
    }

    #[test]
    #[should_panic(expected = "kfree: ponteiro não é início de objeto")]
    fn test_release_inside_header_is_fatal() {
        let backing = TestRegion::new(1);
        let slab = unsafe { make_slab(&backing, 64).as_ref() };
        slab.release(backing.start() + 8);
    }

    #[test]
    #[should_panic(expected = "kfree: ponteiro não é início de objeto")]
    fn test_release_interior_pointer_is_fatal() {
        let backing = TestRegion::new(1);
        let mapper = RecordingMapper::new();
        let slab = unsafe { make_slab(&backing, 128).as_ref() };
        slab.take_slot();
        let a = slab.carve(&mapper);
        slab.release(a + 64);
    }

    #[test]
    fn test_carve_maps_without_clearing() {
        let backing = TestRegion::new(1);
        let mapper = RecordingMapper::new();
        let slab = unsafe { make_slab(&backing, 2 * PAGE_SIZE).as_ref() };
        slab.take_slot();
        let a = slab.carve(&mapper);
        // Só a variante rápida: o objeto não precisa vir zerado
        assert_eq!(mapper.noclear_maps(), pages(a, 2 * PAGE_SIZE).count());
        assert_eq!(mapper.zeroed_maps(), 0);
        assert!(mapper.is_mapped(a));
        assert!(mapper.is_mapped(a + 2 * PAGE_SIZE - 1));
    }
}
