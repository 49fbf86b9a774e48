//! # Slab Allocator (kmalloc)
//!
//! Alocador de objetos do kernel. Pedidos são normalizados para uma
//! size-class; cada size-class tem um `Cache`; cada Cache tem slabs de
//! `SLAB_SIZE` bytes vindos do alocador de região.
//!
//! ## Fluxo
//!
//! ```text
//! allocate(size) -> size-class -> diretório -> Cache -> slab (parcial > vazio > novo)
//!                -> sub-alocador do slab -> mapeia páginas -> ponteiro
//! free(ptr)      -> ptr & SLAB_MASK -> magic -> sub-alocador -> transição de lista
//! ```
//!
//! ## Bootstrap
//!
//! Os `Cache` são objetos do próprio kmalloc, servidos pelo cache-de-caches.
//! Na inicialização o primeiro slab do cache-de-caches é formatado direto
//! sobre a região, o primeiro objeto dele recebe o próprio Cache e o
//! diretório é semeado. Dali em diante todo Cache novo, inclusive slabs
//! novos do cache-de-caches, passa pelo caminho normal.
//!
//! ## Hierarquia de Locks
//!
//! ```text
//! diretório -> Cache -> (região | slab)
//! ```
//!
//! Nenhum lock é segurado durante algo que bloqueie. Proibido chamar de
//! contexto de interrupção.
//!
//! ## Erros
//!
//! Não há caminho de erro para o chamador: tamanho zero, tamanho grande
//! demais, região esgotada, free inválido e corrupção derrubam o kernel
//! (`mm::error::fatal`).

pub mod cache;
pub mod directory;
pub mod guard;
pub mod list;
pub mod report;
pub mod size_class;
#[allow(clippy::module_inception)]
pub mod slab;
pub mod stats;

#[cfg(test)]
pub mod testing;

use core::mem::size_of;
use core::ptr::NonNull;

use crate::klib::is_aligned;
use crate::mm::config::{granule_align, GUARD_ENABLED, SLAB_SIZE};
use crate::mm::error::{fatal, MmError, MmResult, SlabFault};
use crate::mm::mapper::PageMapper;
use crate::mm::region::{RegionAllocator, SlabRegion};

pub use cache::{Cache, ListCounts};
pub use directory::CacheDirectory;
pub use report::{CacheLine, SlabReport};
pub use slab::{Slab, SlabState};
pub use stats::{SlabStats, StatsSnapshot};

/// Size-class do cache-de-caches
pub const CACHE_OBJECT_SIZE: usize = granule_align(size_of::<Cache>());

/// Estado de um slab visto por um objeto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabInfo {
    pub object_size: usize,
    pub count: usize,
    pub max: usize,
    pub state: Option<SlabState>,
}

/// Contexto do alocador de objetos.
///
/// Criado uma vez antes do SMP e nunca destruído.
pub struct SlabAllocator<R: RegionAllocator, M: PageMapper> {
    region: R,
    mapper: M,
    /// Mora no primeiro objeto do seu próprio slab
    cache_cache: NonNull<Cache>,
    directory: CacheDirectory,
    stats: SlabStats,
}

// SAFETY: todo estado compartilhado (listas, sub-alocadores, diretório) fica
// atrás de spinlocks ou atômicos; `cache_cache` aponta para memória da região
// que nunca é liberada.
unsafe impl<R: RegionAllocator + Send, M: PageMapper + Send> Send for SlabAllocator<R, M> {}
unsafe impl<R: RegionAllocator, M: PageMapper> Sync for SlabAllocator<R, M> {}

impl<M: PageMapper> SlabAllocator<SlabRegion, M> {
    /// Inicializa o kmalloc sobre `[start, end)`.
    ///
    /// O intervalo é ajustado para múltiplos de SLAB_SIZE; o primeiro slab
    /// guarda o índice da região.
    ///
    /// # Safety
    ///
    /// A faixa deve ser memória virtual exclusiva do kmalloc, mapeável por
    /// `mapper`.
    pub unsafe fn initialize(start: usize, end: usize, mapper: M) -> MmResult<Self> {
        crate::kinfo!("(Slab) Inicializando kmalloc start=", start);
        let region = SlabRegion::new(start, end, &mapper)?;
        Self::with_region(region, mapper)
    }
}

impl<R: RegionAllocator, M: PageMapper> SlabAllocator<R, M> {
    /// Monta o alocador sobre um alocador de região já pronto (bootstrap).
    ///
    /// # Safety
    ///
    /// Toda região devolvida por `region` deve ser memória exclusiva do
    /// kmalloc, mapeável por `mapper`.
    pub unsafe fn with_region(region: R, mapper: M) -> MmResult<Self> {
        if region.unit_size() != SLAB_SIZE {
            return Err(MmError::InvalidParameter);
        }

        let stats = SlabStats::new();
        let directory = CacheDirectory::new();

        // Fase 1: primeiro slab do cache-de-caches, direto na região
        let first = region.reserve(1)?;
        if !is_aligned(first.start, SLAB_SIZE) {
            return Err(MmError::InvalidAlignment);
        }
        let slab = Slab::create(first.start, NonNull::dangling(), CACHE_OBJECT_SIZE, &mapper)?;

        // O primeiro objeto vira o próprio cache-de-caches
        let object = slab.as_ref().carve(&mapper);
        let cache_cache = object as *mut Cache;
        cache_cache.write(Cache::new(CACHE_OBJECT_SIZE));
        let cache_cache = NonNull::new_unchecked(cache_cache);
        Slab::bind(slab, cache_cache);

        cache_cache.as_ref().adopt_bootstrap_slab(slab, &stats);
        stats.add_allocated(CACHE_OBJECT_SIZE);

        // Fase 2: a partir daqui Caches novos saem do caminho normal
        directory.register(CACHE_OBJECT_SIZE, cache_cache)?;

        crate::kinfo!("(Slab) cache-de-caches size=", CACHE_OBJECT_SIZE);
        crate::kok!("(Slab) kmalloc pronto");

        Ok(Self {
            region,
            mapper,
            cache_cache,
            directory,
            stats,
        })
    }

    /// Aloca `size` bytes. Nunca retorna nulo: falhas derrubam o kernel.
    ///
    /// O ponteiro é alinhado a `GUARANTEED_ALIGN`.
    pub fn allocate(&self, size: usize) -> NonNull<u8> {
        let class = size_class::normalize(size);
        let cache = self.select_cache(class);
        let object = self.allocate_from(cache);

        if GUARD_ENABLED {
            // SAFETY: objeto recém-recortado com class >= size + OVERHEAD
            unsafe { guard::arm(object, size) }
        } else {
            object
        }
    }

    /// Libera um ponteiro devolvido por `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` deve ter vindo deste alocador e não pode ser usado depois.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        let object = if GUARD_ENABLED {
            addr.wrapping_sub(guard::HEADER)
        } else {
            addr
        };

        let slab = Slab::containing(object).as_ref();
        if !slab.is_valid() {
            fatal(SlabFault::InvalidFree, addr);
        }
        if GUARD_ENABLED {
            guard::disarm(ptr);
        }

        let cache = slab.cache();
        slab.release(object);
        self.stats.sub_allocated(cache.object_size());
        cache.release_slot(slab, &self.stats);

        crate::ktrace!("(Slab) free ", addr);
    }

    /// Snapshot para diagnóstico
    pub fn report(&self) -> SlabReport {
        let mut report = SlabReport::new(
            self.region.units_used(),
            self.region.units_total(),
            self.stats.snapshot(),
            self.directory.load_percent(),
        );
        self.directory
            .for_each(|size, cache| report.push_cache(size, cache.slab_count()));
        report
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Contagens das listas do Cache da size-class, se ele existir
    pub fn cache_counts(&self, class: usize) -> Option<ListCounts> {
        let cache = self.directory.get(class)?;
        // SAFETY: caches registrados vivem para sempre
        Some(unsafe { cache.as_ref() }.counts())
    }

    /// Confere as listas de todos os Caches
    pub fn check_caches(&self) -> bool {
        let mut ok = true;
        self.directory.for_each(|_, cache| ok &= cache.check_lists());
        ok
    }

    /// Estado do slab dono de `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` deve ter vindo deste alocador e ainda estar vivo.
    pub unsafe fn slab_info(&self, ptr: NonNull<u8>) -> SlabInfo {
        let slab = Slab::containing(ptr.as_ptr() as usize).as_ref();
        if !slab.is_valid() {
            fatal(SlabFault::InvalidFree, ptr.as_ptr() as usize);
        }
        let cache = slab.cache();
        SlabInfo {
            object_size: cache.object_size(),
            count: slab.count(),
            max: slab.max(),
            state: cache.state_of(slab),
        }
    }

    pub fn cache_cache(&self) -> &Cache {
        // SAFETY: construído no bootstrap, nunca liberado
        unsafe { self.cache_cache.as_ref() }
    }

    fn select_cache(&self, class: usize) -> &Cache {
        let cache = self.directory.get_or_create(class, || {
            let object = self.allocate_from(self.cache_cache());
            let cache = object.cast::<Cache>();
            // SAFETY: objeto novo do cache-de-caches, alinhado a 64
            unsafe { cache.as_ptr().write(Cache::new(class)) };
            crate::kdebug!("(Slab) Novo cache size=", class);
            cache
        });

        match cache {
            // SAFETY: caches registrados vivem para sempre
            Ok(cache) => unsafe { cache.as_ref() },
            Err(err) => fatal(err.into(), class),
        }
    }

    fn allocate_from(&self, cache: &Cache) -> NonNull<u8> {
        let slab = cache.acquire_slot(&self.stats, || self.new_slab(cache));
        // SAFETY: slabs devolvidos pelo Cache são cabeçalhos válidos
        let object = unsafe { slab.as_ref() }.carve(&self.mapper);
        self.stats.add_allocated(cache.object_size());
        // SAFETY: objetos ficam depois do cabeçalho, nunca em 0
        unsafe { NonNull::new_unchecked(object as *mut u8) }
    }

    /// Chamado com o lock do Cache
    fn new_slab(&self, cache: &Cache) -> NonNull<Slab> {
        let region = match self.region.reserve(1) {
            Ok(region) => region,
            Err(err) => fatal(err.into(), cache.object_size()),
        };
        if !is_aligned(region.start, SLAB_SIZE) {
            fatal(SlabFault::MisalignedRegion, region.start);
        }

        let owner = NonNull::from(cache);
        // SAFETY: bloco recém-reservado, exclusivo deste slab
        match unsafe { Slab::create(region.start, owner, cache.object_size(), &self.mapper) } {
            Ok(slab) => slab,
            Err(err) => fatal(err.into(), region.start),
        }
    }
}
