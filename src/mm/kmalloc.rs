//! # kmalloc - porta de entrada do kernel
//!
//! Instância única do `SlabAllocator`, criada no early-boot antes do SMP.
//! O resto do kernel usa apenas:
//!
//! - `init(start, end, mapper)` - uma vez
//! - `kmalloc(size)` / `kfree(ptr)`
//! - `kmalloc_report()` - para o arquivo de diagnóstico do VFS
//!
//! `KmallocHeap` adapta o kmalloc a `GlobalAlloc` para o crate `alloc`.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;

use crate::mm::config::{GUARANTEED_ALIGN, MAX_OBJECT_SIZE};
use crate::mm::error::MmResult;
use crate::mm::mapper::PageMapper;
use crate::mm::region::SlabRegion;
use crate::mm::slab::{SlabAllocator, SlabReport};

/// Alocador do kernel: região de slabs + VMM do kernel
pub type KernelSlab = SlabAllocator<SlabRegion, &'static dyn PageMapper>;

static KERNEL_SLAB: spin::Once<KernelSlab> = spin::Once::new();

/// Inicializa o kmalloc sobre `[start, end)`.
///
/// Chamadas depois da primeira não têm efeito.
///
/// # Safety
///
/// Ver [`SlabAllocator::initialize`].
pub unsafe fn init(start: usize, end: usize, mapper: &'static dyn PageMapper) -> MmResult<()> {
    if KERNEL_SLAB.is_completed() {
        crate::kwarn!("(Slab) kmalloc já inicializado");
        return Ok(());
    }
    KERNEL_SLAB.try_call_once(|| SlabAllocator::initialize(start, end, mapper))?;
    Ok(())
}

/// Alocador global, se já inicializado
pub fn kernel_slab() -> Option<&'static KernelSlab> {
    KERNEL_SLAB.get()
}

fn slab() -> &'static KernelSlab {
    match KERNEL_SLAB.get() {
        Some(slab) => slab,
        None => panic!("kmalloc: usado antes de mm::kmalloc::init"),
    }
}

/// Aloca `size` bytes do heap do kernel. Nunca retorna nulo.
pub fn kmalloc(size: usize) -> NonNull<u8> {
    slab().allocate(size)
}

/// Libera memória do kmalloc.
///
/// # Safety
///
/// `ptr` deve ter vindo de `kmalloc` e não pode ser usado depois.
/// Proibido em contexto de interrupção.
pub unsafe fn kfree(ptr: NonNull<u8>) {
    slab().free(ptr)
}

/// Relatório de diagnóstico
pub fn kmalloc_report() -> Option<SlabReport> {
    KERNEL_SLAB.get().map(|slab| slab.report())
}

/// Executa a suite de self-test sobre o kmalloc do kernel
#[cfg(feature = "self_test")]
pub fn self_test() -> bool {
    match KERNEL_SLAB.get() {
        Some(slab) => crate::mm::test::run_slab_tests(slab).all_passed(),
        None => false,
    }
}

/// Adaptador `GlobalAlloc`.
///
/// Diferente de `kmalloc`, devolve nulo para layouts que o kmalloc não
/// atende (alinhamento acima do garantido ou tamanho acima de SLAB_SIZE/4),
/// como o contrato de `GlobalAlloc` pede.
pub struct KmallocHeap;

impl KmallocHeap {
    fn fits(layout: &Layout) -> bool {
        layout.align() <= GUARANTEED_ALIGN && layout.size() <= MAX_OBJECT_SIZE
    }
}

unsafe impl GlobalAlloc for KmallocHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !Self::fits(&layout) {
            crate::kwarn!("(Slab) GlobalAlloc: layout recusado size=", layout.size());
            return core::ptr::null_mut();
        }
        match KERNEL_SLAB.get() {
            Some(slab) => slab.allocate(layout.size().max(1)).as_ptr(),
            None => core::ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            kfree(ptr);
        }
    }
}
