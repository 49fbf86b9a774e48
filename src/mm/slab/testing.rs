//! Fixtures dos testes do kmalloc no host
//!
//! - `TestRegion`: memória real alinhada a SLAB_SIZE, liberada no Drop
//! - `RecordingMapper`: `PageMapper` que apenas registra as páginas pedidas

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::klib::align_down;
use crate::mm::config::{PAGE_SIZE, SLAB_SIZE};
use crate::mm::error::MmResult;
use crate::mm::mapper::{MapFlags, PageMapper};
use crate::mm::region::SlabRegion;

use super::SlabAllocator;

pub struct TestRegion {
    ptr: *mut u8,
    layout: Layout,
}

impl TestRegion {
    pub fn new(slabs: usize) -> Self {
        let layout = Layout::from_size_align(slabs * SLAB_SIZE, SLAB_SIZE).unwrap();
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null());
        Self { ptr, layout }
    }

    pub fn start(&self) -> usize {
        self.ptr as usize
    }

    pub fn end(&self) -> usize {
        self.start() + self.layout.size()
    }
}

impl Drop for TestRegion {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

// SAFETY: a memória é só um bloco de bytes; os testes coordenam o acesso
unsafe impl Send for TestRegion {}
unsafe impl Sync for TestRegion {}

pub struct RecordingMapper {
    zeroed: AtomicUsize,
    noclear: AtomicUsize,
    pages: Mutex<HashSet<usize>>,
}

impl RecordingMapper {
    pub fn new() -> Self {
        Self {
            zeroed: AtomicUsize::new(0),
            noclear: AtomicUsize::new(0),
            pages: Mutex::new(HashSet::new()),
        }
    }

    /// Chamadas com a variante que zera
    pub fn zeroed_maps(&self) -> usize {
        self.zeroed.load(Ordering::Relaxed)
    }

    /// Chamadas com NO_CLEAR
    pub fn noclear_maps(&self) -> usize {
        self.noclear.load(Ordering::Relaxed)
    }

    pub fn is_mapped(&self, addr: usize) -> bool {
        self.pages
            .lock()
            .unwrap()
            .contains(&align_down(addr, PAGE_SIZE))
    }
}

impl PageMapper for RecordingMapper {
    fn map_if_not_mapped(&self, addr: usize, flags: MapFlags) -> MmResult<()> {
        if flags.contains(MapFlags::NO_CLEAR) {
            self.noclear.fetch_add(1, Ordering::Relaxed);
        } else {
            self.zeroed.fetch_add(1, Ordering::Relaxed);
        }
        self.pages.lock().unwrap().insert(align_down(addr, PAGE_SIZE));
        Ok(())
    }
}

pub type TestAllocator = SlabAllocator<SlabRegion, RecordingMapper>;

/// Alocador sobre `slabs` blocos (um deles vai para o índice da região)
pub fn allocator(slabs: usize) -> (TestRegion, TestAllocator) {
    let backing = TestRegion::new(slabs);
    let slab = unsafe {
        SlabAllocator::initialize(backing.start(), backing.end(), RecordingMapper::new())
    }
    .unwrap();
    (backing, slab)
}
