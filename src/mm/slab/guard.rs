//! # Guardas de Corrupção (kmalloc_canary)
//!
//! Layout de um objeto guardado:
//!
//! ```text
//! obj                     obj+16                 obj+16+size
//! | GUARD_HEAD | pad | size | payload ........... | GUARD_TAIL |
//! ```
//!
//! A guarda final é gravada desalinhada logo após o payload.
//! No free as duas guardas são conferidas, o objeto é sujado com
//! `SCRUB_BYTE` e as guardas zeradas.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::mm::config::{GUARD_HEAD, GUARD_TAIL, SCRUB_BYTE};
use crate::mm::error::{fatal, SlabFault};

#[repr(C)]
struct GuardHeader {
    head: u32,
    _pad: u32,
    size: usize,
}

/// Bytes antes do payload
pub const HEADER: usize = size_of::<GuardHeader>();

/// Custo total por objeto
pub const OVERHEAD: usize = HEADER + size_of::<u32>();

/// Arma as guardas em volta de `size` bytes e devolve o payload.
///
/// # Safety
///
/// `obj` deve apontar para um objeto recém-alocado de pelo menos
/// `size + OVERHEAD` bytes, alinhado a 8.
pub unsafe fn arm(obj: NonNull<u8>, size: usize) -> NonNull<u8> {
    let header = obj.as_ptr() as *mut GuardHeader;
    if (*header).head == GUARD_HEAD {
        fatal(SlabFault::GuardAlreadyArmed, obj.as_ptr() as usize);
    }

    header.write(GuardHeader {
        head: GUARD_HEAD,
        _pad: 0,
        size,
    });
    let payload = obj.as_ptr().add(HEADER);
    (payload.add(size) as *mut u32).write_unaligned(GUARD_TAIL);

    NonNull::new_unchecked(payload)
}

/// Confere e desarma as guardas. Devolve o início do objeto.
///
/// # Safety
///
/// `payload` deve ter vindo de [`arm`].
pub unsafe fn disarm(payload: NonNull<u8>) -> NonNull<u8> {
    let obj = payload.as_ptr().sub(HEADER);
    let header = obj as *mut GuardHeader;

    let head = (*header).head;
    if head != GUARD_HEAD {
        fatal(SlabFault::HeadGuardCorrupted, head as usize);
    }

    let size = (*header).size;
    let tail_ptr = payload.as_ptr().add(size) as *mut u32;
    let tail = tail_ptr.read_unaligned();
    if tail != GUARD_TAIL {
        fatal(SlabFault::TailGuardCorrupted, tail as usize);
    }

    core::ptr::write_bytes(obj, SCRUB_BYTE, HEADER + size);
    (*header).head = 0;
    tail_ptr.write_unaligned(0);

    NonNull::new_unchecked(obj)
}
