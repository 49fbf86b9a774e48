//! Normalização de tamanho -> size-class
//!
//! - abaixo de uma página: múltiplos de 64 bytes
//! - a partir de uma página: múltiplos de página
//! - pedido acima de SLAB_SIZE/4: fatal
//!
//! Com guardas, o pedido máximo ganha `guard::OVERHEAD` e cai na classe
//! [`MAX_CLASS_SIZE`], uma página acima de SLAB_SIZE/4. O slab dessa classe
//! ainda comporta 3 objetos.

use crate::klib::align_up;
use crate::mm::config::{granule_align, GUARD_ENABLED, MAX_OBJECT_SIZE, PAGE_SIZE};
use crate::mm::error::{fatal, SlabFault};

use super::guard;

/// Size-class de um tamanho bruto, sem validação.
#[inline]
pub const fn round_to_class(bytes: usize) -> usize {
    if bytes < PAGE_SIZE {
        granule_align(bytes)
    } else {
        align_up(bytes, PAGE_SIZE)
    }
}

/// Bytes que o objeto ocupa de fato (payload + guardas quando ativas)
#[inline]
pub const fn footprint(size: usize) -> usize {
    if GUARD_ENABLED {
        size + guard::OVERHEAD
    } else {
        size
    }
}

/// Size-class usada por `allocate(size)` nesta build.
#[inline]
pub const fn class_for(size: usize) -> usize {
    round_to_class(footprint(size))
}

/// Maior size-class desta build: `MAX_OBJECT_SIZE`, ou a classe do
/// pedido máximo com guardas.
pub const MAX_CLASS_SIZE: usize = class_for(MAX_OBJECT_SIZE);

/// Valida o pedido e devolve a size-class.
///
/// Todo `size` em `1..=MAX_OBJECT_SIZE` é aceito, com ou sem guardas.
pub fn normalize(size: usize) -> usize {
    if size == 0 {
        fatal(SlabFault::ZeroSize, 0);
    }
    if size > MAX_OBJECT_SIZE {
        fatal(SlabFault::Oversized, size);
    }
    class_for(size)
}
