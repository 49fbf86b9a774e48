//! # Configuração do Alocador de Objetos
//!
//! Define constantes de layout do kmalloc. Mudar qualquer valor aqui altera
//! o formato dos slabs em memória.

use crate::klib::align_up;

// =============================================================================
// CONSTANTES DE TAMANHO
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Tamanho de um slab (256 KiB). Todo slab começa num endereço múltiplo disso.
pub const SLAB_SIZE: usize = 0x40000;

/// Máscara que leva qualquer endereço interno ao cabeçalho do slab
pub const SLAB_MASK: usize = !(SLAB_SIZE - 1);

/// Granularidade das size-classes abaixo de uma página
pub const OBJECT_GRANULE: usize = 64;

/// Maior pedido aceito. Cada slab precisa conter alguns objetos.
///
/// Com `kmalloc_canary` a size-class do pedido máximo passa disso (ver
/// `slab::size_class::MAX_CLASS_SIZE`); o slab continua com 3 objetos.
pub const MAX_OBJECT_SIZE: usize = SLAB_SIZE / 4;

// =============================================================================
// VALIDAÇÃO
// =============================================================================

/// Tag gravada no cabeçalho de todo slab válido
pub const SLAB_MAGIC: u32 = 0xADA5_A54B;

// =============================================================================
// DIRETÓRIO DE CACHES
// =============================================================================

/// Número de entradas da tabela hash de caches (size -> Cache)
pub const DIRECTORY_ENTRIES: usize = 256;

// =============================================================================
// GUARDAS (feature kmalloc_canary)
// =============================================================================

/// Guarda antes do payload
pub const GUARD_HEAD: u32 = 0x5a5a_6b6b;

/// Guarda depois do payload
pub const GUARD_TAIL: u32 = 0x5a5a_7c7c;

/// Byte usado para sujar objetos liberados
pub const SCRUB_BYTE: u8 = 0x4A;

/// Guardas ativas nesta build
pub const GUARD_ENABLED: bool = cfg!(feature = "kmalloc_canary");

/// Alinhamento garantido do ponteiro devolvido ao chamador.
///
/// Sem guardas o objeto começa alinhado à granularidade; com guardas o
/// payload fica depois do cabeçalho de 16 bytes.
pub const GUARANTEED_ALIGN: usize = if GUARD_ENABLED { 16 } else { OBJECT_GRANULE };

/// Arredonda para a granularidade de objetos
#[inline(always)]
pub const fn granule_align(size: usize) -> usize {
    align_up(size, OBJECT_GRANULE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert!(SLAB_SIZE.is_power_of_two());
        assert_eq!(SLAB_SIZE % PAGE_SIZE, 0);
        assert_eq!(MAX_OBJECT_SIZE, 0x10000);
        assert_eq!(0x4_1234 & SLAB_MASK, 0x4_0000);
        assert_eq!(granule_align(1), 64);
        assert_eq!(granule_align(64), 64);
        assert_eq!(granule_align(65), 128);
    }
}
