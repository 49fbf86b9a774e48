//! # Funções de Alinhamento de Memória
//!
//! Funções utilitárias para alinhamento de endereços e tamanhos.
//! `align` deve sempre ser potência de 2.

/// Alinha um valor para cima ao próximo múltiplo de `align`.
///
/// # Exemplo
/// ```
/// assert_eq!(align_up(10, 4), 12);
/// assert_eq!(align_up(16, 4), 16);
/// ```
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Alinha um valor para baixo ao múltiplo anterior de `align`.
#[inline(always)]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Verifica se um valor está alinhado a `align`.
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align_up(10, 4), 12);
        assert_eq!(align_up(16, 4), 16);
        assert_eq!(align_down(10, 4), 8);
        assert_eq!(align_down(0x4_1234, 0x4_0000), 0x4_0000);
        assert!(is_aligned(0x8_0000, 0x4_0000));
        assert!(!is_aligned(0x8_0040, 0x4_0000));
    }
}
