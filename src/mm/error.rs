//! Tipos de Erro do Alocador de Objetos
//!
//! Dois níveis:
//! - `MmError`: erros dos colaboradores (região, sub-alocador, diretório),
//!   devolvidos como `MmResult`.
//! - `SlabFault`: condições fatais do kmalloc. Não existe caminho de
//!   recuperação; `fatal` registra o erro e derruba o kernel.

use crate::klib::hash::TableFull;

/// Erros do subsistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Sem unidades livres no alocador de região
    OutOfMemory,
    /// Endereço não alinhado corretamente
    InvalidAlignment,
    /// Parâmetro inválido
    InvalidParameter,
    /// Região pequena demais para o índice e ao menos uma unidade
    RegionTooSmall,
    /// Endereço fora da região gerenciada
    InvalidAddress,
    /// Double free detectado
    DoubleFree,
    /// Tabela de caches sem entradas livres
    DirectoryFull,
    /// Mapeamento falhou
    MappingFailed,
}

impl MmError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OOM: região de slabs esgotada",
            Self::InvalidAlignment => "Endereço não alinhado",
            Self::InvalidParameter => "Parâmetro inválido",
            Self::RegionTooSmall => "Região pequena demais",
            Self::InvalidAddress => "Endereço fora da região",
            Self::DoubleFree => "Double free detectado",
            Self::DirectoryFull => "Diretório de caches cheio",
            Self::MappingFailed => "Mapeamento falhou",
        }
    }
}

impl core::fmt::Display for MmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<TableFull> for MmError {
    fn from(_: TableFull) -> Self {
        MmError::DirectoryFull
    }
}

/// Tipo Result específico para operações de memória
pub type MmResult<T> = Result<T, MmError>;

/// Condições fatais do alocador de objetos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabFault {
    /// kmalloc(0)
    ZeroSize,
    /// Size-class acima de SLAB_SIZE/4
    Oversized,
    /// Alocador de região não tem mais slabs
    RegionExhausted,
    /// Região devolvida fora do alinhamento de SLAB_SIZE
    MisalignedRegion,
    /// Slab com capacidade menor que 3 objetos
    SlabTooSmall,
    /// Magic do slab não confere no free
    InvalidFree,
    /// Ponteiro dentro do slab que não é o início de um objeto
    NotAnObject,
    /// Objeto devolvido duas vezes
    DoubleFree,
    /// Guarda antes do payload sobrescrita
    HeadGuardCorrupted,
    /// Guarda depois do payload sobrescrita
    TailGuardCorrupted,
    /// Objeto recém-alocado já tinha guarda armada
    GuardAlreadyArmed,
    /// Tabela de caches esgotada
    DirectoryFull,
    /// Mapeamento de página recusado
    MappingFailed,
    /// Contagem do slab fora de 0..=max
    CountOutOfRange,
}

impl SlabFault {
    /// Invariante violada, usada na mensagem de panic
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroSize => "kmalloc: tamanho zero",
            Self::Oversized => "kmalloc: objeto maior que SLAB_SIZE/4",
            Self::RegionExhausted => "kmalloc: região de slabs esgotada",
            Self::MisalignedRegion => "kmalloc: slab fora do alinhamento de SLAB_SIZE",
            Self::SlabTooSmall => "kmalloc: slab comporta menos de 3 objetos",
            Self::InvalidFree => "kfree: magic do slab inválido",
            Self::NotAnObject => "kfree: ponteiro não é início de objeto",
            Self::DoubleFree => "kfree: double free",
            Self::HeadGuardCorrupted => "kfree: guarda inicial corrompida",
            Self::TailGuardCorrupted => "kfree: guarda final corrompida",
            Self::GuardAlreadyArmed => "kmalloc: objeto entregue duas vezes",
            Self::DirectoryFull => "kmalloc: diretório de caches cheio",
            Self::MappingFailed => "kmalloc: falha ao mapear páginas do slab",
            Self::CountOutOfRange => "kmalloc: contagem do slab fora do intervalo",
        }
    }
}

impl core::fmt::Display for SlabFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<MmError> for SlabFault {
    fn from(err: MmError) -> Self {
        match err {
            MmError::OutOfMemory => Self::RegionExhausted,
            MmError::InvalidAlignment => Self::MisalignedRegion,
            MmError::DoubleFree => Self::DoubleFree,
            MmError::DirectoryFull => Self::DirectoryFull,
            MmError::MappingFailed => Self::MappingFailed,
            MmError::InvalidAddress => Self::NotAnObject,
            MmError::InvalidParameter | MmError::RegionTooSmall => Self::SlabTooSmall,
        }
    }
}

/// Derruba o kernel com a invariante violada.
///
/// `value` vai só para o log serial (endereço, tamanho ou padrão
/// encontrado); a mensagem do panic é apenas a invariante.
#[cold]
#[inline(never)]
pub fn fatal(fault: SlabFault, value: usize) -> ! {
    crate::kerror!("(Slab) FATAL: ", value as u64);
    crate::kerror!(fault.as_str());
    panic!("{}", fault.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(SlabFault::from(MmError::OutOfMemory), SlabFault::RegionExhausted);
        assert_eq!(SlabFault::from(MmError::DoubleFree), SlabFault::DoubleFree);
        assert_eq!(MmError::DirectoryFull.as_str(), "Diretório de caches cheio");
    }

    #[test]
    #[should_panic(expected = "kfree: magic do slab inválido")]
    fn test_fatal_names_invariant() {
        fatal(SlabFault::InvalidFree, 0xdead);
    }

    #[test]
    fn test_fatal_message_is_only_the_invariant() {
        let payload = std::panic::catch_unwind(|| fatal(SlabFault::NotAnObject, 0xdead))
            .unwrap_err();
        let message = match payload.downcast_ref::<String>() {
            Some(message) => message.as_str(),
            None => *payload.downcast_ref::<&str>().unwrap(),
        };
        assert_eq!(message, SlabFault::NotAnObject.as_str());
    }
}
