//! Diretório de caches: size-class -> Cache
//!
//! O lock do diretório também serializa a criação de caches, então duas
//! CPUs pedindo a mesma size-class pela primeira vez recebem o mesmo Cache.
//! Entradas nunca são removidas.

use core::ptr::NonNull;

use crate::klib::hash::HashTable;
use crate::mm::config::DIRECTORY_ENTRIES;
use crate::mm::error::MmResult;
use crate::sync::Spinlock;

use super::cache::Cache;

type Table = HashTable<usize, NonNull<Cache>, DIRECTORY_ENTRIES>;

pub struct CacheDirectory {
    table: Spinlock<Table>,
}

// SAFETY: os Caches apontados vivem para sempre e são Sync por construção
// (todo estado mutável deles está atrás de lock ou atômico).
unsafe impl Send for CacheDirectory {}
unsafe impl Sync for CacheDirectory {}

impl CacheDirectory {
    pub const fn new() -> Self {
        Self {
            table: Spinlock::new(HashTable::new()),
        }
    }

    /// Registra um cache já construído (bootstrap)
    pub fn register(&self, size: usize, cache: NonNull<Cache>) -> MmResult<()> {
        self.table.lock().set_entry(size, cache)?;
        Ok(())
    }

    /// Busca o cache da size-class, criando com `create` se não existir.
    ///
    /// `create` roda com o lock do diretório.
    pub fn get_or_create<F>(&self, size: usize, create: F) -> MmResult<NonNull<Cache>>
    where
        F: FnOnce() -> NonNull<Cache>,
    {
        let mut table = self.table.lock();
        let cache = table.get_or_insert_with(size, create)?;
        Ok(*cache)
    }

    pub fn get(&self, size: usize) -> Option<NonNull<Cache>> {
        self.table.lock().get(&size).copied()
    }

    /// Chama `f(size, cache)` para cada entrada, na ordem da tabela.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(usize, &Cache),
    {
        let table = self.table.lock();
        let mut n = 0;
        while let Some((size, cache)) = table.enumerate(n) {
            // SAFETY: caches registrados nunca são liberados
            f(*size, unsafe { cache.as_ref() });
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ocupação da tabela em porcentagem
    pub fn load_percent(&self) -> usize {
        self.table.lock().load_percent()
    }
}

impl Default for CacheDirectory {
    fn default() -> Self {
        Self::new()
    }
}
