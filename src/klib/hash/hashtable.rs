//! Hash Table

// Arquivo: klib/hash/hashtable.rs
//
// Propósito: Tabela Hash (Dicionário) de capacidade fixa.
// Mapeia Chaves -> Valores usando uma função de hash para acesso O(1) médio.
//
// Detalhes de Implementação:
// - Endereçamento aberto com sondagem linear (sem buckets dinâmicos).
// - Armazenamento inline `[Option<Entry>; N]`: não depende de heap, então pode
//   ser usada pelo próprio alocador do kernel.
// - Entradas nunca são removidas.
// - Sem lock interno: o dono da tabela decide a sincronização.

use core::hash::{Hash, Hasher};

/// Hasher FNV-1a simples (não há `BuildHasherDefault` útil em no_std).
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    pub fn new() -> Self {
        Self {
            state: 0xcbf29ce484222325,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(0x100000001b3);
        }
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

/// A tabela não tem mais posições livres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

#[derive(Clone, Copy)]
struct Entry<K, V> {
    key: K,
    value: V,
}

pub struct HashTable<K, V, const N: usize> {
    entries: [Option<Entry<K, V>>; N],
    len: usize,
}

impl<K: Hash + Eq + Copy, V: Copy, const N: usize> HashTable<K, V, N> {
    pub const fn new() -> Self {
        Self {
            entries: [None; N],
            len: 0,
        }
    }

    fn slot_for(key: &K) -> usize {
        let mut hasher = FnvHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % N
    }

    /// Procura a posição da chave, ou a primeira posição livre na sequência
    fn probe(&self, key: &K) -> Option<usize> {
        let start = Self::slot_for(key);
        (0..N)
            .map(|i| (start + i) % N)
            .find(|&idx| match &self.entries[idx] {
                Some(entry) => entry.key == *key,
                None => true,
            })
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.probe(key)?;
        self.entries[idx].as_ref().map(|entry| &entry.value)
    }

    /// Define o valor da chave. Retorna o valor anterior, se existia.
    pub fn set_entry(&mut self, key: K, value: V) -> Result<Option<V>, TableFull> {
        let idx = self.probe(&key).ok_or(TableFull)?;
        let previous = self.entries[idx].replace(Entry { key, value });
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous.map(|entry| entry.value))
    }

    /// Retorna o valor da chave, inserindo `make()` se ela não existir.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&V, TableFull>
    where
        F: FnOnce() -> V,
    {
        let idx = self.probe(&key).ok_or(TableFull)?;
        if self.entries[idx].is_none() {
            self.entries[idx] = Some(Entry { key, value: make() });
            self.len += 1;
        }
        match &self.entries[idx] {
            Some(entry) => Ok(&entry.value),
            None => Err(TableFull),
        }
    }

    /// Retorna a n-ésima entrada ocupada (ordem interna da tabela).
    pub fn enumerate(&self, n: usize) -> Option<(&K, &V)> {
        self.entries
            .iter()
            .flatten()
            .nth(n)
            .map(|entry| (&entry.key, &entry.value))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Fator de carga em porcentagem
    pub fn load_percent(&self) -> usize {
        (self.len * 100) / self.capacity()
    }
}

impl<K: Hash + Eq + Copy, V: Copy, const N: usize> Default for HashTable<K, V, N> {
    fn default() -> Self {
        Self::new()
    }
}
