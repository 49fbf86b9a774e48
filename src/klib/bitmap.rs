//! Bitmap genérico
//!
//! Usado como índice do sub-alocador `Valloc`: bit 1 = unidade ocupada.

/// Bitmap para gerenciamento de bits
pub struct Bitmap<'a> {
    data: &'a mut [u64],
    len: usize,
}

impl<'a> Bitmap<'a> {
    /// Cria bitmap sobre slice existente
    pub fn new(data: &'a mut [u64], bits: usize) -> Self {
        debug_assert!(bits <= data.len() * 64);
        Self { data, len: bits }
    }

    /// Número de bits válidos
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Define um bit
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.data[index / 64] |= 1 << (index % 64);
    }

    /// Limpa um bit
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.data[index / 64] &= !(1 << (index % 64));
    }

    /// Testa um bit
    pub fn test(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.data[index / 64] & (1 << (index % 64))) != 0
    }

    /// Zera todo o bitmap
    pub fn clear_all(&mut self) {
        for word in self.data.iter_mut() {
            *word = 0;
        }
    }

    /// Encontra primeiro bit livre (0) a partir de `from`
    pub fn find_first_zero(&self, from: usize) -> Option<usize> {
        let mut word_idx = from / 64;
        let mut mask = !0u64 << (from % 64);

        while word_idx < self.data.len() {
            let free = !self.data[word_idx] & mask;
            if free != 0 {
                let index = word_idx * 64 + free.trailing_zeros() as usize;
                return if index < self.len { Some(index) } else { None };
            }
            word_idx += 1;
            mask = !0;
        }
        None
    }

    /// Encontra uma sequência de `count` bits livres consecutivos (first-fit)
    pub fn find_zero_run(&self, count: usize, from: usize) -> Option<usize> {
        if count == 0 || count > self.len {
            return None;
        }

        let mut start = from;
        while let Some(first) = self.find_first_zero(start) {
            if first + count > self.len {
                return None;
            }
            match (first..first + count).find(|&i| self.test(i)) {
                None => return Some(first),
                Some(busy) => start = busy + 1,
            }
        }
        None
    }

    /// Conta bits ocupados
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|w| w.count_ones() as usize).sum()
    }
}
