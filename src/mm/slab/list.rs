//! Lista intrusiva de slabs
//!
//! Os nós vivem no cabeçalho de cada slab (`SlabNode`), então mover um slab
//! de lista não aloca nada. Todas as operações exigem o lock do Cache dono.

use core::ptr::NonNull;

use super::slab::{Slab, SlabNode};

pub struct SlabList {
    head: Option<NonNull<Slab>>,
    tail: Option<NonNull<Slab>>,
    len: usize,
}

impl SlabList {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<NonNull<Slab>> {
        self.head
    }

    fn node(slab: NonNull<Slab>) -> *mut SlabNode {
        // SAFETY: slabs ligados a uma lista são cabeçalhos válidos
        unsafe { slab.as_ref().node() }
    }

    /// Insere no fim
    ///
    /// # Safety
    ///
    /// `slab` não pode estar em nenhuma lista.
    pub unsafe fn push_back(&mut self, slab: NonNull<Slab>) {
        let node = Self::node(slab);
        (*node).prev = self.tail;
        (*node).next = None;

        match self.tail {
            Some(tail) => (*Self::node(tail)).next = Some(slab),
            None => self.head = Some(slab),
        }
        self.tail = Some(slab);
        self.len += 1;
    }

    /// Remove da lista
    ///
    /// # Safety
    ///
    /// `slab` deve pertencer a ESTA lista.
    pub unsafe fn remove(&mut self, slab: NonNull<Slab>) {
        let node = Self::node(slab);
        let prev = (*node).prev.take();
        let next = (*node).next.take();

        match prev {
            Some(prev) => (*Self::node(prev)).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => (*Self::node(next)).prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    /// Percorre a lista (diagnóstico)
    pub fn iter(&self) -> SlabIter<'_> {
        SlabIter {
            current: self.head,
            _list: self,
        }
    }
}

impl Default for SlabList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SlabIter<'a> {
    current: Option<NonNull<Slab>>,
    _list: &'a SlabList,
}

impl Iterator for SlabIter<'_> {
    type Item = NonNull<Slab>;

    fn next(&mut self) -> Option<Self::Item> {
        let slab = self.current?;
        // SAFETY: a lista está emprestada, então os nós não mudam
        self.current = unsafe { (*SlabList::node(slab)).next };
        Some(slab)
    }
}
