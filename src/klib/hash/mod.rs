//! Tabelas Hash do kernel

pub mod hashtable;

pub use hashtable::{FnvHasher, HashTable, TableFull};
