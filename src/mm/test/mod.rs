//! # Testes do kmalloc no boot
//!
//! Suites executadas pelo kernel com a feature `self_test`, logo após
//! `mm::kmalloc::init`. Os resultados vão para a serial.
//!
//! - `slab_test.rs` - alocação, free, listas e relatório


pub use slab_test::run_slab_tests;
