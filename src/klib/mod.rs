//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware usados pelo alocador.
//! Funciona como uma extensão da `core` library.

pub mod align;
pub mod bitmap;
pub mod hash;

#[cfg(any(test, feature = "self_test"))]
pub mod test_framework;

pub use align::{align_down, align_up, is_aligned};
