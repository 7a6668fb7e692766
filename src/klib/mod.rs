//! # Kernel Library
//!
//! Utilitários internos sem dependência de subsistema.

/// Framework das suites de self test
pub mod test_framework;
