//! # Core
//!
//! Infraestrutura compartilhada pelos subsistemas.
//!
//! - `logging`: macros `kerror!`..`ktrace!` com custo zero quando desligadas

pub mod logging;
