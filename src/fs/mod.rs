//! Subsistema de arquivos.
//!
//! Submódulos:
//! - `bcache`: Buffer cache de blocos (bread/bwrite/brelse/bpin/bunpin).

pub mod bcache;

#[cfg(test)]
mod tests;
