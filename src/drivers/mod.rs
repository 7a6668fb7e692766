//! # Drivers
//!
//! Pontas do buffer cache que falam com o "hardware".
//!
//! | Driver   | Arquivo      | Papel |
//! |----------|--------------|-------|
//! | Serial   | `serial.rs`  | Sink dos macros de log |
//! | Block    | `block/`     | `BlockDevice`, registro de dispositivos, RamDisk |

pub mod block;
pub mod serial;
