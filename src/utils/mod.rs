// Utilidades compartidas

pub mod constants;
#[cfg(target_arch = "wasm32")]
pub mod js;

pub use constants::*;
