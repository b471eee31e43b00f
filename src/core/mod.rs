//! Core types and constants for multitag positioning

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
