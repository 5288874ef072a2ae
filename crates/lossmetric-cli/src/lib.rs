//! lossmetric CLI library.
//!
//! Dataset loading and the command implementations behind the `lossmetric`
//! binary.

pub mod commands;
pub mod input;
