//! sparkwheel-cli library interface
//!
//! The CLI logic lives here so it can be tested; main.rs is a thin wrapper.

pub mod cli;

pub use cli::run;
