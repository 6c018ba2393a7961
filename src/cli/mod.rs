//! Command Line Interface (CLI) layer for parcelsat.
//!
//! `args` defines the flags, `errors` the CLI-only error type and `runner`
//! wires them to [`parcelsat::api`]. Embedders should call the library API
//! directly instead of this module.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
