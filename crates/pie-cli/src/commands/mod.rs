//! Command implementations for the Pie CLI.
//!
//! - [`serve`] - Live development session
//! - [`pack`] - One-shot controller bundle build
//! - [`clean`] - Remove the bundle artifact
//!
//! Each command provides an `execute` function that takes the parsed command
//! arguments and returns a Result.

pub mod clean;
pub mod pack;
pub mod serve;
pub mod utils;

// Re-export execute functions for convenience
pub use clean::execute as clean_execute;
pub use pack::execute as pack_execute;
pub use serve::execute as serve_execute;
