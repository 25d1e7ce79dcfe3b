//! Pie CLI - live development pipeline for pie content components.
//!
//! A pie is a component whose source lives in its own directory. During
//! development this crate mirrors pie sources into install-shaped trees,
//! bundles every pie's controller into one browser-loadable artifact, and
//! tells the connected browser to reload (or show compile errors) whenever a
//! build finishes.
//!
//! # Architecture
//!
//! - [`dev`] - Watches, the scoped dependency dir, the bundle builder and the
//!   live notification server
//! - [`commands`] - `serve`, `pack` and `clean`
//! - [`config`] - `pie.config.json` loading
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status lines and spinners
//!
//! # Example
//!
//! ```rust,no_run
//! use pie_cli::dev::{BuildDescriptor, Component, ControllerMapBuilder};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), pie_cli::BuildError> {
//! let root = Path::new("/work");
//! let descriptor = BuildDescriptor::new(root, vec![Component::new("text-entry", root)]);
//! let artifact = ControllerMapBuilder::new().build(&descriptor).await?;
//! println!("built {}", artifact);
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, CliError, ConfigError, Result};
