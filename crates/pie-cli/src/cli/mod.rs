//! Command-line interface definition for the Pie CLI.
//!
//! # Command Structure
//!
//! - `pie serve` - Live development session (mirror, bundle, push reloads)
//! - `pie pack` - One-shot controller bundle build
//! - `pie clean` - Remove the controller bundle artifact

mod commands;
mod tests;

use clap::Parser;

pub use commands::{CleanArgs, Command, PackArgs, ProjectArgs, ServeArgs};

/// Pie - develop pie content components with live reload
#[derive(Parser, Debug)]
#[command(
    name = "pie",
    version,
    about = "Develop pie content components with live reload",
    long_about = "Pie mirrors component sources into an install-shaped tree, bundles every\n\
                  component controller into a single UMD artifact, and tells the attached\n\
                  browser to reload (or show compile errors) whenever sources change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
