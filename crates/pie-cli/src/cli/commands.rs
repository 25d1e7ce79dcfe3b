use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available Pie subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a live development session
    ///
    /// Mirrors every pie's sources into the install tree, rebuilds the
    /// controller bundle when controllers change and pushes reload or error
    /// events to the connected browser.
    Serve(ServeArgs),

    /// Build the controller bundle once
    Pack(PackArgs),

    /// Remove the controller bundle artifact
    Clean(CleanArgs),
}

/// Options shared by every command that reads pie.config.json
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Workspace root (defaults to the `dir` in pie.config.json, then `.`)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Path to the config file (defaults to <DIR>/pie.config.json)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Port for the HTTP + live-reload server
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Arguments for the pack command
#[derive(Args, Debug, Clone, Default)]
pub struct PackArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for the clean command
#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}
