//! Pie CLI entry point.
//!
//! Parses arguments, initializes logging and dispatches to a command.

use clap::Parser;
use miette::Result;
use pie_cli::{cli, commands, error, logger};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let no_color = args.no_color || !logger::should_use_colors();
    logger::init_logger(args.verbose, args.quiet, no_color);

    let result = match args.command {
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args).await,
        cli::Command::Pack(pack_args) => commands::pack_execute(pack_args).await,
        cli::Command::Clean(clean_args) => commands::clean_execute(clean_args).await,
    };

    // Convert CLI errors to miette diagnostics for terminal reporting
    result.map_err(error::cli_error_to_miette)
}
