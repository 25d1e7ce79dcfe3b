//! Terminal reports for errors that end a command.

use crate::error::{BuildError, CliError, ConfigError};
use miette::Report;

pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        // ConfigError messages already carry their own hint
        CliError::Config(ConfigError::NotFound(path)) => {
            miette::miette!("{}", ConfigError::NotFound(path))
        }
        CliError::Config(e) => miette::miette!("Invalid pie.config.json: {}", e),
        CliError::Server(message) => miette::miette!(
            "{}\n\nHint: Another `pie serve` may be running; pass --port or set PIE_PORT",
            message
        ),
        other => miette::miette!("{}", other),
    }
}

pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::Compile { errors } => {
            let listing = errors
                .iter()
                .enumerate()
                .map(|(i, e)| format!("  {}. {}", i + 1, e))
                .collect::<Vec<_>>()
                .join("\n");
            miette::miette!(
                "Controller bundle failed to compile:\n{}\n\nHint: Fix the controller sources and run again",
                listing
            )
        }
        BuildError::Install { dir, message } => miette::miette!(
            "Dependency install failed in {}:\n{}\n\nHint: Run `npm install` there to see the full output",
            dir.display(),
            message
        ),
        BuildError::Bundler(message) => miette::miette!(
            "Could not run the bundler: {}\n\nHint: `node` must be on PATH",
            message
        ),
        BuildError::Io(e) => miette::miette!("Filesystem error while building: {}", e),
    }
}
