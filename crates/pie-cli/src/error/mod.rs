//! Error types for the `pie` binary and library.
//!
//! `CliError` is what commands return. `ConfigError` covers
//! `pie.config.json`; `BuildError` covers the controller bundle and keeps
//! infrastructure failures (installer, bundler process, I/O) apart from
//! compile diagnostics, since only the latter are shown in the browser.

mod report;

pub use report::{build_error_to_miette, cli_error_to_miette};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The live server could not bind or stopped
    #[error("Server error: {0}")]
    Server(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A `watchIgnore` entry that is not a valid regular expression
    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Problems with `pie.config.json` or the values layered over it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}\n\nHint: Create a pie.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    #[error("Pie '{0}' is declared more than once\n\nHint: Pie names must be unique within a build")]
    DuplicatePie(String),

    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

/// Controller bundle failures.
///
/// `Install`, `Bundler` and `Io` are logged only. `Compile` carries the
/// bundler's diagnostics in the order it reported them.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dependency install failed in {}: {message}\n\nHint: Check network access and the versions in package.json", .dir.display())]
    Install { dir: PathBuf, message: String },

    /// The bundler could not be run or produced no readable stats
    #[error("Bundler invocation failed: {0}")]
    Bundler(String),

    #[error("I/O error during build: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bundle has {} compile error(s)", .errors.len())]
    Compile { errors: Vec<String> },
}

impl BuildError {
    /// Compile diagnostics, if this is a compile failure.
    pub fn diagnostics(&self) -> Option<&[String]> {
        match self {
            BuildError::Compile { errors } => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found() {
        let msg = ConfigError::NotFound(PathBuf::from("pie.config.json")).to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("pie.config.json"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_config_error_duplicate_pie() {
        let msg = ConfigError::DuplicatePie("text-entry".to_string()).to_string();
        assert!(msg.contains("'text-entry'"));
        assert!(msg.contains("unique"));
    }

    #[test]
    fn test_install_error_is_infrastructure() {
        let err = BuildError::Install {
            dir: PathBuf::from("/work/controllers"),
            message: "ETIMEDOUT".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/work/controllers"));
        assert!(msg.contains("ETIMEDOUT"));
        assert!(err.diagnostics().is_none());
    }

    #[test]
    fn test_compile_error_keeps_diagnostics_in_order() {
        let err = BuildError::Compile {
            errors: vec!["Unexpected token (3:4)".to_string(), "Module not found".to_string()],
        };
        assert_eq!(err.to_string(), "Bundle has 2 compile error(s)");
        assert_eq!(
            err.diagnostics(),
            Some(&["Unexpected token (3:4)".to_string(), "Module not found".to_string()][..])
        );
    }

    #[test]
    fn test_build_errors_convert_to_cli_errors() {
        let cli_err: CliError = BuildError::Bundler("node: not found".to_string()).into();
        assert!(matches!(cli_err, CliError::Build(BuildError::Bundler(_))));

        let io: CliError = BuildError::from(std::io::Error::other("disk full")).into();
        assert!(io.to_string().contains("disk full"));
    }
}
