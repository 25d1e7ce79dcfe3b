//! `tracing` setup for the `pie` binary.
//!
//! `--verbose` and `--quiet` pick a fixed filter; otherwise `RUST_LOG` is
//! honoured, falling back to info for this crate.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// `--quiet`
    Quiet,
    /// No flag; `RUST_LOG` may refine it
    Normal,
    /// `--verbose`, also shows watcher and server internals
    Verbose,
}

impl Verbosity {
    /// `--verbose` wins over `--quiet`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn filter(self) -> EnvFilter {
        match self {
            Self::Verbose => EnvFilter::new("pie_cli=debug,tower_http=debug,notify=info"),
            Self::Quiet => EnvFilter::new("pie_cli=error"),
            Self::Normal => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pie_cli=info"))
            }
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let verbosity = Verbosity::from_flags(verbose, quiet);

    let fmt_layer = fmt::layer()
        .with_target(verbosity == Verbosity::Verbose)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(verbosity.filter())
        .with(fmt_layer)
        .init();
}

/// Whether stdout should get colours. `NO_COLOR` beats `FORCE_COLOR`.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stdout().features().colors_supported()
}
