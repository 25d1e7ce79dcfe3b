//! Development session configuration.
//!
//! Resolves a loaded [`PieConfig`] into what the dev pipeline works with:
//! absolute paths, the pies as build components, and one watch pair per pie.

use crate::commands::utils::resolve_path;
use crate::config::{PieConfig, PieEntry};
use crate::dev::builder::{BuildDescriptor, Component};
use crate::dev::watcher::PieWatch;
use crate::error::{ConfigError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one `pie serve` / `pie pack` run.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Absolute workspace root
    pub root: PathBuf,

    /// Pies taking part in the session
    pub pies: Vec<PieEntry>,

    /// Live server port
    pub port: u16,

    /// Rebuild coalescing window
    pub debounce: Duration,

    /// Extra ignore patterns for every mirror
    pub watch_ignore: Vec<String>,

    /// Whether controller edits trigger a rebuild
    pub rebuild_on_controller_change: bool,

    /// Absolute paths of extra rebuild trigger files
    pub rebuild_on: Vec<PathBuf>,
}

impl DevConfig {
    /// Validate `config` and resolve it against its workspace root.
    ///
    /// # Errors
    ///
    /// Returns error if no pies are declared, a pie is declared twice, an
    /// ignore pattern is not a valid regex, or the root does not exist.
    pub fn from_config(config: PieConfig) -> Result<Self> {
        config.validate_for_build()?;

        if !config.dir.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "dir".to_string(),
                value: config.dir.display().to_string(),
                hint: "Workspace directory does not exist".to_string(),
            }
            .into());
        }

        let rebuild_on = config
            .rebuild_on
            .iter()
            .map(|p| path_clean::clean(resolve_path(p, &config.dir)))
            .collect();

        Ok(Self {
            root: config.dir,
            pies: config.pies,
            port: config.port,
            debounce: Duration::from_millis(config.debounce_ms),
            watch_ignore: config.watch_ignore,
            rebuild_on_controller_change: config.rebuild_on_controller_change,
            rebuild_on,
        })
    }

    /// The pies as the bundle builder sees them.
    pub fn components(&self) -> Vec<Component> {
        self.pies
            .iter()
            .map(|pie| Component::new(&pie.name, &self.root))
            .collect()
    }

    /// Build the controller bundle under the workspace root.
    pub fn descriptor(&self) -> BuildDescriptor {
        BuildDescriptor::new(&self.root, self.components())
    }

    /// One unstarted watch pair per pie.
    pub fn pie_watches(&self) -> Result<Vec<PieWatch>> {
        self.pies
            .iter()
            .map(|pie| PieWatch::with_ignores(&pie.name, &pie.path, &self.root, &self.watch_ignore))
            .collect()
    }
}
