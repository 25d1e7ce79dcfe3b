//! Configuration for the Pie CLI with multi-source loading.
//!
//! Merges settings from CLI args, environment variables and `pie.config.json`.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::*;
pub use loading::ConfigOverrides;

/// Name of the config file looked up in the workspace root.
pub const CONFIG_FILE: &str = "pie.config.json";

/// One pie declared in the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PieEntry {
    /// Package name the pie is installed under
    pub name: String,

    /// Source directory, relative to the workspace root
    #[serde(default = "default_pie_path")]
    pub path: PathBuf,
}

/// Pie configuration - loaded from pie.config.json and CLI args.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PieConfig {
    /// Workspace root that install trees and the controllers dir hang off
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Pies taking part in the session
    #[serde(default)]
    pub pies: Vec<PieEntry>,

    /// HTTP + live-reload server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Window in which rebuild triggers are coalesced
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Extra ignore patterns (regex, matched against `/`-prefixed relative paths)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_ignore: Vec<String>,

    /// Rebuild the bundle when a controller file is added or changed
    #[serde(default = "default_rebuild_on_controller_change")]
    pub rebuild_on_controller_change: bool,

    /// Additional files whose changes trigger a rebuild
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rebuild_on: Vec<PathBuf>,
}
