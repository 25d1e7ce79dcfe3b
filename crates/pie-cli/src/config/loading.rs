use crate::cli::{ProjectArgs, ServeArgs};
use crate::config::{PieConfig, CONFIG_FILE};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
}

impl From<&ProjectArgs> for ConfigOverrides {
    fn from(args: &ProjectArgs) -> Self {
        Self {
            dir: args.dir.clone(),
            config: args.config.clone(),
            port: None,
        }
    }
}

impl From<&ServeArgs> for ConfigOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            port: args.port,
            ..Self::from(&args.project)
        }
    }
}

impl PieConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// The returned `dir` is absolute. A relative `dir` from the config file
    /// is resolved against the file's directory; one from the command line
    /// against the current directory.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let cwd = crate::commands::utils::get_cwd()?;
        let base = overrides
            .dir
            .as_deref()
            .map(|d| crate::commands::utils::resolve_path(d, &cwd))
            .unwrap_or_else(|| cwd.clone());

        let config_file = match &overrides.config {
            Some(path) => {
                let path = crate::commands::utils::resolve_path(path, &cwd);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = base.join(CONFIG_FILE);
                default_path.is_file().then_some(default_path)
            }
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        if let Some(path) = &config_file {
            tracing::debug!("Loading config from {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        // PIE_PORT, PIE_DIR
        figment = figment.merge(Env::prefixed("PIE_").only(&["port", "dir"]));

        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("port", port));
        }

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: "Check pie.config.json syntax and field types".to_string(),
        })?;

        config.dir = match (&overrides.dir, &config_file) {
            (Some(_), _) => base,
            (None, Some(file)) => {
                let file_dir = file.parent().unwrap_or(Path::new("."));
                crate::commands::utils::resolve_path(&config.dir, file_dir)
            }
            (None, None) => crate::commands::utils::resolve_path(&config.dir, &cwd),
        };
        config.dir = path_clean::clean(&config.dir);

        Ok(config)
    }

    /// Get default configuration values.
    pub fn default_config() -> Self {
        use crate::config::defaults::*;

        Self {
            dir: default_dir(),
            pies: vec![],
            port: default_port(),
            debounce_ms: default_debounce_ms(),
            watch_ignore: vec![],
            rebuild_on_controller_change: default_rebuild_on_controller_change(),
            rebuild_on: vec![],
        }
    }
}
