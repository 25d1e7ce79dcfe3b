//! Controller bundle builder.
//!
//! Aggregates the controller module of every pie into one UMD library
//! (`controller-bundle.js`, exposed as `controller-map`):
//!
//! 1. discover which pies ship a `controller/` directory;
//! 2. compute the dependency map (one `<name>-controller` entry per pie plus
//!    the bundler toolchain);
//! 3. write the entry module that re-exports every controller;
//! 4. install the map into the `controllers` directory;
//! 5. write the bundler configuration and run the bundler.
//!
//! Compile errors come back as [`BuildError::Compile`] so callers can tell
//! them apart from install or process failures.

use crate::commands::utils::{remove_files, remove_path};
use crate::dev::layout;
use crate::dev::npm_dir::{DependencyMap, NpmDir, NpmInstaller, PackageInstaller};
use crate::error::{BuildError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component as PathComponent, Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Filename of the bundle artifact.
pub const BUNDLE_NAME: &str = "controller-bundle.js";

/// Global the UMD bundle exposes.
pub const LIBRARY_NAME: &str = "controller-map";

/// Generated entry module.
pub const ENTRY_FILE: &str = "entry.js";

/// Generated bundler configuration.
pub const BUNDLER_CONFIG_FILE: &str = "webpack.config.js";

/// Bundler and transform toolchain, installed alongside the controllers.
pub const TOOLCHAIN: &[(&str, &str)] = &[
    ("@babel/core", "^7.24.0"),
    ("@babel/preset-env", "^7.24.0"),
    ("babel-loader", "^9.1.3"),
    ("webpack", "^5.91.0"),
    ("webpack-cli", "^5.1.4"),
];

/// A pie as the builder sees it: a name and where it is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub installed_path: PathBuf,
}

impl Component {
    /// A pie installed at `<root>/node_modules/<name>`.
    pub fn new(name: &str, root_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            installed_path: layout::install_path(root_dir, name),
        }
    }

    pub fn controller_dir(&self) -> PathBuf {
        self.installed_path.join(layout::CONTROLLER_DIR)
    }

    pub fn has_controller(&self) -> bool {
        self.controller_dir().is_dir()
    }
}

/// What to build and where.
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    /// Target directory; the build happens in its `controllers` subdirectory.
    pub dir: PathBuf,
    pub pies: Vec<Component>,
}

impl BuildDescriptor {
    pub fn new(dir: impl Into<PathBuf>, pies: Vec<Component>) -> Self {
        Self {
            dir: dir.into(),
            pies,
        }
    }

    pub fn controllers_dir(&self) -> PathBuf {
        layout::controllers_dir(&self.dir)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.controllers_dir().join(BUNDLE_NAME)
    }
}

/// Pies that ship a controller. The rest are skipped with a warning.
pub fn discover(pies: &[Component]) -> Vec<&Component> {
    pies.iter()
        .filter(|pie| {
            let found = pie.has_controller();
            if !found {
                warn!(
                    "Skipping {}: no controller at {}",
                    pie.name,
                    pie.controller_dir().display()
                );
            }
            found
        })
        .collect()
}

/// One `file:` dependency per controller, relative to the controllers dir.
pub fn controller_dependencies(controllers_dir: &Path, pies: &[&Component]) -> DependencyMap {
    pies.iter()
        .map(|pie| {
            let relative = relative_to(&pie.controller_dir(), controllers_dir);
            (
                layout::controller_package_name(&pie.name),
                format!("file:{}", slash(&relative)),
            )
        })
        .collect()
}

/// The toolchain set.
pub fn toolchain_dependencies() -> DependencyMap {
    TOOLCHAIN
        .iter()
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

/// Controller dependencies plus the toolchain. Toolchain entries win.
pub fn with_toolchain(mut dependencies: DependencyMap) -> DependencyMap {
    dependencies.extend(toolchain_dependencies());
    dependencies
}

/// Entry module source: `exports.<camelName> = require('<name>-controller');`
/// per pie, sorted by name.
pub fn entry_source(pies: &[&Component]) -> String {
    let mut names: Vec<&str> = pies.iter().map(|pie| pie.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            format!(
                "exports.{} = require('{}');\n",
                camel_case(name),
                layout::controller_package_name(name)
            )
        })
        .collect()
}

/// `text-entry` -> `textEntry`, `@pie/multiple-choice` -> `pieMultipleChoice`.
///
/// Splits on anything that is not alphanumeric and on lower-to-upper case
/// boundaries. A leading digit gets an `_` prefix so the result is a valid
/// identifier.
pub fn camel_case(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in input.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }

    if out.chars().next().map_or(false, |c| c.is_numeric()) {
        out.insert(0, '_');
    }
    out
}

/// Lexical relative path from `base` to `path`. Both are expected to be
/// absolute and clean.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<PathComponent> = path.components().collect();
    let base: Vec<PathComponent> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component.as_os_str());
    }
    out
}

fn slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Bundler configuration, serialized into `webpack.config.js`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
    pub mode: String,
    pub context: PathBuf,
    pub entry: PathBuf,
    pub output: OutputConfig,
    pub module: ModuleConfig,
    pub resolve: ResolveConfig,
    pub resolve_loader: ResolveConfig,
    pub optimization: OptimizationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub filename: String,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleConfig {
    pub rules: Vec<RuleConfig>,
}

/// A loader rule. `test` is a regular expression source; the config file
/// turns it into a `RegExp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConfig {
    pub test: String,
    pub loader: String,
    pub options: LoaderOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderOptions {
    pub presets: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveConfig {
    pub modules: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationConfig {
    pub emit_on_errors: bool,
}

impl BundleConfig {
    /// Configuration for a build in `controllers_dir`, resolving modules and
    /// loaders only from its own `node_modules`.
    pub fn for_controllers(controllers_dir: &Path) -> Self {
        let modules = controllers_dir.join(layout::NODE_MODULES);
        Self {
            mode: "development".to_string(),
            context: controllers_dir.to_path_buf(),
            entry: controllers_dir.join(ENTRY_FILE),
            output: OutputConfig {
                path: controllers_dir.to_path_buf(),
                filename: BUNDLE_NAME.to_string(),
                library: LibraryConfig {
                    name: LIBRARY_NAME.to_string(),
                    kind: "umd".to_string(),
                },
            },
            module: ModuleConfig {
                rules: vec![RuleConfig {
                    test: r"\.js$".to_string(),
                    loader: "babel-loader".to_string(),
                    options: LoaderOptions {
                        presets: vec![modules.join("@babel").join("preset-env")],
                    },
                }],
            },
            resolve: ResolveConfig {
                modules: vec![modules.clone()],
            },
            resolve_loader: ResolveConfig {
                modules: vec![modules],
            },
            optimization: OptimizationConfig {
                // No artifact from a failed compile.
                emit_on_errors: false,
            },
        }
    }

    /// The configuration as a CommonJS module.
    pub fn to_module_source(&self) -> std::result::Result<String, serde_json::Error> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!(
            "// Generated by pie. Changes are overwritten on every build.\n\
             const config = {};\n\
             config.module.rules.forEach((rule) => {{ rule.test = new RegExp(rule.test); }});\n\
             module.exports = config;\n",
            json
        ))
    }
}

/// Errors and warnings reported by one bundler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Runs a bundle from a written configuration.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle according to `config`, which has been written to
    /// `config_path`.
    ///
    /// Returns `Err` only when the bundler could not run; compile problems
    /// are reported in [`BundleStats::errors`].
    async fn bundle(&self, config_path: &Path, config: &BundleConfig) -> Result<BundleStats, BuildError>;
}

/// Runs the webpack CLI installed in the build directory.
#[derive(Debug, Clone, Default)]
pub struct WebpackBundler;

#[derive(Deserialize)]
struct WebpackStats {
    #[serde(default)]
    errors: Vec<StatsMessage>,
    #[serde(default)]
    warnings: Vec<StatsMessage>,
}

/// Webpack 4 reports plain strings, webpack 5 objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatsMessage {
    Text(String),
    Detailed {
        message: String,
        #[serde(rename = "moduleName")]
        module_name: Option<String>,
    },
}

impl StatsMessage {
    fn into_text(self) -> String {
        match self {
            StatsMessage::Text(text) => text,
            StatsMessage::Detailed {
                message,
                module_name: Some(module),
            } => format!("{}: {}", module, message),
            StatsMessage::Detailed { message, .. } => message,
        }
    }
}

/// Parse `webpack --json` output.
fn parse_stats(stdout: &str) -> Option<BundleStats> {
    // Some webpack-cli versions print a line before the JSON.
    let start = stdout.find('{')?;
    let stats: WebpackStats = serde_json::from_str(&stdout[start..]).ok()?;
    Some(BundleStats {
        errors: stats.errors.into_iter().map(StatsMessage::into_text).collect(),
        warnings: stats.warnings.into_iter().map(StatsMessage::into_text).collect(),
    })
}

#[async_trait]
impl Bundler for WebpackBundler {
    async fn bundle(&self, config_path: &Path, config: &BundleConfig) -> Result<BundleStats, BuildError> {
        let cli = Path::new(layout::NODE_MODULES).join("webpack").join("bin").join("webpack.js");
        debug!(config = %config_path.display(), "running webpack");

        let output = Command::new("node")
            .arg(&cli)
            .arg("--config")
            .arg(config_path)
            .arg("--json")
            .current_dir(&config.context)
            .output()
            .await
            .map_err(|e| BuildError::Bundler(format!("failed to run node: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_stats(&stdout) {
            Some(stats) => Ok(stats),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(BuildError::Bundler(format!(
                    "webpack exited with {} and no readable stats: {}",
                    output.status,
                    stderr.trim()
                )))
            }
        }
    }
}

/// Builds the controller bundle.
pub struct ControllerMapBuilder<I = NpmInstaller, B = WebpackBundler> {
    installer: I,
    bundler: B,
}

impl ControllerMapBuilder {
    /// Builder backed by npm and webpack.
    pub fn new() -> Self {
        Self::with_collaborators(NpmInstaller, WebpackBundler)
    }
}

impl Default for ControllerMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, B> ControllerMapBuilder<I, B>
where
    I: PackageInstaller + Clone,
    B: Bundler,
{
    pub fn with_collaborators(installer: I, bundler: B) -> Self {
        Self { installer, bundler }
    }

    /// Build the bundle. Resolves to the artifact's filename.
    ///
    /// Leaves `entry.js`, `webpack.config.js` and `package.json` in the
    /// controllers directory. After a compile failure no artifact remains.
    pub async fn build(&self, descriptor: &BuildDescriptor) -> Result<String, BuildError> {
        let start = Instant::now();
        let controllers_dir = descriptor.controllers_dir();
        tokio::fs::create_dir_all(&controllers_dir).await?;
        debug!("Building controllers in {}", controllers_dir.display());

        let pies = discover(&descriptor.pies);
        let dependencies = with_toolchain(controller_dependencies(&controllers_dir, &pies));
        debug!(?dependencies, "controller dependencies");

        tokio::fs::write(controllers_dir.join(ENTRY_FILE), entry_source(&pies)).await?;

        NpmDir::with_installer(&controllers_dir, self.installer.clone())
            .install(&dependencies)
            .await?;

        let config = BundleConfig::for_controllers(&controllers_dir);
        let config_path = controllers_dir.join(BUNDLER_CONFIG_FILE);
        let source = config
            .to_module_source()
            .map_err(|e| BuildError::Bundler(format!("failed to serialize config: {}", e)))?;
        tokio::fs::write(&config_path, source).await?;

        let stats = self.bundler.bundle(&config_path, &config).await?;
        for warning in &stats.warnings {
            warn!("{}", warning);
        }

        if !stats.errors.is_empty() {
            for e in &stats.errors {
                error!("{}", e);
            }
            return Err(compile_failure(&controllers_dir.join(BUNDLE_NAME), stats.errors).await);
        }

        info!(
            pies = pies.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "controller-map done"
        );
        Ok(BUNDLE_NAME.to_string())
    }
}

/// Drop whatever the failed compile emitted and report its diagnostics.
///
/// A failed removal is logged; the result is always `Compile`.
async fn compile_failure(artifact: &Path, errors: Vec<String>) -> BuildError {
    if let Err(e) = remove_path(artifact).await {
        error!("Failed to remove {}: {}", artifact.display(), e);
    }
    BuildError::Compile { errors }
}

/// Remove `artifact` (and nothing else) from `root`.
pub async fn clean(root: &Path, artifact: &str) -> Result<()> {
    remove_files(root, &[artifact]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn component(root: &Path, name: &str, with_controller: bool) -> Component {
        let pie = Component::new(name, root);
        fs::create_dir_all(&pie.installed_path).unwrap();
        if with_controller {
            fs::create_dir_all(pie.controller_dir()).unwrap();
        }
        pie
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("text-entry"), "textEntry");
        assert_eq!(camel_case("multiple_choice"), "multipleChoice");
        assert_eq!(camel_case("@pie/multiple-choice"), "pieMultipleChoice");
        assert_eq!(camel_case("TextEntry"), "textEntry");
        assert_eq!(camel_case("solo"), "solo");
        assert_eq!(camel_case("3d-plot"), "_3dPlot");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/w/node_modules/a/controller"), Path::new("/w/controllers")),
            PathBuf::from("../node_modules/a/controller")
        );
        assert_eq!(
            relative_to(Path::new("/w/controllers/x"), Path::new("/w/controllers")),
            PathBuf::from("x")
        );
    }

    #[test]
    fn test_dependencies_skip_pies_without_controller() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let pies = vec![component(root, "text-entry", true), component(root, "static", false)];

        let found = discover(&pies);
        let deps = controller_dependencies(&layout::controllers_dir(root), &found);

        assert_eq!(found.len(), 1);
        assert_eq!(
            deps.get("text-entry-controller").map(String::as_str),
            Some("file:../node_modules/text-entry/controller")
        );
        assert!(!deps.contains_key("static-controller"));
    }

    #[test]
    fn test_dependency_map_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let controllers = layout::controllers_dir(root);
        let a = component(root, "text-entry", true);
        let b = component(root, "multiple-choice", true);
        let c = component(root, "static", false);

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let shuffled = vec![c, a, b];

        let first = with_toolchain(controller_dependencies(&controllers, &discover(&forward)));
        let again = with_toolchain(controller_dependencies(&controllers, &discover(&forward)));
        let reordered = with_toolchain(controller_dependencies(&controllers, &discover(&shuffled)));

        assert_eq!(first, again);
        assert_eq!(first, reordered);
        assert_eq!(first.len(), TOOLCHAIN.len() + 2);
    }

    #[tokio::test]
    async fn test_compile_failure_survives_failed_artifact_removal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("plain"), "not a directory").unwrap();
        let artifact = temp.path().join("plain").join(BUNDLE_NAME);
        assert!(remove_path(&artifact).await.is_err());

        let err = compile_failure(&artifact, vec!["SyntaxError".to_string()]).await;

        assert_eq!(err.diagnostics(), Some(&["SyntaxError".to_string()][..]));
    }

    #[test]
    fn test_toolchain_wins_on_conflict() {
        let mut deps = DependencyMap::new();
        deps.insert("webpack".to_string(), "file:../elsewhere".to_string());
        deps.insert("a-controller".to_string(), "file:../a".to_string());

        let merged = with_toolchain(deps);

        assert_eq!(merged["webpack"], "^5.91.0");
        assert_eq!(merged["a-controller"], "file:../a");
        assert_eq!(merged.len(), TOOLCHAIN.len() + 1);
    }

    #[test]
    fn test_entry_source() {
        let root = Path::new("/w");
        let b = Component::new("text-entry", root);
        let a = Component::new("choice", root);

        assert_eq!(
            entry_source(&[&b, &a]),
            "exports.choice = require('choice-controller');\n\
             exports.textEntry = require('text-entry-controller');\n"
        );
        assert_eq!(entry_source(&[]), "");
    }

    #[test]
    fn test_bundle_config_shape() {
        let config = BundleConfig::for_controllers(Path::new("/w/controllers"));
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["output"]["filename"], BUNDLE_NAME);
        assert_eq!(json["output"]["library"]["name"], LIBRARY_NAME);
        assert_eq!(json["output"]["library"]["type"], "umd");
        assert_eq!(json["resolve"]["modules"][0], "/w/controllers/node_modules");
        assert_eq!(json["resolveLoader"]["modules"][0], "/w/controllers/node_modules");
        assert_eq!(json["optimization"]["emitOnErrors"], false);

        let source = config.to_module_source().unwrap();
        assert!(source.contains("new RegExp(rule.test)"));
        assert!(source.trim_end().ends_with("module.exports = config;"));
    }

    #[test]
    fn test_parse_stats() {
        let stats = parse_stats(
            r#"{"errors":[{"message":"Unexpected token","moduleName":"./entry.js"},"plain"],"warnings":[]}"#,
        )
        .unwrap();
        assert_eq!(stats.errors, vec!["./entry.js: Unexpected token", "plain"]);
        assert!(stats.warnings.is_empty());

        let prefixed = parse_stats("asset emitted\n{\"errors\":[]}").unwrap();
        assert!(prefixed.errors.is_empty());

        assert!(parse_stats("node: command not found").is_none());
    }

    #[tokio::test]
    async fn test_clean_removes_only_artifact() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(BUNDLE_NAME), "bundle").unwrap();
        fs::write(temp.path().join(ENTRY_FILE), "entry").unwrap();

        clean(temp.path(), BUNDLE_NAME).await.unwrap();
        clean(temp.path(), BUNDLE_NAME).await.unwrap();

        assert!(!temp.path().join(BUNDLE_NAME).exists());
        assert!(temp.path().join(ENTRY_FILE).exists());
    }
}
