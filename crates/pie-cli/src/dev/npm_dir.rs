//! A directory with its own installed dependency tree.
//!
//! [`NpmDir`] owns one directory: it writes a `package.json` describing the
//! requested dependencies and asks a [`PackageInstaller`] to materialize them
//! under `node_modules`. The last successfully installed map is stamped next
//! to it, so asking for the same map again does nothing.

use crate::error::BuildError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Package name -> version specifier.
pub type DependencyMap = BTreeMap<String, String>;

/// Records the dependency map of the last successful install.
pub const INSTALL_STAMP: &str = ".pie-install.json";

/// Installs a dependency map into a directory.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install `dependencies` into `dir`.
    ///
    /// `dir` already contains a `package.json` listing exactly these
    /// dependencies when this is called.
    async fn install(&self, dir: &Path, dependencies: &DependencyMap) -> Result<(), BuildError>;
}

/// Runs `npm install` in the target directory.
#[derive(Debug, Clone, Default)]
pub struct NpmInstaller;

fn npm_program() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

#[async_trait]
impl PackageInstaller for NpmInstaller {
    async fn install(&self, dir: &Path, dependencies: &DependencyMap) -> Result<(), BuildError> {
        info!(path = %dir.display(), count = dependencies.len(), "running npm install");

        let output = Command::new(npm_program())
            .args(["install", "--no-audit", "--no-fund"])
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| BuildError::Install {
                dir: dir.to_path_buf(),
                message: format!("failed to run npm: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::Install {
                dir: dir.to_path_buf(),
                message: format!("npm install exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

/// What [`NpmDir::install`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadySatisfied,
}

#[derive(Serialize)]
struct Manifest<'a> {
    name: &'a str,
    private: bool,
    dependencies: &'a DependencyMap,
}

#[derive(Serialize, Deserialize, PartialEq)]
struct Stamp {
    dependencies: DependencyMap,
}

/// A dependency directory owned by one build.
///
/// Not synchronized: callers must not run two installs into the same
/// directory at once.
pub struct NpmDir<I = NpmInstaller> {
    root: PathBuf,
    installer: I,
}

impl NpmDir<NpmInstaller> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_installer(root, NpmInstaller)
    }
}

impl<I: PackageInstaller> NpmDir<I> {
    pub fn with_installer(root: impl Into<PathBuf>, installer: I) -> Self {
        Self {
            root: root.into(),
            installer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make the directory's installed tree match `dependencies`.
    ///
    /// Creates the directory if needed. When the stamp shows the same map was
    /// already installed and `node_modules` is still there, returns without
    /// running the installer. Installer failures are returned as-is; the stamp
    /// is only written after a successful install.
    pub async fn install(&self, dependencies: &DependencyMap) -> Result<InstallOutcome, BuildError> {
        tokio::fs::create_dir_all(&self.root).await?;

        if self.is_satisfied(dependencies).await {
            debug!(path = %self.root.display(), "dependencies already installed");
            return Ok(InstallOutcome::AlreadySatisfied);
        }

        let manifest = Manifest {
            name: "pie-controllers",
            private: true,
            dependencies,
        };
        write_json(&self.root.join("package.json"), &manifest).await?;

        self.installer.install(&self.root, dependencies).await?;

        let stamp = Stamp {
            dependencies: dependencies.clone(),
        };
        write_json(&self.root.join(INSTALL_STAMP), &stamp).await?;

        Ok(InstallOutcome::Installed)
    }

    async fn is_satisfied(&self, dependencies: &DependencyMap) -> bool {
        if !self.root.join("node_modules").is_dir() {
            return false;
        }
        match tokio::fs::read(self.root.join(INSTALL_STAMP)).await {
            Ok(bytes) => serde_json::from_slice::<Stamp>(&bytes)
                .map(|stamp| &stamp.dependencies == dependencies)
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| BuildError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    json.push('\n');
    tokio::fs::write(path, json).await?;
    Ok(())
}
