//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pie_cli::dev::{BuildDescriptor, BundleConfig, BundleStats, Bundler, Component, DependencyMap, PackageInstaller};
use pie_cli::BuildError;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Installer that creates an empty `node_modules/<name>` per dependency.
#[derive(Clone, Default)]
pub struct FakeInstaller {
    pub calls: Arc<AtomicUsize>,
    pub failure: Option<String>,
}

impl FakeInstaller {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn install(&self, dir: &Path, dependencies: &DependencyMap) -> Result<(), BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(BuildError::Install {
                dir: dir.to_path_buf(),
                message: message.clone(),
            });
        }
        for name in dependencies.keys() {
            tokio::fs::create_dir_all(dir.join("node_modules").join(name)).await?;
        }
        Ok(())
    }
}

/// Bundler that writes the entry module to the output file and reports
/// whatever errors it has been told to.
#[derive(Clone, Default)]
pub struct FakeBundler {
    pub calls: Arc<AtomicUsize>,
    errors: Arc<Mutex<Vec<String>>>,
    broken: Arc<Mutex<Option<String>>>,
}

impl FakeBundler {
    pub fn set_errors(&self, errors: &[&str]) {
        *self.errors.lock().unwrap() = errors.iter().map(|e| e.to_string()).collect();
    }

    pub fn set_broken(&self, message: Option<&str>) {
        *self.broken.lock().unwrap() = message.map(str::to_string);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, _config_path: &Path, config: &BundleConfig) -> Result<BundleStats, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let broken = self.broken.lock().unwrap().clone();
        if let Some(message) = broken {
            return Err(BuildError::Bundler(message));
        }

        let entry = tokio::fs::read_to_string(&config.entry).await?;
        let artifact = config.output.path.join(&config.output.filename);
        tokio::fs::write(&artifact, format!("/* {} */\n{}", config.output.library.name, entry)).await?;

        let errors = self.errors.lock().unwrap().clone();
        Ok(BundleStats {
            errors,
            warnings: vec![],
        })
    }
}

/// Install `names` under `<root>/node_modules`, each with a controller.
pub fn installed_pies(root: &Path, names: &[&str]) -> Vec<Component> {
    names
        .iter()
        .map(|name| {
            let pie = Component::new(name, root);
            fs::create_dir_all(pie.controller_dir()).unwrap();
            fs::write(pie.controller_dir().join("index.js"), "exports.model = () => ({});").unwrap();
            pie
        })
        .collect()
}

pub fn descriptor(root: &Path, pies: Vec<Component>) -> BuildDescriptor {
    BuildDescriptor::new(root, pies)
}

/// Poll `cond` for up to five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
