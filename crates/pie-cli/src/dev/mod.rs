//! Live development pipeline.
//!
//! - Watches that mirror pie sources into install-shaped trees
//! - A scoped dependency directory for the controller build
//! - The controller bundle builder
//! - A single-client live notification server

pub mod builder;
pub mod config;
pub mod layout;
pub mod npm_dir;
pub mod server;
pub mod state;
pub mod watcher;

// Re-exports
pub use builder::{
    clean, BuildDescriptor, BundleConfig, BundleStats, Bundler, Component, ControllerMapBuilder,
    WebpackBundler, BUNDLE_NAME,
};
pub use config::DevConfig;
pub use npm_dir::{DependencyMap, InstallOutcome, NpmDir, NpmInstaller, PackageInstaller};
pub use server::{LiveEvent, LiveServer, Listening, SOCK_PREFIX};
pub use state::ConnectionSlot;
pub use watcher::{ChangeHook, FileWatch, IgnoreSet, MirrorWatch, PieWatch, WatchEvent, WatchRoots};
