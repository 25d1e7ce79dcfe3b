//! Where things live inside a pie workspace.
//!
//! Every install-shaped location is derived from the workspace root and the
//! pie name, never configured on its own, so the package mirror, the
//! controller mirror and the bundle builder always agree on the layout:
//!
//! ```text
//! <root>/node_modules/<name>/                         package mirror target
//! <root>/node_modules/<name>/controller/              installed controller copy the bundle reads
//! <root>/controllers/                                 scoped dependency dir + bundle output
//! <root>/controllers/node_modules/<name>-controller/  controller mirror target
//! ```

use std::path::{Path, PathBuf};

/// Dependency-install directory name.
pub const NODE_MODULES: &str = "node_modules";

/// Per-pie controller subdirectory.
pub const CONTROLLER_DIR: &str = "controller";

/// Directory under the root that holds the controller build.
pub const CONTROLLERS_DIR: &str = "controllers";

/// Install location of a pie package.
pub fn install_path(root_dir: &Path, name: &str) -> PathBuf {
    path_clean::clean(root_dir.join(NODE_MODULES).join(name))
}

/// Controller copy inside an installed pie package, read by the bundle.
pub fn installed_controller_path(root_dir: &Path, name: &str) -> PathBuf {
    install_path(root_dir, name).join(CONTROLLER_DIR)
}

/// The controllers build directory.
pub fn controllers_dir(root_dir: &Path) -> PathBuf {
    path_clean::clean(root_dir.join(CONTROLLERS_DIR))
}

/// Package name a pie's controller is installed and required under.
pub fn controller_package_name(name: &str) -> String {
    format!("{}-controller", name)
}

/// Install location of a pie controller inside the controllers directory.
pub fn controller_install_path(root_dir: &Path, name: &str) -> PathBuf {
    controllers_dir(root_dir)
        .join(NODE_MODULES)
        .join(controller_package_name(name))
}

/// Source directory of a pie.
pub fn source_path(root_dir: &Path, relative_path: &Path) -> PathBuf {
    path_clean::clean(root_dir.join(relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_root_and_name() {
        let root = Path::new("/work");
        assert_eq!(install_path(root, "text-entry"), PathBuf::from("/work/node_modules/text-entry"));
        assert_eq!(controllers_dir(root), PathBuf::from("/work/controllers"));
        assert_eq!(
            controller_install_path(root, "text-entry"),
            PathBuf::from("/work/controllers/node_modules/text-entry-controller")
        );
        assert_eq!(
            installed_controller_path(root, "text-entry"),
            PathBuf::from("/work/node_modules/text-entry/controller")
        );
        assert_eq!(source_path(root, Path::new("./pies/../src")), PathBuf::from("/work/src"));
    }

    #[test]
    fn test_scoped_names_keep_their_scope() {
        let root = Path::new("/work");
        assert_eq!(
            install_path(root, "@pie/choice"),
            PathBuf::from("/work/node_modules/@pie/choice")
        );
        assert_eq!(controller_package_name("@pie/choice"), "@pie/choice-controller");
    }
}
