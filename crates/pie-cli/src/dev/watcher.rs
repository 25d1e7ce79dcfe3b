//! File system watches that mirror pie sources into install-shaped trees.
//!
//! A [`MirrorWatch`] watches a source directory recursively and reflects every
//! add, change and delete into a target directory at the same relative path.
//! Two shapes exist per pie:
//!
//! - the **package** shape mirrors the pie into `<root>/node_modules/<name>`
//!   and skips its `controller/` subtree;
//! - the **controller** shape mirrors `<pie>/controller` into
//!   `<root>/controllers/node_modules/<name>-controller`.
//!
//! [`PieWatch`] runs both, plus a copy of the controller into the installed
//! package where the bundle builder looks for it. [`FileWatch`] is a plain
//! callback on a single file, used to trigger rebuilds.
//!
//! A source root that does not exist yet (a pie without a controller, say)
//! is waited for: its parent is watched until the directory appears.
//!
//! Watch failures are logged and never propagate to the caller: a broken
//! watch must not take the dev loop down with it.

use crate::commands::utils::remove_path;
use crate::dev::layout;
use crate::error::{CliError, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Callback fired with the path that changed.
pub type ChangeHook = Arc<dyn Fn(&Path) + Send + Sync>;

/// Ignore patterns applied to every mirror.
///
/// Matched against the root-relative path in `/`-separated form with a
/// leading slash, e.g. `/lib/index.js`.
pub const DEFAULT_IGNORES: &[&str] = &[
    r"/package\.json$",
    r"/\.",
    r"/node_modules(/|$)",
    r"/docs(/|$)",
    r"\.d\.ts$",
    r"/typings(/|$)",
    r"/jsconfig\.json$",
];

#[derive(Debug, Clone)]
enum IgnoreRule {
    /// Root-relative path; matches itself and everything below it.
    Path(PathBuf),
    Pattern(Regex),
}

/// Set of rules deciding which paths a mirror skips.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreSet {
    /// An ignore set with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in rules (metadata files, dotfiles, installed deps, docs,
    /// type declarations).
    pub fn defaults() -> Self {
        let rules = DEFAULT_IGNORES
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .map(IgnoreRule::Pattern)
            .collect();
        Self { rules }
    }

    /// Add a regex rule.
    pub fn pattern(mut self, pattern: &str) -> std::result::Result<Self, regex::Error> {
        self.rules.push(IgnoreRule::Pattern(Regex::new(pattern)?));
        Ok(self)
    }

    /// Add several regex rules.
    pub fn patterns<S: AsRef<str>>(self, patterns: &[S]) -> std::result::Result<Self, regex::Error> {
        patterns
            .iter()
            .try_fold(self, |set, p| set.pattern(p.as_ref()))
    }

    /// Add a literal root-relative path rule.
    pub fn path(mut self, relative: impl Into<PathBuf>) -> Self {
        self.rules.push(IgnoreRule::Path(relative.into()));
        self
    }

    /// Whether a root-relative path is excluded from mirroring.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let slashed = slash_path(relative);
        self.rules.iter().any(|rule| match rule {
            IgnoreRule::Path(prefix) => relative.starts_with(prefix),
            IgnoreRule::Pattern(re) => re.is_match(&slashed),
        })
    }
}

/// `a/b/c` -> `/a/b/c`, with forward slashes on every platform.
fn slash_path(relative: &Path) -> String {
    let mut out = String::new();
    for component in relative.components() {
        out.push('/');
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

/// Source and target of a mirror.
#[derive(Debug, Clone)]
pub struct WatchRoots {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub ignores: IgnoreSet,
}

impl WatchRoots {
    /// Package shape: `<root>/<rel>` -> `<root>/node_modules/<name>`, minus `controller/`.
    ///
    /// A pie that contains the controllers build directory (one at the
    /// workspace root) skips that too.
    pub fn package(name: &str, relative_path: &Path, root_dir: &Path) -> Self {
        let source_root = layout::source_path(root_dir, relative_path);
        let mut ignores = IgnoreSet::defaults().path(layout::CONTROLLER_DIR);
        if let Ok(build_dir) = layout::controllers_dir(root_dir).strip_prefix(&source_root) {
            if !build_dir.as_os_str().is_empty() {
                ignores = ignores.path(build_dir);
            }
        }
        Self {
            source_root,
            target_root: layout::install_path(root_dir, name),
            ignores,
        }
    }

    /// Controller shape: `<root>/<rel>/controller` -> `<root>/controllers/node_modules/<name>-controller`.
    pub fn controller(name: &str, relative_path: &Path, root_dir: &Path) -> Self {
        Self {
            source_root: layout::source_path(root_dir, relative_path).join(layout::CONTROLLER_DIR),
            target_root: layout::controller_install_path(root_dir, name),
            ignores: IgnoreSet::defaults(),
        }
    }

    /// Installed-controller shape: `<root>/<rel>/controller` -> `<root>/node_modules/<name>/controller`.
    pub fn installed_controller(name: &str, relative_path: &Path, root_dir: &Path) -> Self {
        Self {
            source_root: layout::source_path(root_dir, relative_path).join(layout::CONTROLLER_DIR),
            target_root: layout::installed_controller_path(root_dir, name),
            ignores: IgnoreSet::defaults(),
        }
    }

    /// Append extra regex ignore rules.
    pub fn with_ignores<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.ignores = self.ignores.patterns(patterns)?;
        Ok(self)
    }

    /// Path relative to the source root, or `None` for the root itself and
    /// anything outside it.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.source_root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
    }

    /// Where a source path lands in the target tree, if it is mirrored at all.
    pub fn destination(&self, path: &Path) -> Option<PathBuf> {
        let relative = self.relative(path)?;
        if self.ignores.is_ignored(relative) {
            return None;
        }
        Some(self.target_root.join(relative))
    }
}

/// A normalized file system event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Add(PathBuf),
    Change(PathBuf),
    Unlink(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Add(p) | WatchEvent::Change(p) | WatchEvent::Unlink(p) => p,
        }
    }

    /// Translate a notify event. Metadata and access events produce nothing.
    pub fn from_notify(event: &Event) -> Vec<WatchEvent> {
        let each = |f: fn(PathBuf) -> WatchEvent| -> Vec<WatchEvent> {
            event.paths.iter().cloned().map(f).collect()
        };

        match event.kind {
            EventKind::Create(_) => each(WatchEvent::Add),
            EventKind::Remove(_) => each(WatchEvent::Unlink),
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => each(WatchEvent::Unlink),
                RenameMode::To => each(WatchEvent::Add),
                RenameMode::Both => match event.paths.as_slice() {
                    [from, to, ..] => vec![WatchEvent::Unlink(from.clone()), WatchEvent::Add(to.clone())],
                    _ => each(WatchEvent::Add),
                },
                // Platform can't tell which side of the rename this is; the
                // handler looks at the disk.
                _ => each(WatchEvent::Change),
            },
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                each(WatchEvent::Change)
            }
            EventKind::Modify(ModifyKind::Other) => each(WatchEvent::Change),
            _ => Vec::new(),
        }
    }
}

/// Mirrors one source tree into one target tree.
#[derive(Clone)]
pub struct MirrorWatch {
    roots: Arc<WatchRoots>,
    hook: Option<ChangeHook>,
}

impl MirrorWatch {
    pub fn new(roots: WatchRoots) -> Self {
        Self {
            roots: Arc::new(roots),
            hook: None,
        }
    }

    /// Call `hook` after each mirrored add, change or delete. A directory
    /// arriving at once fires it once.
    pub fn with_hook(mut self, hook: ChangeHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn roots(&self) -> &WatchRoots {
        &self.roots
    }

    /// Start watching. Errors are logged, never returned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        if let Err(e) = self.try_start() {
            error!("Failed to watch {}: {}", self.roots.source_root.display(), e);
        }
    }

    /// Start watching, reporting registration failures.
    ///
    /// Events are handled one at a time, in arrival order, on a spawned task
    /// that owns the underlying watcher. If the source root is missing, its
    /// parent is watched until the root shows up, which is then mirrored
    /// whole and watched recursively from there on.
    pub fn try_start(&self) -> Result<()> {
        let source_root = &self.roots.source_root;
        let waiting = !source_root.is_dir();
        let (registered, mode) = if waiting {
            let parent = source_root.parent().filter(|p| p.is_dir()).ok_or_else(|| {
                CliError::InvalidArgument(format!(
                    "Neither {} nor its parent directory exists",
                    source_root.display()
                ))
            })?;
            (parent.to_path_buf(), RecursiveMode::NonRecursive)
        } else {
            (source_root.clone(), RecursiveMode::Recursive)
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the watch task ended; nothing to do.
            let _ = tx.send(res);
        })?;
        watcher.watch(&registered, mode)?;

        if waiting {
            info!("Waiting for {} to appear", source_root.display());
        } else {
            info!("Watching {} -> {}", source_root.display(), self.roots.target_root.display());
        }

        let this = self.clone();
        tokio::spawn(async move {
            let mut watcher = watcher;
            let mut waiting = waiting;
            let root = this.roots.source_root.clone();
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        for change in WatchEvent::from_notify(&event) {
                            if waiting && change.path() == root && root.is_dir() {
                                match watcher.watch(&root, RecursiveMode::Recursive) {
                                    Ok(()) => {
                                        waiting = false;
                                        info!("Watching {} -> {}", root.display(), this.roots.target_root.display());
                                    }
                                    Err(e) => error!("Failed to watch {}: {}", root.display(), e),
                                }
                            }
                            if let Err(e) = this.handle(&change).await {
                                warn!("Failed to mirror {}: {}", change.path().display(), e);
                            }
                        }
                    }
                    Err(e) => error!("Watch error on {}: {}", root.display(), e),
                }
            }
            debug!("Watch on {} closed", root.display());
        });

        Ok(())
    }

    /// Apply one event to the target tree.
    ///
    /// Ignored paths and paths outside the source root are skipped. Adds and
    /// changes copy the file (creating parent directories), or every
    /// mirrored file beneath a directory; deletes remove the mirrored entry
    /// and succeed if it is already gone.
    pub async fn handle(&self, event: &WatchEvent) -> Result<()> {
        let source = event.path();
        let destination = if source == self.roots.source_root {
            Some(self.roots.target_root.clone())
        } else {
            self.roots.destination(source)
        };
        let Some(destination) = destination else {
            trace!("Skipping {}", source.display());
            return Ok(());
        };

        match event {
            WatchEvent::Add(_) | WatchEvent::Change(_) => {
                let copied = match tokio::fs::metadata(source).await {
                    Ok(meta) if meta.is_file() => {
                        copy_file(source, &destination).await?;
                        debug!("{} -> {}", source.display(), destination.display());
                        1
                    }
                    // Moves and renames report the directory, not its files.
                    Ok(meta) if meta.is_dir() => self.copy_tree(source).await?,
                    Ok(_) => 0,
                    // Gone before we got to it, e.g. a rename whose side we
                    // could not tell.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        remove_path(&destination).await?;
                        self.fire(source);
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };
                if copied > 0 {
                    self.fire(source);
                }
            }
            WatchEvent::Unlink(_) => {
                remove_path(&destination).await?;
                debug!("Removed {}", destination.display());
                self.fire(source);
            }
        }
        Ok(())
    }

    /// Copy every non-ignored file that already exists in the source tree.
    ///
    /// Watches only see changes made after they start; seeding brings the
    /// target up to date first. Returns the number of files copied.
    pub async fn seed(&self) -> Result<usize> {
        if !self.roots.source_root.is_dir() {
            return Ok(0);
        }
        self.copy_tree(&self.roots.source_root).await
    }

    /// Copy the mirrored files under `dir`, which lies in the source tree.
    async fn copy_tree(&self, dir: &Path) -> Result<usize> {
        let roots = &self.roots;
        let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_entry(|entry| match roots.relative(entry.path()) {
                Some(rel) => !roots.ignores.is_ignored(rel),
                None => true,
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        let mut copied = 0;
        for file in &files {
            if let Some(destination) = roots.destination(file) {
                copy_file(file, &destination).await?;
                copied += 1;
            }
        }
        debug!("Copied {} file(s) from {}", copied, dir.display());
        Ok(copied)
    }

    fn fire(&self, path: &Path) {
        if let Some(hook) = &self.hook {
            hook(path);
        }
    }
}

async fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, destination).await?;
    Ok(())
}

/// The package and controller mirrors of a single pie.
///
/// A third mirror keeps `<install path>/controller` in step with the
/// controller sources; that is the copy the bundle builder reads.
#[derive(Clone)]
pub struct PieWatch {
    name: String,
    package: MirrorWatch,
    controller: MirrorWatch,
    installed: MirrorWatch,
}

impl PieWatch {
    pub fn new(name: &str, relative_path: &Path, root_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            package: MirrorWatch::new(WatchRoots::package(name, relative_path, root_dir)),
            controller: MirrorWatch::new(WatchRoots::controller(name, relative_path, root_dir)),
            installed: MirrorWatch::new(WatchRoots::installed_controller(name, relative_path, root_dir)),
        }
    }

    /// Build the mirrors with extra ignore patterns.
    pub fn with_ignores<S: AsRef<str>>(
        name: &str,
        relative_path: &Path,
        root_dir: &Path,
        patterns: &[S],
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            package: MirrorWatch::new(
                WatchRoots::package(name, relative_path, root_dir).with_ignores(patterns)?,
            ),
            controller: MirrorWatch::new(
                WatchRoots::controller(name, relative_path, root_dir).with_ignores(patterns)?,
            ),
            installed: MirrorWatch::new(
                WatchRoots::installed_controller(name, relative_path, root_dir).with_ignores(patterns)?,
            ),
        })
    }

    /// Fire `hook` whenever a controller file is mirrored or removed.
    ///
    /// Both controller copies carry the hook; rebuild triggers are coalesced
    /// downstream.
    pub fn with_controller_hook(mut self, hook: ChangeHook) -> Self {
        self.controller = self.controller.with_hook(Arc::clone(&hook));
        self.installed = self.installed.with_hook(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &MirrorWatch {
        &self.package
    }

    pub fn controller(&self) -> &MirrorWatch {
        &self.controller
    }

    pub fn installed(&self) -> &MirrorWatch {
        &self.installed
    }

    /// Start every mirror.
    pub fn start(&self) {
        debug!("Starting watches for {}", self.name);
        self.package.start();
        self.controller.start();
        self.installed.start();
    }

    /// Lay down the installed package from the current sources.
    ///
    /// Seeds the package and the installed controller copy. The controller
    /// mirror target is left to the dependency install. Returns the number
    /// of files copied.
    pub async fn seed(&self) -> Result<usize> {
        Ok(self.package.seed().await? + self.installed.seed().await?)
    }
}

/// Calls back whenever one specific file changes.
pub struct FileWatch {
    filepath: PathBuf,
    on_change: ChangeHook,
}

impl FileWatch {
    pub fn new(filepath: impl AsRef<Path>, on_change: ChangeHook) -> Self {
        Self {
            filepath: path_clean::clean(filepath.as_ref()),
            on_change,
        }
    }

    pub fn path(&self) -> &Path {
        &self.filepath
    }

    /// Start watching. Errors are logged, never returned.
    pub fn start(&self) {
        if let Err(e) = self.try_start() {
            error!("Failed to watch {}: {}", self.filepath.display(), e);
        }
    }

    /// Start watching, reporting registration failures.
    ///
    /// The parent directory is watched so that editors which save by
    /// replacing the file keep triggering.
    pub fn try_start(&self) -> Result<()> {
        let file_name = self
            .filepath
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| CliError::InvalidArgument(format!("Not a file: {}", self.filepath.display())))?;
        let parent = match self.filepath.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        info!("Watching {}", self.filepath.display());

        let filepath = self.filepath.clone();
        let on_change = Arc::clone(&self.on_change);
        tokio::spawn(async move {
            let _watcher = watcher;
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                        if ours && is_change(&event.kind) {
                            trace!("{} changed", filepath.display());
                            on_change(&filepath);
                        }
                    }
                    Err(e) => error!("Watch error on {}: {}", filepath.display(), e),
                }
            }
        });

        Ok(())
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    )
}
