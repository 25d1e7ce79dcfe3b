//! Live development session.
//!
//! Orchestrates the whole pipeline:
//! - Lay down each pie's installed package from its sources
//! - Mirror every later edit through the pie's watch pair
//! - Build the controller bundle, then rebuild on controller changes
//! - Push reload / error frames to the connected browser
//! - Stop on Ctrl+C

use crate::cli::ServeArgs;
use crate::config::{ConfigOverrides, PieConfig};
use crate::dev::server::static_files;
use crate::dev::{
    BuildDescriptor, Bundler, ChangeHook, ControllerMapBuilder, DevConfig, FileWatch, LiveServer,
    PackageInstaller,
};
use crate::error::Result;
use crate::ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Result of one rebuild, as reported to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Bundle built; a reload was pushed
    Reloaded,
    /// Compile errors; they were pushed
    CompileFailed(Vec<String>),
    /// Install or bundler failure; logged only
    Failed(String),
}

/// Execute the serve command.
///
/// # Process Flow
///
/// 1. Load configuration and resolve the pies
/// 2. Seed each pie's installed package
/// 3. Start one watch pair per pie plus a watch per `rebuildOn` file
/// 4. Initial controller bundle build
/// 5. Start the live server
/// 6. Rebuild loop until Ctrl+C
///
/// # Errors
///
/// Returns errors for invalid configuration, seeding failures and server
/// startup failures. Build failures are reported and the session continues.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = PieConfig::load(&ConfigOverrides::from(&args))?;
    let dev = DevConfig::from_config(config)?;
    ui::info(&format!("Workspace: {}", dev.root.display()));

    // Step 1: initial install-shaped state
    let watches = dev.pie_watches()?;
    for watch in &watches {
        let copied = watch.seed().await?;
        debug!(pie = watch.name(), copied, "seeded");
    }

    // Step 2: watches
    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let hook = rebuild_hook(trigger_tx);
    for watch in watches {
        let watch = if dev.rebuild_on_controller_change {
            watch.with_controller_hook(Arc::clone(&hook))
        } else {
            watch
        };
        watch.start();
    }
    for file in &dev.rebuild_on {
        FileWatch::new(file, Arc::clone(&hook)).start();
    }

    // Step 3: initial build
    let builder = ControllerMapBuilder::new();
    let descriptor = dev.descriptor();
    ui::info("Building controller bundle...");
    let start = Instant::now();
    match builder.build(&descriptor).await {
        Ok(artifact) => ui::success(&format!(
            "Built {} in {}",
            artifact,
            ui::format_duration(start.elapsed())
        )),
        Err(e) => ui::error(&format!("Initial build failed: {}", e)),
    }

    // Step 4: server
    let server = LiveServer::new().merge(static_files(dev.root.clone()));
    let listening = server.listen(dev.port).await?;
    ui::success(&format!("Live server running at {}", listening.url()));
    ui::info("Press Ctrl+C to stop");

    // Step 5: rebuild loop
    let rebuilds = tokio::spawn(rebuild_loop(
        builder,
        descriptor,
        server,
        trigger_rx,
        dev.debounce,
    ));

    let mut server_task = listening.task;
    tokio::select! {
        _ = signal::ctrl_c() => {
            ui::info("Shutting down...");
        }
        _ = &mut server_task => {
            ui::warning("Server task completed unexpectedly");
        }
    }

    rebuilds.abort();
    ui::success("Development session stopped");
    Ok(())
}

/// Hook that queues a rebuild for the changed path.
pub fn rebuild_hook(tx: UnboundedSender<PathBuf>) -> ChangeHook {
    Arc::new(move |path: &Path| {
        // Receiver gone means the session is shutting down.
        let _ = tx.send(path.to_path_buf());
    })
}

/// Run rebuilds for queued triggers until the channel closes.
///
/// Triggers arriving within `debounce` of the first one are folded into a
/// single build. Builds never overlap.
pub async fn rebuild_loop<I, B>(
    builder: ControllerMapBuilder<I, B>,
    descriptor: BuildDescriptor,
    server: LiveServer,
    mut triggers: UnboundedReceiver<PathBuf>,
    debounce: Duration,
) where
    I: PackageInstaller + Clone,
    B: Bundler,
{
    while let Some(first) = triggers.recv().await {
        tokio::time::sleep(debounce).await;
        let mut coalesced = 0usize;
        while triggers.try_recv().is_ok() {
            coalesced += 1;
        }
        debug!(coalesced, "rebuild triggers folded");

        ui::info(&format!("{} changed, rebuilding...", first.display()));
        rebuild_once(&builder, &descriptor, &server, &first.display().to_string()).await;
    }
}

/// Build once and tell the browser how it went.
///
/// Success pushes `reload`, compile errors push `error`, anything else is
/// only logged.
pub async fn rebuild_once<I, B>(
    builder: &ControllerMapBuilder<I, B>,
    descriptor: &BuildDescriptor,
    server: &LiveServer,
    name: &str,
) -> RebuildOutcome
where
    I: PackageInstaller + Clone,
    B: Bundler,
{
    let start = Instant::now();
    match builder.build(descriptor).await {
        Ok(artifact) => {
            ui::success(&format!(
                "Rebuilt {} in {}",
                artifact,
                ui::format_duration(start.elapsed())
            ));
            server.reload(name);
            RebuildOutcome::Reloaded
        }
        Err(e) => match e.diagnostics() {
            Some(errors) => {
                ui::diagnostics(
                    &format!("Controller bundle failed with {} error(s)", errors.len()),
                    errors,
                );
                server.error(name, errors);
                RebuildOutcome::CompileFailed(errors.to_vec())
            }
            None => {
                ui::error(&format!("Rebuild failed: {}", e));
                RebuildOutcome::Failed(e.to_string())
            }
        },
    }
}
