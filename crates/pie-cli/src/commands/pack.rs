//! One-shot controller bundle build.

use crate::cli::PackArgs;
use crate::config::{ConfigOverrides, PieConfig};
use crate::dev::{ControllerMapBuilder, DevConfig};
use crate::error::Result;
use crate::ui::{self, Spinner};
use std::time::Instant;

/// Execute the pack command.
///
/// Lays down each pie's installed package, then builds
/// `controllers/controller-bundle.js` once.
///
/// # Errors
///
/// Returns the build error unchanged, so compile diagnostics reach the
/// terminal report.
pub async fn execute(args: PackArgs) -> Result<()> {
    let config = PieConfig::load(&ConfigOverrides::from(&args.project))?;
    let dev = DevConfig::from_config(config)?;

    for watch in dev.pie_watches()? {
        watch.seed().await?;
    }

    let descriptor = dev.descriptor();
    let spinner = Spinner::new(&format!(
        "Building controller bundle for {} pie(s)...",
        descriptor.pies.len()
    ));
    let start = Instant::now();

    match ControllerMapBuilder::new().build(&descriptor).await {
        Ok(artifact) => {
            let path = descriptor.controllers_dir().join(&artifact);
            let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
            spinner.finish(&format!(
                "Built {} ({}) in {}",
                path.display(),
                ui::format_size(size),
                ui::format_duration(start.elapsed())
            ));
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            spinner.fail("Controller bundle failed");
            Err(e.into())
        }
    }
}
