//! Remove the controller bundle artifact.

use crate::cli::CleanArgs;
use crate::config::{ConfigOverrides, PieConfig};
use crate::dev::{clean, layout, BUNDLE_NAME};
use crate::error::Result;
use crate::ui;

/// Execute the clean command.
///
/// Removes `controllers/controller-bundle.js` and nothing else. Succeeds if
/// there is nothing to remove.
pub async fn execute(args: CleanArgs) -> Result<()> {
    let config = PieConfig::load(&ConfigOverrides::from(&args.project))?;
    let controllers_dir = layout::controllers_dir(&config.dir);

    clean(&controllers_dir, BUNDLE_NAME).await?;

    ui::success(&format!(
        "Removed {}",
        controllers_dir.join(BUNDLE_NAME).display()
    ));
    Ok(())
}
