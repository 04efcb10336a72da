//! Run modes.
//!
//! - [`run_debug`]: runs one document or a directory and prints every event,
//!   optionally rendering a report to a file or a test e-mail
//! - [`run_check`]: runs a data directory under the results store lock,
//!   updates stored results and sends alarms

mod check;
mod debug;

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::collector::EventCollector;
use crate::loader::Loader;

pub use check::{run_check, CheckReport};
pub use debug::run_debug;

/// Runs `data` as a single document or as a directory of documents.
async fn open_data(collector: &mut dyn EventCollector, data: &Path) -> Result<()> {
    let mut loader = Loader::new(collector);
    if data.is_file() {
        loader.open_file(data).await?;
    } else if data.is_dir() {
        loader.open_dir(data).await?;
    } else {
        bail!("Data path {} is not a directory or file", data.display());
    }
    Ok(())
}

/// Writes a rendered report.
fn write_report(path: &Path, html: &str) -> Result<()> {
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
