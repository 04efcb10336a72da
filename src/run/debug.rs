use anyhow::{Context, Result};

use super::{open_data, write_report};
use crate::collector::{ConsoleCollector, MemoryCollector};
use crate::config::{DebugOptions, MtaConfig, MTA_FILE};
use crate::notify::{render_report, EmailNotifier, Notifier};

/// Runs checks without touching stored results.
///
/// With neither `output` nor `email` set every event is printed as it
/// happens. Otherwise events are collected and rendered as an HTML report,
/// which is written to `output` and/or mailed to `email` through the MTA of
/// the `_mta.yml` next to the data.
///
/// # Errors
///
/// Fails when `data` is neither a file nor a directory, when the report
/// cannot be written, or when the test e-mail cannot be sent. Problems in the
/// documents themselves are reported as events instead.
///
/// # Example
///
/// ```no_run
/// use site_monitor::{run_debug, DebugOptions};
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// run_debug(DebugOptions {
///     data: PathBuf::from("sites/shop.yml"),
///     ..Default::default()
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_debug(options: DebugOptions) -> Result<()> {
    if options.output.is_none() && options.email.is_none() {
        let mut collector = ConsoleCollector::new();
        return open_data(&mut collector, &options.data).await;
    }

    let mut collector = MemoryCollector::new();
    open_data(&mut collector, &options.data).await?;
    let report = collector.into_report();
    let html = render_report(&report)?;

    if let Some(output) = &options.output {
        write_report(output, &html)?;
    }

    if let Some(receiver) = &options.email {
        let settings_dir = if options.data.is_dir() {
            options.data.as_path()
        } else {
            options.data.parent().unwrap_or(options.data.as_path())
        };
        let mta = MtaConfig::load(&settings_dir.join(MTA_FILE))
            .context("Failed to load MTA settings")?;
        let notifier = EmailNotifier::new(mta);
        notifier
            .send(receiver, &html)
            .await
            .with_context(|| format!("Failed to send report to {receiver}"))?;
        log::info!("Report sent to {}", receiver);
    }

    Ok(())
}
