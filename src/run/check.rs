use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{error, info};

use super::{open_data, write_report};
use crate::alarms::{AlarmEngine, AlarmOutcome};
use crate::app::print_run_summary;
use crate::collector::MemoryCollector;
use crate::config::{AlarmProfiles, CheckOptions, MtaConfig, ALARMS_FILE, MTA_FILE};
use crate::notify::{render_report, EmailNotifier};
use crate::results::{ResultsStore, RetentionPolicy, StoreLock};

/// Results of a check run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Number of site documents opened
    pub documents: usize,
    /// Number of HTTP requests performed
    pub requests: usize,
    /// Whether any document, check or request failed
    pub has_errors: bool,
    /// What the alarm engine did
    pub outcome: AlarmOutcome,
    /// Entries left in the results store after the run
    pub stored_failures: usize,
    /// Path of the results store
    pub stats_path: PathBuf,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

/// Runs every site document of a data directory and raises alarms.
///
/// The sequence runs under an exclusive lock on the results store:
///
/// 1. `_alarms.yml` and `_mta.yml` are loaded; either failing aborts the run
///    before any request is made
/// 2. the stored results are loaded (a missing or corrupt store starts empty)
/// 3. all documents are run and their events collected
/// 4. when anything failed, or `output` is set, an HTML report is rendered;
///    a report that cannot be rendered or written is logged and skipped
/// 5. the alarm engine folds the run into the store and sends at most one
///    alarm
/// 6. the store is written back
///
/// # Errors
///
/// Fails on unreadable settings, a data path that isn't a directory, a lock
/// or store that cannot be written.
pub async fn run_check(options: CheckOptions) -> Result<CheckReport> {
    let start_time = Instant::now();

    if !options.data.is_dir() {
        bail!("Data path {} is not a directory", options.data.display());
    }

    let profiles = AlarmProfiles::load(&options.data.join(ALARMS_FILE))
        .context("Failed to load alarm profiles")?;
    let mta = MtaConfig::load(&options.data.join(MTA_FILE))
        .context("Failed to load MTA settings")?;
    let fallback_receivers = mta.receivers.clone();
    let notifier = EmailNotifier::new(mta);

    let _lock = StoreLock::acquire(&options.stats).with_context(|| {
        format!("Failed to lock results store {}", options.stats.display())
    })?;
    let retention = RetentionPolicy::from_hours(options.retention_hours);
    let mut store = ResultsStore::load(&options.stats, retention, Utc::now());

    info!("Opening configuration from {}", options.data.display());
    let mut collector = MemoryCollector::new();
    open_data(&mut collector, &options.data).await?;
    let report = collector.into_report();

    let engine = AlarmEngine::new(profiles);
    let mut fired = engine.update_results(&report, &mut store);
    if let Some(level) = fired.as_mut() {
        if level.alarms.mail.is_empty() && level.alarms.execute.is_empty() {
            level.alarms.mail = fallback_receivers;
        }
    }

    // report failures are logged; dispatch and persist still run
    let html = if report.has_errors || options.output.is_some() {
        match render_report(&report) {
            Ok(html) => Some(html),
            Err(e) => {
                error!("Failed to render report: {:#}", e);
                None
            }
        }
    } else {
        None
    };
    if let (Some(output), Some(html)) = (&options.output, &html) {
        if let Err(e) = write_report(output, html) {
            error!("{:#}", e);
        }
    }

    let outcome = engine
        .dispatch(&report, fired, &notifier, html.as_deref().unwrap_or_default())
        .await;

    store
        .persist(&options.stats)
        .with_context(|| format!("Failed to write results store {}", options.stats.display()))?;

    if !report.has_errors {
        info!("All checks have been completed successfully");
    }

    let elapsed_seconds = start_time.elapsed().as_secs_f64();
    print_run_summary(&report, elapsed_seconds);

    Ok(CheckReport {
        documents: report.configs.len(),
        requests: report.requests().count(),
        has_errors: report.has_errors,
        outcome,
        stored_failures: store.len(),
        stats_path: options.stats,
        elapsed_seconds,
    })
}
