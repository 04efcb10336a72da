//! End-of-run statistics.

use log::info;
use strum::IntoEnumIterator;

use crate::collector::RunReport;
use crate::error_handling::{FailureKind, FailureStats};

/// Logs a one-line summary of a run.
pub fn print_run_summary(report: &RunReport, elapsed_seconds: f64) {
    let requests = report.requests().count();
    let failed = report.requests().filter(|(_, r)| r.failed).count();
    info!(
        "Checked {} document{} with {} request{} ({} failed) in {:.1}s",
        report.configs.len(),
        if report.configs.len() == 1 { "" } else { "s" },
        requests,
        if requests == 1 { "" } else { "s" },
        failed,
        elapsed_seconds
    );
    print_failure_statistics(&report.stats);
}

/// Logs failure counts per kind, skipping kinds that never occurred.
pub fn print_failure_statistics(stats: &FailureStats) {
    let total = stats.total();
    if total == 0 {
        return;
    }

    info!("Failure Counts ({} total):", total);
    for kind in FailureKind::iter() {
        let count = stats.get(kind);
        if count > 0 {
            info!("   {}: {}", kind.as_str(), count);
        }
    }
}
