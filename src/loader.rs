//! Site document loading.
//!
//! Reads site documents from a file or a data directory and runs each one
//! through a [`CheckExecutor`]. Documents that cannot be read or parsed are
//! reported to the collector and skipped; the remaining documents still run.

use std::path::{Path, PathBuf};

use crate::collector::EventCollector;
use crate::config::parse_site;
use crate::error_handling::{ConfigError, InitializationError};
use crate::executor::CheckExecutor;
use crate::initialization::init_client;

/// Returns true for `*.yml`/`*.yaml` files not starting with `_`.
///
/// Underscore files (`_alarms.yml`, `_mta.yml`) hold settings, not sites.
fn is_site_document(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('_') {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Site documents of `dir`, in file name order.
pub fn site_documents(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_site_document(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Feeds site documents to the executor.
pub struct Loader<'c> {
    collector: &'c mut dyn EventCollector,
}

impl<'c> Loader<'c> {
    pub fn new(collector: &'c mut dyn EventCollector) -> Self {
        Self { collector }
    }

    /// Runs every site document of `dir`.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be listed or an HTTP client cannot be
    /// built. Per-document problems are reported to the collector instead.
    pub async fn open_dir(&mut self, dir: &Path) -> anyhow::Result<()> {
        let documents = site_documents(dir)
            .map_err(|e| anyhow::anyhow!("Cannot list {}: {}", dir.display(), e))?;
        if documents.is_empty() {
            log::warn!("No site documents found in {}", dir.display());
        }
        for path in documents {
            self.open_file(&path).await?;
        }
        Ok(())
    }

    /// Runs a single site document.
    pub async fn open_file(&mut self, path: &Path) -> Result<(), InitializationError> {
        let label = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();

        match std::fs::read_to_string(path) {
            Ok(text) => self.open_document(&label, &text).await,
            Err(e) => {
                self.collector.open_config(&label);
                self.collector.config_error(
                    &label,
                    &ConfigError::Unreadable {
                        path: label.clone(),
                        message: e.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Parses `text` and runs its checks, reporting events under `label`.
    pub async fn open_document(&mut self, label: &str, text: &str) -> Result<(), InitializationError> {
        self.collector.open_config(label);

        let site = match parse_site(text) {
            Ok(site) => site,
            Err(e) => {
                log::debug!("Rejected {}: {}", label, e);
                self.collector.config_error(label, &e);
                return Ok(());
            }
        };

        let client = init_client(site.timeout)?;
        CheckExecutor::new(client, &mut *self.collector)
            .execute(&site)
            .await;
        Ok(())
    }
}
