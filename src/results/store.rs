//! Persisted per-fingerprint failure history.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::Fingerprint;
use crate::error_handling::StoreError;

/// Failure history of one request fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub first_fail: Option<DateTime<Utc>>,
    pub fails_in_a_row: u32,
    /// Successes observed since the last failure
    pub raises: u32,
    pub last_alarm: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alarms_issued: u32,
    pub last_seen: DateTime<Utc>,
}

impl ResultEntry {
    fn first_failure(now: DateTime<Utc>) -> Self {
        Self {
            first_fail: Some(now),
            fails_in_a_row: 1,
            raises: 0,
            last_alarm: None,
            alarms_issued: 0,
            last_seen: now,
        }
    }
}

/// How long entries survive without being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Entries stay until their check recovers
    #[default]
    Indefinite,
    MaxAge(Duration),
}

impl RetentionPolicy {
    /// A max-age policy; ages too large to represent keep entries forever.
    pub fn from_hours(hours: Option<u64>) -> Self {
        hours
            .and_then(|hours| i64::try_from(hours).ok())
            .and_then(Duration::try_hours)
            .map_or(RetentionPolicy::Indefinite, RetentionPolicy::MaxAge)
    }

    fn keeps(&self, entry: &ResultEntry, now: DateTime<Utc>) -> bool {
        match self {
            RetentionPolicy::Indefinite => true,
            RetentionPolicy::MaxAge(age) => now - entry.last_seen <= *age,
        }
    }
}

/// Result entries keyed by document path, then by fingerprint.
///
/// Only failing (or recovering) requests have entries: a success for an
/// unknown fingerprint leaves the store untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsStore {
    entries: BTreeMap<String, BTreeMap<Fingerprint, ResultEntry>>,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store, starting empty when the file is missing or unreadable.
    ///
    /// A corrupt store is logged and discarded rather than failing the run:
    /// losing debounce history only risks a repeated alarm.
    pub fn load(path: &Path, retention: RetentionPolicy, now: DateTime<Utc>) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No results store at {}, starting fresh", path.display());
                return Self::new();
            }
            Err(e) => {
                log::error!("Cannot read results store {}: {}", path.display(), e);
                return Self::new();
            }
        };

        let mut store: ResultsStore = match serde_json::from_str(&text) {
            Ok(store) => store,
            Err(e) => {
                log::error!("Corrupt results store {}, starting fresh: {}", path.display(), e);
                return Self::new();
            }
        };

        let before = store.len();
        store.retain(|entry| retention.keeps(entry, now));
        if store.len() < before {
            log::info!("Dropped {} expired result entries", before - store.len());
        }
        store
    }

    /// Writes the store atomically: a temporary file in the same directory is
    /// renamed over `path`.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        log::debug!("Saved {} result entries to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, config: &str, fingerprint: &Fingerprint) -> Option<&ResultEntry> {
        self.entries.get(config)?.get(fingerprint)
    }

    /// Records a failure, creating the entry on first failure.
    pub fn record_failure(
        &mut self,
        config: &str,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> ResultEntry {
        let entry = self
            .entries
            .entry(config.to_string())
            .or_default()
            .entry(fingerprint.clone())
            .and_modify(|entry| {
                entry.fails_in_a_row += 1;
                entry.last_seen = now;
                if entry.first_fail.is_none() {
                    entry.first_fail = Some(now);
                }
            })
            .or_insert_with(|| ResultEntry::first_failure(now));
        entry.clone()
    }

    /// Records a success for a known failure, ending its failure streak.
    /// Unknown fingerprints are left alone.
    pub fn record_success(
        &mut self,
        config: &str,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Option<ResultEntry> {
        let entry = self.entries.get_mut(config)?.get_mut(fingerprint)?;
        entry.raises += 1;
        entry.fails_in_a_row = 0;
        entry.last_seen = now;
        Some(entry.clone())
    }

    pub fn mark_alarm(&mut self, config: &str, fingerprint: &Fingerprint, now: DateTime<Utc>) {
        if let Some(entry) = self
            .entries
            .get_mut(config)
            .and_then(|entries| entries.get_mut(fingerprint))
        {
            entry.last_alarm = Some(now);
            entry.alarms_issued += 1;
        }
    }

    /// Removes a recovered entry. Returns whether it existed.
    pub fn recover(&mut self, config: &str, fingerprint: &Fingerprint) -> bool {
        let Some(entries) = self.entries.get_mut(config) else {
            return false;
        };
        let removed = entries.remove(fingerprint).is_some();
        if entries.is_empty() {
            self.entries.remove(config);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fingerprint, &ResultEntry)> {
        self.entries.iter().flat_map(|(config, entries)| {
            entries
                .iter()
                .map(move |(fingerprint, entry)| (config.as_str(), fingerprint, entry))
        })
    }

    fn retain(&mut self, keep: impl Fn(&ResultEntry) -> bool) {
        for entries in self.entries.values_mut() {
            entries.retain(|_, entry| keep(entry));
        }
        self.entries.retain(|_, entries| !entries.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Headers, HttpMethod};
    use chrono::TimeZone;
    use url::Url;

    fn fp(path: &str) -> Fingerprint {
        let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
        Fingerprint::compute(HttpMethod::Get, &url, &Headers::new())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_failure_then_success_counts() {
        let mut store = ResultsStore::new();
        let key = fp("/");

        let first = store.record_failure("site.yml", &key, t0());
        assert_eq!(first.fails_in_a_row, 1);
        assert_eq!(first.first_fail, Some(t0()));

        let second = store.record_failure("site.yml", &key, t0() + Duration::minutes(5));
        assert_eq!(second.fails_in_a_row, 2);
        assert_eq!(second.first_fail, Some(t0()));

        let raised = store.record_success("site.yml", &key, t0() + Duration::minutes(10)).unwrap();
        assert_eq!(raised.raises, 1);
        assert_eq!(raised.fails_in_a_row, 0);

        // a new streak keeps the raises collected so far and the first failure
        let again = store.record_failure("site.yml", &key, t0() + Duration::minutes(15));
        assert_eq!(again.raises, 1);
        assert_eq!(again.fails_in_a_row, 1);
        assert_eq!(again.first_fail, Some(t0()));
    }

    #[test]
    fn test_success_without_entry_is_noop() {
        let mut store = ResultsStore::new();
        assert!(store.record_success("site.yml", &fp("/"), t0()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_recover_removes_entry_and_empty_namespace() {
        let mut store = ResultsStore::new();
        store.record_failure("site.yml", &fp("/"), t0());
        assert!(store.recover("site.yml", &fp("/")));
        assert!(!store.recover("site.yml", &fp("/")));
        assert!(store.is_empty());
        assert_eq!(serde_json::to_string(&store).unwrap(), "{}");
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_stats.json");

        let mut store = ResultsStore::new();
        store.record_failure("a.yml", &fp("/"), t0());
        store.mark_alarm("a.yml", &fp("/"), t0());
        store.record_failure("b.yml", &fp("/x"), t0());
        store.persist(&path).unwrap();

        let loaded = ResultsStore::load(&path, RetentionPolicy::Indefinite, t0());
        assert_eq!(loaded, store);
        let entry = loaded.get("a.yml", &fp("/")).unwrap();
        assert_eq!(entry.last_alarm, Some(t0()));
        assert_eq!(entry.alarms_issued, 1);
    }

    #[test]
    fn test_missing_and_corrupt_store_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(ResultsStore::load(&missing, RetentionPolicy::Indefinite, t0()).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(ResultsStore::load(&corrupt, RetentionPolicy::Indefinite, t0()).is_empty());
    }

    #[test]
    fn test_retention_drops_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_stats.json");

        let mut store = ResultsStore::new();
        store.record_failure("a.yml", &fp("/old"), t0());
        store.record_failure("a.yml", &fp("/new"), t0() + Duration::hours(47));
        store.persist(&path).unwrap();

        let now = t0() + Duration::hours(48);
        let kept = ResultsStore::load(&path, RetentionPolicy::from_hours(Some(24)), now);
        assert_eq!(kept.len(), 1);
        assert!(kept.get("a.yml", &fp("/new")).is_some());

        let all = ResultsStore::load(&path, RetentionPolicy::from_hours(None), now);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_retention_hours_out_of_range() {
        assert_eq!(
            RetentionPolicy::from_hours(Some(72)),
            RetentionPolicy::MaxAge(Duration::hours(72))
        );
        assert_eq!(
            RetentionPolicy::from_hours(Some(u64::MAX)),
            RetentionPolicy::Indefinite
        );
        assert_eq!(
            RetentionPolicy::from_hours(Some(i64::MAX as u64 / 3600)),
            RetentionPolicy::Indefinite
        );
    }
}
