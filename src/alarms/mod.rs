//! Alarm engine.
//!
//! After a check run, every performed request is turned into a success or
//! failure observation and folded into the results store. A failure fires its
//! danger level once the level's `fails` threshold is reached and the
//! debounce window since the last alarm has passed; a success clears the
//! entry after `raises` consecutive successes. Only the highest fired level
//! is delivered, once per run.

use chrono::{DateTime, Duration, Utc};

use crate::collector::{Observation, RunReport};
use crate::config::{
    AlarmProfiles, DangerLevel, ALARM_ESCALATION_DAYS, ALARM_LONG_WINDOW_DAYS, ALARM_WINDOW_HOURS,
};
use crate::notify::{send_alarm, Notifier};
use crate::results::{ResultEntry, ResultsStore};

/// What the engine did with a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmOutcome {
    /// The run had no errors
    AllClear,
    /// Errors were found but every one is debounced or below threshold
    AlreadyReported,
    /// The level with this danger fired; `delivered` counts successful deliveries
    Notified { danger: u32, delivered: usize },
}

pub struct AlarmEngine {
    profiles: AlarmProfiles,
    now: DateTime<Utc>,
}

impl AlarmEngine {
    pub fn new(profiles: AlarmProfiles) -> Self {
        Self {
            profiles,
            now: Utc::now(),
        }
    }

    /// Evaluates as if the current time were `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Folds the run's observations into `store`. Returns the highest level
    /// that fired (the first one seen among equals), if any.
    pub fn update_results(&self, report: &RunReport, store: &mut ResultsStore) -> Option<DangerLevel> {
        let mut fired: Option<DangerLevel> = None;

        for (config, request) in report.requests() {
            let Some(observation) = request.observation() else {
                continue;
            };
            let profile = self.profiles.profile(config.alarm_profile.as_deref());
            let level = profile.level_for(request.danger);
            let fingerprint = &request.fingerprint;

            match observation {
                Observation::Success => {
                    let Some(entry) = store.record_success(&config.path, fingerprint, self.now) else {
                        continue;
                    };
                    let raises_needed = level.map_or(1, |l| l.raises);
                    if entry.raises >= raises_needed {
                        store.recover(&config.path, fingerprint);
                        log::info!("{} {} recovered", request.method, request.url);
                    }
                }
                Observation::Failure => {
                    let entry = store.record_failure(&config.path, fingerprint, self.now);
                    let Some(level) = level else {
                        log::debug!("No alarm level for danger {} of {}", request.danger, request.url);
                        continue;
                    };
                    if entry.fails_in_a_row < level.fails {
                        log::debug!(
                            "{} failed {} of {} times before alarming",
                            request.url,
                            entry.fails_in_a_row,
                            level.fails
                        );
                        continue;
                    }
                    if !self.window_elapsed(&entry) {
                        log::debug!("{} already alarmed, within debounce window", request.url);
                        continue;
                    }

                    store.mark_alarm(&config.path, fingerprint, self.now);
                    if fired.as_ref().map_or(true, |f| level.danger > f.danger) {
                        fired = Some(level.clone());
                    }
                }
            }
        }

        fired
    }

    fn window_elapsed(&self, entry: &ResultEntry) -> bool {
        let long_standing = entry
            .first_fail
            .is_some_and(|first| first + Duration::days(ALARM_ESCALATION_DAYS) < self.now);
        let window = if long_standing {
            Duration::days(ALARM_LONG_WINDOW_DAYS)
        } else {
            Duration::hours(ALARM_WINDOW_HOURS)
        };
        entry.last_alarm.map_or(true, |last| self.now - last > window)
    }

    /// Delivers `html` on the fired level's channels, when the run had errors.
    pub async fn dispatch(
        &self,
        report: &RunReport,
        fired: Option<DangerLevel>,
        notifier: &dyn Notifier,
        html: &str,
    ) -> AlarmOutcome {
        if !report.has_errors {
            return AlarmOutcome::AllClear;
        }
        match fired {
            Some(level) => {
                log::warn!("Errors found, sending danger {} alarm", level.danger);
                let delivered = send_alarm(&level.alarms, notifier, html).await;
                AlarmOutcome::Notified {
                    danger: level.danger,
                    delivered,
                }
            }
            None => {
                log::warn!("Errors found but seem to be already reported");
                AlarmOutcome::AlreadyReported
            }
        }
    }

    /// [`update_results`](Self::update_results) followed by [`dispatch`](Self::dispatch).
    pub async fn process(
        &self,
        report: &RunReport,
        store: &mut ResultsStore,
        notifier: &dyn Notifier,
        html: &str,
    ) -> AlarmOutcome {
        let fired = self.update_results(report, store);
        self.dispatch(report, fired, notifier, html).await
    }
}

#[cfg(test)]
mod tests;
