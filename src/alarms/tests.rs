// Alarm engine scenarios.

use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::TimeZone;
use reqwest::header::HeaderMap;
use url::Url;

use super::*;
use crate::collector::{EventCollector, MemoryCollector};
use crate::config::parse_site;
use crate::error_handling::{NotifyError, ValidationFailure};
use crate::fetch::{CheckRequest, Headers, HttpMethod, RequestId, ResponseContext};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, receiver: &str, _html: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(receiver.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// One request of a synthetic run: path, danger, passed.
type Sample<'a> = (&'a str, u32, bool);

fn run_report(profile: Option<&str>, samples: &[Sample]) -> RunReport {
    let mut doc = String::from("host: www.example.pl\n");
    if let Some(profile) = profile {
        doc.push_str(&format!("alarms: {profile}\n"));
    }
    let site = parse_site(&doc).unwrap();

    let mut collector = MemoryCollector::new();
    collector.open_config("/data/example.yml");
    collector.start_site(&site);

    for (id, (path, danger, passed)) in samples.iter().enumerate() {
        let request = CheckRequest {
            id: RequestId(id as u64 + 1),
            url: site.base_url.join(path).unwrap(),
            method: HttpMethod::Get,
            headers: Headers::new(),
            danger: *danger,
            title: None,
        };
        let status = if *passed { 200 } else { 500 };
        let response = ResponseContext::new(
            Url::parse("https://www.example.pl/").unwrap(),
            status,
            HeaderMap::new(),
            Vec::new(),
        );
        collector.open_url(&request);
        collector.url_response(&request, StdDuration::from_millis(5), &response);
        if *passed {
            collector.check_success(&request, "ValidResponse");
        } else {
            collector.check_failure(
                &request,
                "ValidResponse",
                &ValidationFailure::new(format!("Invalid response status: {status}")),
                &response,
            );
        }
    }
    collector.into_report()
}

fn profiles(yaml: &str) -> AlarmProfiles {
    AlarmProfiles::from_yaml_str(yaml).unwrap()
}

const SIMPLE: &str = "default:\n  when:\n    - alarms:\n        mail: [ops@example.com]\n";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
}

async fn process_at(
    yaml: &str,
    now: DateTime<Utc>,
    report: &RunReport,
    store: &mut ResultsStore,
    notifier: &RecordingNotifier,
) -> AlarmOutcome {
    AlarmEngine::new(profiles(yaml))
        .at(now)
        .process(report, store, notifier, "<p>report</p>")
        .await
}

#[tokio::test]
async fn test_failure_is_reported_once_per_window() {
    let failed = run_report(None, &[("/", 1, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    let steps = [
        (Duration::zero(), true),
        (Duration::seconds(10), false),
        (Duration::hours(1), false),
        (Duration::hours(25), true),
        // past three days of failing the window grows to a week
        (Duration::days(4), false),
        (Duration::days(8) + Duration::hours(2), true),
    ];

    for (offset, alarmed) in steps {
        let outcome = process_at(SIMPLE, t0() + offset, &failed, &mut store, &notifier).await;
        if alarmed {
            assert_eq!(
                outcome,
                AlarmOutcome::Notified {
                    danger: 1,
                    delivered: 1
                },
                "expected an alarm at +{offset}"
            );
            assert_eq!(notifier.take(), vec!["ops@example.com"]);
        } else {
            assert_eq!(outcome, AlarmOutcome::AlreadyReported, "unexpected alarm at +{offset}");
            assert!(notifier.take().is_empty());
        }
    }

    let entry = store.iter().next().map(|(_, _, e)| e.clone()).unwrap();
    assert_eq!(entry.fails_in_a_row, 6);
    assert_eq!(entry.alarms_issued, 3);
    assert_eq!(entry.first_fail, Some(t0()));
}

#[tokio::test]
async fn test_fails_threshold() {
    let yaml = "default:\n  when:\n    - fails: 2\n      alarms:\n        mail: [ops@example.com]\n";
    let failed = run_report(None, &[("/", 1, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    let first = process_at(yaml, t0(), &failed, &mut store, &notifier).await;
    assert_eq!(first, AlarmOutcome::AlreadyReported);
    assert!(notifier.take().is_empty());

    let second = process_at(yaml, t0() + Duration::minutes(5), &failed, &mut store, &notifier).await;
    assert!(matches!(second, AlarmOutcome::Notified { danger: 1, .. }));
    assert_eq!(notifier.take(), vec!["ops@example.com"]);
}

#[tokio::test]
async fn test_failure_and_recovery() {
    let ok = run_report(None, &[("/", 1, true)]);
    let failed = run_report(None, &[("/", 1, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    assert_eq!(
        process_at(SIMPLE, t0(), &ok, &mut store, &notifier).await,
        AlarmOutcome::AllClear
    );
    assert!(store.is_empty());

    let outcome = process_at(SIMPLE, t0(), &failed, &mut store, &notifier).await;
    assert!(matches!(outcome, AlarmOutcome::Notified { .. }));
    assert_eq!(store.len(), 1);

    assert_eq!(
        process_at(SIMPLE, t0() + Duration::minutes(1), &ok, &mut store, &notifier).await,
        AlarmOutcome::AllClear
    );
    assert!(store.is_empty());
    assert_eq!(notifier.take().len(), 1);
}

#[tokio::test]
async fn test_raises_threshold() {
    let yaml = "default:\n  when:\n    - raises: 2\n      alarms:\n        mail: [ops@example.com]\n";
    let ok = run_report(None, &[("/", 1, true)]);
    let failed = run_report(None, &[("/", 1, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    process_at(yaml, t0(), &failed, &mut store, &notifier).await;
    process_at(yaml, t0() + Duration::minutes(1), &ok, &mut store, &notifier).await;
    assert_eq!(store.len(), 1);
    process_at(yaml, t0() + Duration::minutes(2), &ok, &mut store, &notifier).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_only_highest_level_is_sent() {
    let yaml = r#"
default:
  when:
    - danger: 1
      alarms:
        mail: [team@example.com]
    - danger: 5
      alarms:
        mail: [oncall@example.com, cto@example.com]
"#;
    let failed = run_report(None, &[("/blog", 1, false), ("/checkout", 7, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    let outcome = process_at(yaml, t0(), &failed, &mut store, &notifier).await;
    assert_eq!(
        outcome,
        AlarmOutcome::Notified {
            danger: 5,
            delivered: 2
        }
    );
    assert_eq!(notifier.take(), vec!["oncall@example.com", "cto@example.com"]);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_site_profile_selection() {
    let yaml = r#"
default:
  when:
    - alarms:
        mail: [default@example.com]
shop:
  when:
    - alarms:
        mail: [shop@example.com]
"#;
    let notifier = RecordingNotifier::default();

    let mut store = ResultsStore::new();
    let shop = run_report(Some("shop"), &[("/", 1, false)]);
    process_at(yaml, t0(), &shop, &mut store, &notifier).await;
    assert_eq!(notifier.take(), vec!["shop@example.com"]);

    let mut store = ResultsStore::new();
    let unknown = run_report(Some("nonexistent"), &[("/", 1, false)]);
    process_at(yaml, t0(), &unknown, &mut store, &notifier).await;
    assert_eq!(notifier.take(), vec!["default@example.com"]);
}

#[tokio::test]
async fn test_danger_below_every_level_is_recorded_but_silent() {
    let yaml = "default:\n  when:\n    - danger: 3\n      alarms:\n        mail: [ops@example.com]\n";
    let failed = run_report(None, &[("/", 1, false)]);
    let mut store = ResultsStore::new();
    let notifier = RecordingNotifier::default();

    let outcome = process_at(yaml, t0(), &failed, &mut store, &notifier).await;
    assert_eq!(outcome, AlarmOutcome::AlreadyReported);
    assert_eq!(store.len(), 1);
    assert!(notifier.take().is_empty());
}
