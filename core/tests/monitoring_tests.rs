// tests/monitoring_tests.rs
mod common;

use chrono::Duration;
use common::*;
use jokko::monitoring::{DEFAULT_CAPACITY, DEFAULT_RECENT_LIMIT};
use jokko::{EventKind, EventLog, MonitoringEvent};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn test_newest_first_and_bounded() {
  setup_tracing();
  let log = EventLog::new(3);
  for i in 0..5 {
    log.info(format!("event {}", i), "test");
  }
  assert_eq!(log.len(), 3);
  let messages: Vec<String> = log.recent(None, 10).into_iter().map(|e| e.message).collect();
  assert_eq!(messages, vec!["event 4", "event 3", "event 2"]);
}

#[test]
fn test_default_capacity() {
  let log = EventLog::default();
  assert_eq!(log.capacity(), DEFAULT_CAPACITY);
  for i in 0..(DEFAULT_CAPACITY + 25) {
    log.warning(format!("w{}", i), "load");
  }
  assert_eq!(log.len(), DEFAULT_CAPACITY);
  assert_eq!(log.recent(None, 1)[0].message, format!("w{}", DEFAULT_CAPACITY + 24));
  assert_eq!(log.recent(None, DEFAULT_RECENT_LIMIT).len(), DEFAULT_RECENT_LIMIT);
  assert_eq!(EventLog::new(0).capacity(), 1);
}

#[test]
fn test_recent_by_kind() {
  let log = EventLog::new(10);
  log.error("db down", "listing");
  log.info("started", "server");
  let user = Uuid::new_v4();
  log.security("admin access denied", Some(user), json!({ "path": "/admin" }));
  log.error("db still down", "listing");

  let errors = log.recent(Some(EventKind::Error), 10);
  assert_eq!(errors.len(), 2);
  assert_eq!(errors[0].message, "db still down");
  assert_eq!(errors[0].context.as_deref(), Some("listing"));

  let security = log.recent(Some(EventKind::Security), 10);
  assert_eq!(security[0].user_id, Some(user));
  assert_eq!(security[0].metadata["path"], "/admin");
  assert!(log.recent(Some(EventKind::Warning), 10).is_empty());
}

#[test]
fn test_report_windows() {
  let log = EventLog::new(100);
  let now = base_time();
  for (minutes_ago, kind) in [
    (10, EventKind::Error),
    (90, EventKind::Error),
    (60 * 30, EventKind::Error),
    (60 * 24 * 8, EventKind::Error),
    (5, EventKind::Security),
    (60 * 5, EventKind::Security),
    (1, EventKind::Info),
  ] {
    log.record(MonitoringEvent::new(kind, "x").at(now - Duration::minutes(minutes_ago)));
  }

  let report = log.report(now);
  assert_eq!(report.summary.error_counts.last_hour, 1);
  assert_eq!(report.summary.error_counts.last_24_hours, 2);
  assert_eq!(report.summary.error_counts.last_week, 3);
  assert_eq!(report.summary.security_counts.last_hour, 1);
  assert_eq!(report.summary.security_counts.last_24_hours, 2);
  assert_eq!(report.recent_events.errors.len(), 4);
  assert_eq!(report.recent_events.info_events.len(), 1);

  let json = serde_json::to_value(&report).unwrap();
  assert_eq!(json["summary"]["errorCounts"]["last24Hours"], 2);
  assert_eq!(json["recentEvents"]["securityEvents"][0]["type"], "security");
}

#[test]
fn test_count_since_uses_wall_clock() {
  let log = EventLog::new(10);
  log.error("fresh", "ctx");
  log.record(MonitoringEvent::new(EventKind::Error, "stale").at(chrono::Utc::now() - Duration::hours(3)));
  assert_eq!(log.count_since(EventKind::Error, Duration::hours(1)), 1);
  assert_eq!(log.count_since(EventKind::Error, Duration::hours(4)), 2);
}

#[test]
fn test_shared_between_threads() {
  let log = Arc::new(EventLog::new(1000));
  let handles: Vec<_> = (0..4)
    .map(|t| {
      let log = log.clone();
      std::thread::spawn(move || {
        for i in 0..100 {
          log.info(format!("t{} #{}", t, i), "threads");
        }
      })
    })
    .collect();
  for h in handles {
    h.join().unwrap();
  }
  assert_eq!(log.len(), 400);
}
