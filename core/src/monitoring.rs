// jokko/src/monitoring.rs

//! Bounded in-memory log of operational events (errors, warnings, security
//! notices) surfaced on the admin monitoring endpoint.
//!
//! The log is an ordinary value owned by application state and passed to
//! whoever records into it.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{event, Level};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_RECENT_LIMIT: usize = 50;
const REPORT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Error,
  Warning,
  Info,
  Security,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringEvent {
  #[serde(rename = "type")]
  pub kind: EventKind,
  pub message: String,
  pub context: Option<String>,
  pub user_id: Option<Uuid>,
  pub metadata: serde_json::Value,
  pub timestamp: DateTime<Utc>,
}

impl MonitoringEvent {
  pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      context: None,
      user_id: None,
      metadata: serde_json::Value::Null,
      timestamp: Utc::now(),
    }
  }

  pub fn with_context(mut self, context: impl Into<String>) -> Self {
    self.context = Some(context.into());
    self
  }

  pub fn with_user(mut self, user_id: Option<Uuid>) -> Self {
    self.user_id = user_id;
    self
  }

  pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
    self.metadata = metadata;
    self
  }

  pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
    self.timestamp = timestamp;
    self
  }
}

#[derive(Debug)]
pub struct EventLog {
  capacity: usize,
  events: Mutex<VecDeque<MonitoringEvent>>,
}

impl Default for EventLog {
  fn default() -> Self {
    Self::new(DEFAULT_CAPACITY)
  }
}

impl EventLog {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      events: Mutex::new(VecDeque::with_capacity(capacity)),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.events.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.lock().is_empty()
  }

  /// Stores `entry` as the newest event, evicting the oldest past capacity,
  /// and mirrors it to `tracing`.
  pub fn record(&self, entry: MonitoringEvent) {
    let context = entry.context.as_deref().unwrap_or("-");
    match entry.kind {
      EventKind::Error => event!(Level::ERROR, context, "{}", entry.message),
      EventKind::Warning => event!(Level::WARN, context, "{}", entry.message),
      EventKind::Security => event!(Level::WARN, context, security = true, "{}", entry.message),
      EventKind::Info => event!(Level::INFO, context, "{}", entry.message),
    }

    let mut events = self.events.lock();
    events.push_front(entry);
    events.truncate(self.capacity);
  }

  pub fn error(&self, message: impl Into<String>, context: &str) {
    self.record(MonitoringEvent::new(EventKind::Error, message).with_context(context));
  }

  pub fn warning(&self, message: impl Into<String>, context: &str) {
    self.record(MonitoringEvent::new(EventKind::Warning, message).with_context(context));
  }

  pub fn info(&self, message: impl Into<String>, context: &str) {
    self.record(MonitoringEvent::new(EventKind::Info, message).with_context(context));
  }

  pub fn security(&self, message: impl Into<String>, user_id: Option<Uuid>, metadata: serde_json::Value) {
    self.record(
      MonitoringEvent::new(EventKind::Security, message)
        .with_user(user_id)
        .with_metadata(metadata),
    );
  }

  /// Newest first, optionally of one kind, at most `limit`.
  pub fn recent(&self, kind: Option<EventKind>, limit: usize) -> Vec<MonitoringEvent> {
    self
      .events
      .lock()
      .iter()
      .filter(|e| kind.map_or(true, |k| e.kind == k))
      .take(limit)
      .cloned()
      .collect()
  }

  /// Events of `kind` recorded within `window` of now.
  pub fn count_since(&self, kind: EventKind, window: Duration) -> usize {
    self.count_after(kind, Utc::now() - window)
  }

  pub fn count_after(&self, kind: EventKind, instant: DateTime<Utc>) -> usize {
    self
      .events
      .lock()
      .iter()
      .filter(|e| e.kind == kind && e.timestamp > instant)
      .count()
  }

  pub fn report(&self, now: DateTime<Utc>) -> MonitoringReport {
    let counts = |kind| WindowCounts {
      last_hour: self.count_after(kind, now - Duration::hours(1)),
      last_24_hours: self.count_after(kind, now - Duration::hours(24)),
      last_week: self.count_after(kind, now - Duration::days(7)),
    };
    MonitoringReport {
      timestamp: now,
      summary: MonitoringSummary {
        error_counts: counts(EventKind::Error),
        security_counts: counts(EventKind::Security),
      },
      recent_events: RecentEvents {
        errors: self.recent(Some(EventKind::Error), REPORT_RECENT_LIMIT),
        warnings: self.recent(Some(EventKind::Warning), REPORT_RECENT_LIMIT),
        security_events: self.recent(Some(EventKind::Security), REPORT_RECENT_LIMIT),
        info_events: self.recent(Some(EventKind::Info), REPORT_RECENT_LIMIT),
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCounts {
  pub last_hour: usize,
  pub last_24_hours: usize,
  pub last_week: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSummary {
  pub error_counts: WindowCounts,
  pub security_counts: WindowCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEvents {
  pub errors: Vec<MonitoringEvent>,
  pub warnings: Vec<MonitoringEvent>,
  pub security_events: Vec<MonitoringEvent>,
  pub info_events: Vec<MonitoringEvent>,
}

/// Payload of the admin monitoring endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
  pub timestamp: DateTime<Utc>,
  pub summary: MonitoringSummary,
  pub recent_events: RecentEvents,
}
