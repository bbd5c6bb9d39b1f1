// jokko/src/events.rs

//! Client event tracking and the contact-click reports built on it.

use crate::error::{ReferralResult, ValidationErrors};
use crate::models::{NewTrackedEvent, TrackedEvent, CONTACT_CLICK};
use crate::store::ReferralStore;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{event, instrument, Level};
use uuid::Uuid;

pub const CHART_WEEKS: i64 = 8;

fn payload_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
  payload.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn payload_uuid(payload: &Value, key: &str) -> Option<Uuid> {
  payload_str(payload, key).and_then(|s| Uuid::parse_str(s).ok())
}

/// Persists a client event. The acting user is read from `payload.user_id`.
#[instrument(name = "events::track", skip(store, payload), err(Display))]
pub async fn track_event(store: &dyn ReferralStore, event_type: &str, payload: Option<Value>) -> ReferralResult<TrackedEvent> {
  let event_type = event_type.trim();
  if event_type.is_empty() {
    return Err(ValidationErrors::single("eventType", "Event type is required").into());
  }
  let payload = payload.filter(|p| !p.is_null()).unwrap_or_else(|| Value::Object(Default::default()));
  let user_id = payload_uuid(&payload, "user_id");

  let stored = store
    .insert_event(NewTrackedEvent {
      event_type: event_type.to_string(),
      user_id,
      payload,
    })
    .await?;
  event!(Level::DEBUG, event_id = %stored.id, "Event tracked.");
  Ok(stored)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickWindow {
  Last7Days,
  Last30Days,
  All,
}

impl ClickWindow {
  /// Missing means seven days; any unrecognised value means all time.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.unwrap_or("7d") {
      "7d" => ClickWindow::Last7Days,
      "30d" => ClickWindow::Last30Days,
      _ => ClickWindow::All,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ClickWindow::Last7Days => "7d",
      ClickWindow::Last30Days => "30d",
      ClickWindow::All => "all",
    }
  }

  pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self {
      ClickWindow::Last7Days => Some(now - Duration::days(7)),
      ClickWindow::Last30Days => Some(now - Duration::days(30)),
      ClickWindow::All => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactClick {
  pub id: Uuid,
  pub seeker_name: String,
  pub seeker_id: Option<Uuid>,
  pub provider_name: String,
  pub provider_id: Option<Uuid>,
  pub service_type: String,
  pub provider_city: Option<String>,
  pub clicked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderClicks {
  pub provider_id: Uuid,
  pub provider_name: String,
  pub clicks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactClicks {
  pub contact_clicks: Vec<ContactClick>,
  pub total: usize,
  pub filter: &'static str,
  /// Click counts per provider, most clicked first.
  pub per_provider: Vec<ProviderClicks>,
}

/// Contact clicks within `window`, newest first, resolved to seeker and provider names.
#[instrument(name = "events::contact_clicks", skip(store), err(Display))]
pub async fn contact_clicks(store: &dyn ReferralStore, window: ClickWindow, now: DateTime<Utc>) -> ReferralResult<ContactClicks> {
  let events = store.events_of_type(CONTACT_CLICK, window.since(now)).await?;

  let seeker_of = |e: &TrackedEvent| e.user_id.or_else(|| payload_uuid(&e.payload, "user_id"));
  let mut user_ids: Vec<Uuid> = events.iter().filter_map(seeker_of).collect();
  user_ids.sort();
  user_ids.dedup();
  let mut provider_ids: Vec<Uuid> = events.iter().filter_map(TrackedEvent::provider_id).collect();
  provider_ids.sort();
  provider_ids.dedup();

  let users = store.user_names(&user_ids).await?;
  let providers: HashMap<Uuid, _> = store
    .providers_by_ids(&provider_ids)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

  let clicks: Vec<ContactClick> = events
    .iter()
    .map(|e| {
      let seeker_id = seeker_of(e);
      let provider_id = e.provider_id();
      let provider = provider_id.and_then(|id| providers.get(&id));
      let seeker_name = seeker_id
        .and_then(|id| users.get(&id).cloned())
        .or_else(|| payload_str(&e.payload, "user_name").map(str::to_string))
        .unwrap_or_else(|| (if seeker_id.is_some() { "Unknown User" } else { "Guest User" }).to_string());
      ContactClick {
        id: e.id,
        seeker_name,
        seeker_id,
        provider_name: payload_str(&e.payload, "provider_name")
          .map(str::to_string)
          .or_else(|| provider.map(|p| p.name.clone()))
          .unwrap_or_else(|| "Unknown Provider".to_string()),
        provider_id,
        service_type: payload_str(&e.payload, "service_type")
          .map(str::to_string)
          .or_else(|| provider.map(|p| p.service_type.clone()))
          .unwrap_or_else(|| "unknown".to_string()),
        provider_city: provider.and_then(|p| p.city.clone()),
        clicked_at: e.created_at,
      }
    })
    .collect();

  let mut per_provider: Vec<ProviderClicks> = Vec::new();
  for click in &clicks {
    let Some(provider_id) = click.provider_id else { continue };
    match per_provider.iter_mut().find(|p| p.provider_id == provider_id) {
      Some(entry) => entry.clicks += 1,
      None => per_provider.push(ProviderClicks {
        provider_id,
        provider_name: click.provider_name.clone(),
        clicks: 1,
      }),
    }
  }
  per_provider.sort_by(|a, b| b.clicks.cmp(&a.clicks));

  Ok(ContactClicks {
    total: clicks.len(),
    contact_clicks: clicks,
    filter: window.as_str(),
    per_provider,
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCount {
  pub week: NaiveDate,
  pub count: usize,
  pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickChart {
  pub chart_data: Vec<WeekCount>,
  pub total_clicks: usize,
  pub filter: String,
}

/// Monday opening the week that contains `day`.
pub fn week_start_monday(day: NaiveDate) -> NaiveDate {
  day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Weekly contact clicks for the eight weeks ending with the current one,
/// optionally restricted to one `service_type` from the event payload.
#[instrument(name = "events::click_chart", skip(store), err(Display))]
pub async fn contact_click_chart(
  store: &dyn ReferralStore,
  service_type: Option<&str>,
  now: DateTime<Utc>,
) -> ReferralResult<ClickChart> {
  let filter = service_type.map(str::trim).filter(|s| !s.is_empty() && *s != "all");
  let events = store.events_of_type(CONTACT_CLICK, None).await?;

  let mut by_week: BTreeMap<NaiveDate, usize> = BTreeMap::new();
  for e in events
    .iter()
    .filter(|e| filter.map_or(true, |f| payload_str(&e.payload, "service_type") == Some(f)))
  {
    *by_week.entry(week_start_monday(e.created_at.date_naive())).or_insert(0) += 1;
  }

  let current = week_start_monday(now.date_naive());
  let chart_data = (0..CHART_WEEKS)
    .rev()
    .map(|back| {
      let week = current - Duration::weeks(back);
      WeekCount {
        week,
        count: by_week.get(&week).copied().unwrap_or(0),
        label: week.format("%b %-d").to_string(),
      }
    })
    .collect();

  Ok(ClickChart {
    chart_data,
    total_clicks: by_week.values().sum(),
    filter: filter.unwrap_or("all").to_string(),
  })
}
