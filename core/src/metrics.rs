// jokko/src/metrics.rs

//! Admin dashboard figures: user counts, weekly growth and KPIs.

use crate::dedupe::dedupe_by_phone;
use crate::error::ReferralResult;
use crate::models::{UserType, CONTACT_CLICK};
use crate::store::{ProviderFilter, ReferralStore, UserFilter};
use crate::users::{users_with_roles, Role};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::instrument;

pub const MAX_GROWTH_WEEKS: usize = 8;
pub const PROVIDER_VIEW: &str = "provider_view";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
  pub total_users: usize,
  pub seekers: usize,
  pub providers: usize,
}

/// Deduplicated seekers among users created up to `up_to`, plus providers
/// created up to `up_to`. `total_users` is their sum.
#[instrument(name = "metrics::user_counts", skip(store), err(Display))]
pub async fn user_counts(store: &dyn ReferralStore, up_to: Option<DateTime<Utc>>) -> ReferralResult<UserCounts> {
  let users = users_with_roles(
    store,
    &UserFilter {
      created_until: up_to,
      ..UserFilter::default()
    },
  )
  .await?;
  let seekers = users.iter().filter(|u| u.role == Role::Seeker).count();
  let providers = store
    .count_providers(&ProviderFilter {
      created_until: up_to,
      ..ProviderFilter::default()
    })
    .await? as usize;
  Ok(UserCounts {
    total_users: seekers + providers,
    seekers,
    providers,
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
  pub date: NaiveDate,
  pub total_users: usize,
  pub seekers: usize,
  pub providers: usize,
  pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowth {
  pub data: Vec<GrowthPoint>,
  pub granularity: &'static str,
  pub total_data_points: usize,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Sunday opening the week that contains `at`.
pub fn week_start_sunday(at: DateTime<Utc>) -> NaiveDate {
  let day = at.date_naive();
  day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

/// Weekly cumulative counts from the week of the first signup, at most eight weeks.
#[instrument(name = "metrics::user_growth", skip(store), err(Display))]
pub async fn user_growth(store: &dyn ReferralStore, now: DateTime<Utc>) -> ReferralResult<UserGrowth> {
  let users = store.list_users(&UserFilter::default()).await?;
  let mut data = Vec::new();

  if let Some(first) = users.iter().map(|u| u.created_at).min() {
    let mut week_start = week_start_sunday(first);
    let mut week_number = 1;
    while midnight(week_start) <= now && week_number <= MAX_GROWTH_WEEKS {
      let last_day = week_start + Duration::days(6);
      let week_end = midnight(week_start) + Duration::days(7) - Duration::milliseconds(1);
      let counts = user_counts(store, Some(week_end)).await?;
      data.push(GrowthPoint {
        date: week_start,
        total_users: counts.total_users,
        seekers: counts.seekers,
        providers: counts.providers,
        label: format!(
          "Week {} ({} - {})",
          week_number,
          week_start.format("%b %-d"),
          last_day.format("%b %-d")
        ),
      });
      week_start += Duration::days(7);
      week_number += 1;
    }
  }

  Ok(UserGrowth {
    total_data_points: data.len(),
    data,
    granularity: "weekly",
    start_date: (now - Duration::weeks(MAX_GROWTH_WEEKS as i64)).date_naive(),
    end_date: now.date_naive(),
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
  pub date: NaiveDate,
  pub count: usize,
}

/// Distinct phone numbers signing up per day over the last `days` days, oldest first.
pub async fn daily_signups(store: &dyn ReferralStore, now: DateTime<Utc>, days: u32) -> ReferralResult<Vec<DailyCount>> {
  let today = now.date_naive();
  let first = today - Duration::days(days.saturating_sub(1) as i64);
  let users = store.list_users(&UserFilter::default()).await?;

  let mut phones_by_day: BTreeMap<NaiveDate, HashSet<String>> = BTreeMap::new();
  for user in &users {
    let day = user.created_at.date_naive();
    if day < first || day > today {
      continue;
    }
    if let Some(phone) = user.phone() {
      phones_by_day.entry(day).or_default().insert(phone.to_string());
    }
  }

  Ok(
    first
      .iter_days()
      .take(days as usize)
      .map(|date| DailyCount {
        date,
        count: phones_by_day.get(&date).map_or(0, HashSet::len),
      })
      .collect(),
  )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
  pub total_users: usize,
  pub total_providers: i64,
  /// Users whose declared type is seeker.
  pub seekers: usize,
  /// Users whose declared type is provider.
  pub providers: usize,
  pub new_users_7d: usize,
  #[serde(rename = "activeUsersDAU")]
  pub active_users_dau: usize,
  #[serde(rename = "activeUsersWAU")]
  pub active_users_wau: usize,
  #[serde(rename = "activeUsersMAU")]
  pub active_users_mau: usize,
  pub provider_views_7d: usize,
  pub contact_clicks_7d: usize,
  pub avg_recommendations_per_provider: f64,
  pub user_growth_data: Vec<DailyCount>,
  pub user_growth_data_30d: Vec<DailyCount>,
  pub unique_users: usize,
}

#[instrument(name = "metrics::kpis", skip(store), err(Display))]
pub async fn kpis(store: &dyn ReferralStore, now: DateTime<Utc>) -> ReferralResult<Kpis> {
  let users = store.list_users(&UserFilter::default()).await?;
  let seven_days_ago = now - Duration::days(7);

  let seekers = users.iter().filter(|u| u.declared_type() == UserType::Seeker).count();
  let providers = users.iter().filter(|u| u.declared_type() == UserType::Provider).count();
  let new_users_7d = users.iter().filter(|u| u.created_at >= seven_days_ago).count();
  let total_users = users.len();
  let unique_users = dedupe_by_phone(users).len();

  let total_providers = store.count_providers(&ProviderFilter::default()).await?;

  let activity = store.recommendation_activity(None).await?;
  let active_since = |since: DateTime<Utc>| -> usize {
    activity
      .iter()
      .filter(|a| a.created_at >= since)
      .filter_map(|a| a.recommender_user_id)
      .collect::<HashSet<_>>()
      .len()
  };

  let mut per_provider: HashMap<uuid::Uuid, usize> = HashMap::new();
  for a in &activity {
    *per_provider.entry(a.provider_id).or_insert(0) += 1;
  }
  let avg_recommendations_per_provider = if total_providers > 0 {
    per_provider.values().sum::<usize>() as f64 / total_providers as f64
  } else {
    0.0
  };

  let provider_views_7d = store.events_of_type(PROVIDER_VIEW, Some(seven_days_ago)).await?.len();
  let contact_clicks_7d = store.events_of_type(CONTACT_CLICK, Some(seven_days_ago)).await?.len();

  Ok(Kpis {
    total_users,
    total_providers,
    seekers,
    providers,
    new_users_7d,
    active_users_dau: active_since(now - Duration::days(1)),
    active_users_wau: active_since(seven_days_ago),
    active_users_mau: active_since(now - Duration::days(30)),
    provider_views_7d,
    contact_clicks_7d,
    avg_recommendations_per_provider,
    user_growth_data: daily_signups(store, now, 7).await?,
    user_growth_data_30d: daily_signups(store, now, 30).await?,
    unique_users,
  })
}
