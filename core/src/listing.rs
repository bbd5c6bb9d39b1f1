// jokko/src/listing.rs

//! Network-ranked provider listing.
//!
//! A listing request runs as a five-step pipeline over [`ListingCtxData`]:
//! `fetch_providers` -> `resolve_network` -> `fetch_recommendations` ->
//! `aggregate` -> `rank`. Only the provider fetch may fail the request; the
//! network and recommendation steps degrade to empty data.

use crate::error::{ReferralError, ReferralResult};
use crate::models::{Provider, RecommendationRecord};
use crate::monitoring::{EventKind, EventLog, MonitoringEvent};
use crate::network::{Network, NetworkResolver};
use crate::notes::aggregate_tags;
use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition, StepPolicy};
use crate::ranking::rank_by_network;
use crate::store::{page_offset, ProviderFilter, ReferralStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

pub const PAGE_SIZE: usize = 20;

/// Service categories the listing filter understands. Anything else is ignored.
pub const SERVICE_SLUGS: [&str; 10] = [
  "plumber",
  "cleaner",
  "nanny",
  "electrician",
  "carpenter",
  "hair",
  "henna",
  "chef",
  "hvac",
  "handyman",
];

pub const FETCH_PROVIDERS: &str = "fetch_providers";
pub const RESOLVE_NETWORK: &str = "resolve_network";
pub const FETCH_RECOMMENDATIONS: &str = "fetch_recommendations";
pub const AGGREGATE: &str = "aggregate";
pub const RANK: &str = "rank";

/// Lowercases `raw` and replaces each run of non `a-z` characters with `_`.
pub fn slugify(raw: &str) -> String {
  let mut slug = String::with_capacity(raw.len());
  let mut in_gap = false;
  for c in raw.to_lowercase().chars() {
    if c.is_ascii_lowercase() {
      slug.push(c);
      in_gap = false;
    } else if !in_gap {
      slug.push('_');
      in_gap = true;
    }
  }
  slug
}

/// The recognised category slug for `raw`, if any.
pub fn service_slug(raw: &str) -> Option<&'static str> {
  let slug = slugify(raw);
  SERVICE_SLUGS.iter().copied().find(|known| *known == slug)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQuery {
  pub q: Option<String>,
  pub service: Option<String>,
  pub city: Option<String>,
  /// 1-based.
  pub page: usize,
}

impl Default for ProviderQuery {
  fn default() -> Self {
    Self {
      q: None,
      service: None,
      city: None,
      page: 1,
    }
  }
}

impl ProviderQuery {
  /// Builds a query from raw request parameters. Blank values are dropped
  /// and a missing, unparsable or zero page becomes page 1.
  pub fn from_params(q: Option<&str>, service: Option<&str>, city: Option<&str>, page: Option<&str>) -> Self {
    let non_blank = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    Self {
      q: non_blank(q),
      service: non_blank(service),
      city: non_blank(city),
      page: page.and_then(|p| p.trim().parse::<usize>().ok()).filter(|p| *p >= 1).unwrap_or(1),
    }
  }

  pub fn offset(&self) -> i64 {
    page_offset(self.page, PAGE_SIZE)
  }

  fn filter(&self) -> ProviderFilter {
    ProviderFilter {
      name_contains: self.q.clone(),
      service_type: self.service.as_deref().and_then(service_slug).map(str::to_string),
      city: self.city.clone(),
      ..ProviderFilter::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommender {
  pub id: Option<Uuid>,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderView {
  pub id: Uuid,
  pub name: String,
  pub service_type: String,
  pub city: Option<String>,
  pub photo_url: Option<String>,
  pub neighborhoods: Vec<String>,
  pub specialties: Vec<String>,
  pub top_likes: Vec<String>,
  pub top_watch: Vec<String>,
  pub recommenders: Vec<Recommender>,
  #[serde(rename = "isNetworkRecommended")]
  pub is_network_recommended: bool,
  #[serde(rename = "networkRecommenders")]
  pub network_recommenders: Vec<Recommender>,
  #[serde(rename = "networkRecommendationCount")]
  pub network_recommendation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderPage {
  pub items: Vec<ProviderView>,
  pub page: usize,
  #[serde(rename = "pageSize")]
  pub page_size: usize,
  /// Number of items on this page.
  pub total: usize,
  #[serde(rename = "hasMore")]
  pub has_more: bool,
}

/// Builds the view of one provider from its recommendations.
pub fn provider_view(provider: Provider, recommendations: &[&RecommendationRecord], network: &Network) -> ProviderView {
  let mut recommenders = Vec::new();
  let mut network_recommenders = Vec::new();
  let mut network_count = 0u32;

  for rec in recommendations {
    let in_network = rec.recommender_user_id.is_some_and(|id| network.contains(&id));
    if in_network {
      network_count += 1;
    }
    let name = rec.display_name();
    if name == "Unknown" {
      continue;
    }
    let recommender = Recommender {
      id: rec.recommender_user_id,
      name: name.to_string(),
    };
    if in_network {
      network_recommenders.push(recommender.clone());
    }
    recommenders.push(recommender);
  }

  let tags = aggregate_tags(recommendations.iter().filter_map(|r| r.note.as_deref()));

  ProviderView {
    id: provider.id,
    name: provider.name,
    service_type: provider.service_type,
    city: provider.city,
    photo_url: provider.photo_url,
    neighborhoods: provider.neighborhoods,
    specialties: provider.specialties,
    top_likes: tags.top_likes,
    top_watch: tags.top_watch,
    recommenders,
    is_network_recommended: network_count > 0,
    network_recommenders,
    network_recommendation_count: network_count,
  }
}

/// Views for a page of providers, in the providers' order.
pub fn aggregate_page(providers: Vec<Provider>, recommendations: &[RecommendationRecord], network: &Network) -> Vec<ProviderView> {
  let mut by_provider: HashMap<Uuid, Vec<&RecommendationRecord>> = HashMap::new();
  for rec in recommendations {
    by_provider.entry(rec.provider_id).or_default().push(rec);
  }
  providers
    .into_iter()
    .map(|p| {
      let recs = by_provider.remove(&p.id).unwrap_or_default();
      provider_view(p, &recs, network)
    })
    .collect()
}

pub struct ListingCtxData {
  pub store: Arc<dyn ReferralStore>,
  pub resolver: Arc<NetworkResolver>,
  pub query: ProviderQuery,
  pub caller: Option<Uuid>,

  pub providers: Vec<Provider>,
  pub has_more: bool,
  pub network: Network,
  pub recommendations: Vec<RecommendationRecord>,
  pub items: Vec<ProviderView>,
}

impl ListingCtxData {
  pub fn new(
    store: Arc<dyn ReferralStore>,
    resolver: Arc<NetworkResolver>,
    query: ProviderQuery,
    caller: Option<Uuid>,
  ) -> Self {
    Self {
      store,
      resolver,
      query,
      caller,
      providers: Vec::new(),
      has_more: false,
      network: Network::default(),
      recommendations: Vec::new(),
      items: Vec::new(),
    }
  }
}

impl std::fmt::Debug for ListingCtxData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ListingCtxData")
      .field("query", &self.query)
      .field("caller", &self.caller)
      .field("providers", &self.providers.len())
      .field("network", &self.network.len())
      .field("recommendations", &self.recommendations.len())
      .finish()
  }
}

/// The listing pipeline with all step handlers attached. Degraded steps are
/// recorded as warnings in `events` when given.
pub fn build_listing_pipeline(events: Option<Arc<EventLog>>) -> Pipeline<ListingCtxData, ReferralError> {
  let no_providers: SkipCondition<ListingCtxData> = Arc::new(|ctx: ContextData<ListingCtxData>| ctx.read().providers.is_empty());

  let mut p = Pipeline::<ListingCtxData, ReferralError>::new(&[
    (FETCH_PROVIDERS, StepPolicy::Required, None),
    (RESOLVE_NETWORK, StepPolicy::Degradable, None),
    (FETCH_RECOMMENDATIONS, StepPolicy::Degradable, Some(no_providers)),
    (AGGREGATE, StepPolicy::Required, None),
    (RANK, StepPolicy::Required, None),
  ]);

  p.on(FETCH_PROVIDERS, |ctx: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let (store, filter, offset) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.query.filter(), guard.query.offset())
      };
      let mut providers = store.list_providers(&filter, offset, (PAGE_SIZE + 1) as i64).await?;
      let has_more = providers.len() > PAGE_SIZE;
      providers.truncate(PAGE_SIZE);
      event!(Level::DEBUG, fetched = providers.len(), has_more, "Providers fetched.");

      let mut guard = ctx.write();
      guard.providers = providers;
      guard.has_more = has_more;
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on(RESOLVE_NETWORK, |ctx: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let (store, resolver, caller) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.resolver.clone(), guard.caller)
      };
      let network = resolver.resolve(store.as_ref(), caller).await?;
      event!(Level::DEBUG, network_size = network.len(), "Network resolved.");
      ctx.write().network = network;
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on(FETCH_RECOMMENDATIONS, |ctx: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let (store, ids) = {
        let guard = ctx.read();
        let ids: Vec<Uuid> = guard.providers.iter().map(|p| p.id).collect();
        (guard.store.clone(), ids)
      };
      let recommendations = store.recommendations_for(&ids).await?;
      event!(Level::DEBUG, count = recommendations.len(), "Recommendations fetched.");
      ctx.write().recommendations = recommendations;
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on(AGGREGATE, |ctx: ContextData<ListingCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let data = &mut *guard;
      let providers = std::mem::take(&mut data.providers);
      data.items = aggregate_page(providers, &data.recommendations, &data.network);
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on(RANK, |ctx: ContextData<ListingCtxData>| {
    Box::pin(async move {
      rank_by_network(&mut ctx.write().items, |item| item.network_recommendation_count);
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  if let Some(events) = events {
    p.on_degraded(move |ctx, step, err| {
      let caller = ctx.read().caller;
      events.record(
        MonitoringEvent::new(EventKind::Warning, format!("Provider listing step '{}' degraded: {}", step, err))
          .with_context("provider_listing")
          .with_user(caller),
      );
    });
  }

  p
}

/// Entry point for provider listing requests.
pub struct ProviderListing {
  store: Arc<dyn ReferralStore>,
  resolver: Arc<NetworkResolver>,
  pipeline: Pipeline<ListingCtxData, ReferralError>,
}

impl ProviderListing {
  pub fn new(store: Arc<dyn ReferralStore>, resolver: Arc<NetworkResolver>, events: Option<Arc<EventLog>>) -> Self {
    Self {
      store,
      resolver,
      pipeline: build_listing_pipeline(events),
    }
  }

  #[instrument(
    name = "ProviderListing::list",
    skip(self, query),
    fields(page = query.page, guest = caller.is_none()),
    err(Display)
  )]
  pub async fn list(&self, query: ProviderQuery, caller: Option<Uuid>) -> ReferralResult<ProviderPage> {
    let page = query.page;
    let ctx = ContextData::new(ListingCtxData::new(self.store.clone(), self.resolver.clone(), query, caller));

    let result = self.pipeline.run(ctx.clone()).await?;
    if let PipelineResult::Completed { degraded } = &result {
      if !degraded.is_empty() {
        event!(Level::WARN, ?degraded, "Provider listing served with degraded steps.");
      }
    }

    let mut guard = ctx.write();
    let items = std::mem::take(&mut guard.items);
    Ok(ProviderPage {
      total: items.len(),
      items,
      page,
      page_size: PAGE_SIZE,
      has_more: guard.has_more,
    })
  }
}
