// jokko/src/providers.rs

//! Provider creation, update and the admin provider roster.

use crate::codec::PhoneCipher;
use crate::error::{PipelineError, ReferralError, ReferralResult, StoreError, ValidationErrors};
use crate::models::{NewProvider, PhoneColumns, Provider, ProviderChanges};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition, StepPolicy};
use crate::store::{page_count, page_offset, ProviderFilter, ReferralStore};
use crate::validation::{validate_location, validate_name, validate_phone, validate_service_type, Validator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

pub const DEFAULT_CITY: &str = "Dakar";
pub const DEFAULT_ROSTER_LIMIT: usize = 20;
const DUPLICATE_PROVIDER: &str = "Provider already exists for this user and service type";
const TOGGLE_UNSUPPORTED: &str = "Status toggle not supported for providers";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderInput {
  pub name: Option<String>,
  pub service_type: Option<String>,
  pub city: Option<String>,
  pub phone: Option<String>,
  pub owner_user_id: Option<Uuid>,
  #[serde(default)]
  pub neighborhoods: Vec<String>,
  #[serde(default)]
  pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderUpdate {
  pub name: Option<String>,
  pub service_type: Option<String>,
  pub city: Option<String>,
  pub phone: Option<String>,
  pub action: Option<String>,
}

/// Input after validation and normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProvider {
  pub name: String,
  pub service_type: String,
  pub city: String,
  pub phone: String,
}

fn trimmed_list(values: &[String]) -> Vec<String> {
  values
    .iter()
    .map(|v| v.trim())
    .filter(|v| !v.is_empty())
    .map(str::to_string)
    .collect()
}

/// Hash and, when a key is configured, envelope of a normalised phone number.
fn seal_phone(cipher: &PhoneCipher, phone: &str) -> PhoneColumns {
  let phone_enc = if cipher.has_key() {
    match cipher.encode(phone) {
      Ok(envelope) => Some(envelope),
      Err(err) => {
        event!(Level::ERROR, error = %err, "Phone encryption failed, storing hash only.");
        None
      }
    }
  } else {
    event!(Level::WARN, "No encryption key configured, skipping phone encryption.");
    None
  };
  PhoneColumns {
    phone_hash: cipher.hash(phone),
    phone_enc,
  }
}

async fn ensure_category(store: &dyn ReferralStore, service_type: &str) -> ReferralResult<()> {
  if store.service_category_exists(service_type).await? {
    Ok(())
  } else {
    Err(ValidationErrors::single("service_type", "Invalid service type").into())
  }
}

pub struct CreateProviderCtxData {
  pub store: Arc<dyn ReferralStore>,
  pub cipher: Arc<PhoneCipher>,
  pub input: ProviderInput,
  pub validated: Option<ValidatedProvider>,
  pub phone: Option<PhoneColumns>,
  pub created: Option<Provider>,
}

impl CreateProviderCtxData {
  pub fn new(store: Arc<dyn ReferralStore>, cipher: Arc<PhoneCipher>, input: ProviderInput) -> Self {
    Self {
      store,
      cipher,
      input,
      validated: None,
      phone: None,
      created: None,
    }
  }

  fn validated(&self) -> ReferralResult<ValidatedProvider> {
    self
      .validated
      .clone()
      .ok_or_else(|| PipelineError::Internal("provider input not validated".to_string()).into())
  }
}

pub fn build_create_provider_pipeline() -> Pipeline<CreateProviderCtxData, ReferralError> {
  let no_owner: SkipCondition<CreateProviderCtxData> =
    Arc::new(|ctx: ContextData<CreateProviderCtxData>| ctx.read().input.owner_user_id.is_none());

  let mut p = Pipeline::<CreateProviderCtxData, ReferralError>::new(&[
    ("validate_input", StepPolicy::Required, None),
    ("check_owner_conflict", StepPolicy::Required, Some(no_owner)),
    ("verify_service_category", StepPolicy::Required, None),
    ("seal_phone", StepPolicy::Required, None),
    ("insert_provider", StepPolicy::Required, None),
  ]);

  p.on("validate_input", |ctx: ContextData<CreateProviderCtxData>| {
    Box::pin(async move {
      let input = ctx.read().input.clone();
      let mut v = Validator::new();
      let name = v.check("name", validate_name(input.name.as_deref().unwrap_or_default()));
      let service_type = v.check(
        "service_type",
        validate_service_type(input.service_type.as_deref().unwrap_or_default()),
      );
      let phone = v.check("phone", validate_phone(input.phone.as_deref().unwrap_or_default()));
      let city = v.check("city", validate_location(input.city.as_deref()));
      v.finish()?;

      if let (Some(name), Some(service_type), Some(phone), Some(city)) = (name, service_type, phone, city) {
        ctx.write().validated = Some(ValidatedProvider {
          name,
          service_type,
          city: city.unwrap_or_else(|| DEFAULT_CITY.to_string()),
          phone,
        });
      }
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on("check_owner_conflict", |ctx: ContextData<CreateProviderCtxData>| {
    Box::pin(async move {
      let (store, owner, validated) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.input.owner_user_id, guard.validated()?)
      };
      if let Some(owner) = owner {
        if store.find_owned_provider(owner, &validated.service_type, None).await?.is_some() {
          return Err(ReferralError::Conflict(DUPLICATE_PROVIDER.to_string()));
        }
      }
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on("verify_service_category", |ctx: ContextData<CreateProviderCtxData>| {
    Box::pin(async move {
      let (store, validated) = {
        let guard = ctx.read();
        (guard.store.clone(), guard.validated()?)
      };
      ensure_category(store.as_ref(), &validated.service_type).await?;
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on("seal_phone", |ctx: ContextData<CreateProviderCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let validated = guard.validated()?;
      let sealed = seal_phone(&guard.cipher, &validated.phone);
      guard.phone = Some(sealed);
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p.on("insert_provider", |ctx: ContextData<CreateProviderCtxData>| {
    Box::pin(async move {
      let (store, row) = {
        let guard = ctx.read();
        let validated = guard.validated()?;
        let phone = guard
          .phone
          .clone()
          .ok_or_else(|| PipelineError::Internal("phone not sealed".to_string()))?;
        let row = NewProvider {
          name: validated.name,
          service_type: validated.service_type,
          city: validated.city,
          phone_hash: phone.phone_hash,
          phone_enc: phone.phone_enc,
          owner_user_id: guard.input.owner_user_id,
          neighborhoods: trimmed_list(&guard.input.neighborhoods),
          specialties: trimmed_list(&guard.input.specialties),
        };
        (guard.store.clone(), row)
      };
      let created = store.insert_provider(row).await?;
      event!(Level::INFO, provider_id = %created.id, "Provider created.");
      ctx.write().created = Some(created);
      Ok::<_, ReferralError>(PipelineControl::Continue)
    })
  });

  p
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterQuery<'a> {
  pub page: usize,
  pub limit: usize,
  pub search: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRosterRow {
  #[serde(flatten)]
  pub provider: Provider,
  /// Decrypted phone, empty when it cannot be recovered.
  pub phone_e164: String,
  pub recommendation_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRoster {
  pub providers: Vec<ProviderRosterRow>,
  pub total: i64,
  pub page: usize,
  pub total_pages: i64,
  pub limit: usize,
}

/// Provider administration: creation, update and the roster.
pub struct ProviderCatalog {
  store: Arc<dyn ReferralStore>,
  cipher: Arc<PhoneCipher>,
  create: Pipeline<CreateProviderCtxData, ReferralError>,
}

impl ProviderCatalog {
  pub fn new(store: Arc<dyn ReferralStore>, cipher: Arc<PhoneCipher>) -> Self {
    Self {
      store,
      cipher,
      create: build_create_provider_pipeline(),
    }
  }

  #[instrument(name = "ProviderCatalog::create", skip_all, fields(owner = ?input.owner_user_id), err(Display))]
  pub async fn create(&self, input: ProviderInput) -> ReferralResult<Provider> {
    let ctx = ContextData::new(CreateProviderCtxData::new(self.store.clone(), self.cipher.clone(), input));
    self.create.run(ctx.clone()).await?;
    let created = ctx.write().created.take();
    created.ok_or_else(|| PipelineError::Internal("provider creation stopped early".to_string()).into())
  }

  #[instrument(name = "ProviderCatalog::update", skip(self, update), err(Display))]
  pub async fn update(&self, id: Uuid, update: ProviderUpdate) -> ReferralResult<Provider> {
    let existing = self
      .store
      .provider_by_id(id)
      .await?
      .ok_or_else(|| ReferralError::NotFound("Provider".to_string()))?;

    if update.action.as_deref() == Some("toggle_status") {
      return Err(ReferralError::Unsupported(TOGGLE_UNSUPPORTED.to_string()));
    }

    let mut v = Validator::new();
    for (field, value) in [("name", &update.name), ("service_type", &update.service_type), ("city", &update.city)] {
      if value.as_deref().map_or(true, |s| s.trim().is_empty()) {
        v.require(field, "Missing required fields");
      }
    }
    v.finish()?;

    let mut v = Validator::new();
    let name = v.check("name", validate_name(update.name.as_deref().unwrap_or_default()));
    let service_type = v.check(
      "service_type",
      validate_service_type(update.service_type.as_deref().unwrap_or_default()),
    );
    let city = v.check("city", validate_location(update.city.as_deref()));
    let phone = match update.phone.as_deref().filter(|p| !p.trim().is_empty()) {
      Some(raw) => v.check("phone", validate_phone(raw)).map(Some),
      None => Some(None),
    };
    v.finish()?;
    let (Some(name), Some(service_type), Some(Some(city)), Some(phone)) = (name, service_type, city, phone) else {
      return Err(ValidationErrors::single("city", "Missing required fields").into());
    };

    if let Some(owner) = existing.owner_user_id {
      if self.store.find_owned_provider(owner, &service_type, Some(id)).await?.is_some() {
        return Err(ReferralError::Conflict(DUPLICATE_PROVIDER.to_string()));
      }
    }
    ensure_category(self.store.as_ref(), &service_type).await?;

    let changes = ProviderChanges {
      name,
      service_type,
      city,
      phone: phone.map(|p| seal_phone(&self.cipher, &p)),
    };
    match self.store.update_provider(id, changes).await {
      Ok(updated) => Ok(updated),
      Err(StoreError::NotFound(_)) => Err(ReferralError::NotFound("Provider".to_string())),
      Err(err) => Err(err.into()),
    }
  }

  #[instrument(name = "ProviderCatalog::roster", skip(self), err(Display))]
  pub async fn roster(&self, query: RosterQuery<'_>) -> ReferralResult<ProviderRoster> {
    let page = query.page.max(1);
    let limit = if query.limit == 0 { DEFAULT_ROSTER_LIMIT } else { query.limit };
    let filter = ProviderFilter {
      text: query.search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
      ..ProviderFilter::default()
    };

    let total = self.store.count_providers(&filter).await?;
    let providers = self
      .store
      .list_providers(&filter, page_offset(page, limit), i64::try_from(limit).unwrap_or(i64::MAX))
      .await?;
    let ids: Vec<Uuid> = providers.iter().map(|p| p.id).collect();
    let counts = self.store.recommendation_counts(&ids).await?;

    let rows = providers
      .into_iter()
      .map(|provider| ProviderRosterRow {
        phone_e164: provider
          .phone_enc
          .as_deref()
          .and_then(|enc| self.cipher.decode(enc))
          .unwrap_or_default(),
        recommendation_count: counts.get(&provider.id).copied().unwrap_or(0),
        provider,
      })
      .collect();

    Ok(ProviderRoster {
      providers: rows,
      total,
      page,
      total_pages: page_count(total, limit),
      limit,
    })
  }
}
