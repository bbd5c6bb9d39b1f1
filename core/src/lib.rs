// src/lib.rs

//! Jokko: network-ranked provider discovery for a referral platform.
//!
//! Seekers find service providers through people they are connected to.
//! This crate holds the storage-agnostic core:
//!  - the provider listing pipeline (network resolution, recommendation
//!    aggregation, note tag parsing, network ranking);
//!  - the phone envelope codec used for provider contact numbers;
//!  - the user/phone deduplicator behind every admin count;
//!  - provider administration, admin reports, event tracking and a bounded
//!    monitoring log;
//!  - a small named-step async pipeline engine the request flows run on.
//!
//! Storage is reached through [`store::ReferralStore`]. The `postgres`
//! feature derives `sqlx::FromRow` on the row models for the server's
//! Postgres adapter; [`store::MemoryStore`] backs tests and benchmarks.

pub mod codec;
pub mod dedupe;
pub mod error;
pub mod events;
pub mod listing;
pub mod metrics;
pub mod models;
pub mod monitoring;
pub mod network;
pub mod notes;
pub mod pipeline;
pub mod providers;
pub mod ranking;
pub mod store;
pub mod users;
pub mod validation;

// --- Re-exports for the Public API ---

pub use crate::codec::PhoneCipher;
pub use crate::dedupe::dedupe_by_phone;
pub use crate::error::{CodecError, PipelineError, ReferralError, ReferralResult, StoreError, ValidationErrors};
pub use crate::listing::{ProviderListing, ProviderPage, ProviderQuery, ProviderView};
pub use crate::monitoring::{EventKind, EventLog, MonitoringEvent};
pub use crate::network::{Network, NetworkResolver};
pub use crate::notes::{aggregate_tags, parse_note, NoteTags, TagTally};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult, StepPolicy};
pub use crate::providers::ProviderCatalog;
pub use crate::store::{MemoryStore, ReferralStore};
