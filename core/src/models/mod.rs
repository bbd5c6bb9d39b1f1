// jokko/src/models/mod.rs

//! Row models shared by the core and the storage adapters.

pub mod connection;
pub mod event;
pub mod provider;
pub mod recommendation;
pub mod user;

pub use connection::{ConnectionSchema, LegacyConnection, SymmetricConnection};
pub use event::{NewTrackedEvent, TrackedEvent, CONTACT_CLICK};
pub use provider::{NewProvider, PhoneColumns, Provider, ProviderChanges};
pub use recommendation::{RecommendationActivity, RecommendationRecord};
pub use user::{User, UserType};
