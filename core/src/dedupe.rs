// jokko/src/dedupe.rs

//! Collapses user records that share a phone number.

use crate::models::User;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupeKey {
  Phone(String),
  Id(Uuid),
}

fn key_of(user: &User) -> DedupeKey {
  match user.phone() {
    Some(phone) => DedupeKey::Phone(phone.to_string()),
    None => DedupeKey::Id(user.id),
  }
}

/// Keeps one canonical record per phone number: the one with the latest
/// `created_at`. A record only replaces the kept one when strictly newer, so
/// on equal timestamps the first-seen record stays. Users without a phone are
/// keyed by id and always kept.
///
/// Output follows first-seen key order.
pub fn dedupe_by_phone(users: Vec<User>) -> Vec<User> {
  let mut slots: HashMap<DedupeKey, usize> = HashMap::with_capacity(users.len());
  let mut kept: Vec<User> = Vec::with_capacity(users.len());

  for user in users {
    let key = key_of(&user);
    match slots.get(&key) {
      Some(&idx) => {
        if user.created_at > kept[idx].created_at {
          kept[idx] = user;
        }
      }
      None => {
        slots.insert(key, kept.len());
        kept.push(user);
      }
    }
  }
  kept
}
