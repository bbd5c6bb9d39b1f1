use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jokko::models::{ConnectionSchema, Provider, User};
use jokko::store::MemoryStore;
use jokko::{aggregate_tags, dedupe_by_phone, NetworkResolver, PhoneCipher, ProviderListing, ProviderQuery};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

const NOTES: [&str; 4] = [
  "Liked: Fast, Cheap | Watch: Late",
  "Great work. Liked: Fast, Clean",
  "Watch: Pricey, Late | Liked: Honest",
  "Came twice, no complaints",
];

fn bench_user(i: usize) -> User {
  User {
    id: Uuid::new_v4(),
    name: Some(format!("User {}", i)),
    phone_e164: Some(format!("+2217700{:05}", i % 500)),
    email: None,
    language: None,
    user_type: None,
    created_at: Utc::now() - Duration::minutes(i as i64),
  }
}

fn bench_provider(i: usize) -> Provider {
  Provider {
    id: Uuid::new_v4(),
    name: format!("Provider {}", i),
    service_type: "plumber".to_string(),
    city: Some("Dakar".to_string()),
    photo_url: None,
    phone_enc: None,
    phone_hash: None,
    owner_user_id: None,
    created_at: Utc::now() - Duration::minutes(i as i64),
    neighborhoods: Vec::new(),
    specialties: Vec::new(),
  }
}

/// A store with one caller connected to `network_size` of `users` users, and
/// `recs_per_provider` recommendations on each of 20 providers.
fn seeded_store(users: usize, network_size: usize, recs_per_provider: usize) -> (Arc<MemoryStore>, Uuid) {
  let store = Arc::new(MemoryStore::new(ConnectionSchema::Symmetric));
  let caller = bench_user(0);
  store.add_user(caller.clone());

  let people: Vec<User> = (1..=users).map(bench_user).collect();
  for (i, u) in people.iter().enumerate() {
    store.add_user(u.clone());
    if i < network_size {
      store.connect(caller.id, u.id);
    }
  }
  for p in 0..20 {
    let provider = bench_provider(p);
    for r in 0..recs_per_provider {
      let by = &people[(p * 7 + r * 13) % people.len()];
      store.add_recommendation(provider.id, Some(by.id), Some(NOTES[r % NOTES.len()]), Utc::now());
    }
    store.add_provider(provider);
  }
  (store, caller.id)
}

fn bench_provider_listing(c: &mut Criterion) {
  let mut group = c.benchmark_group("ProviderListing");
  let rt = Runtime::new().unwrap();

  for recs_per_provider in [0, 5, 25].iter() {
    let (store, caller) = seeded_store(200, 50, *recs_per_provider);
    let listing = Arc::new(ProviderListing::new(
      store,
      Arc::new(NetworkResolver::with_schema(ConnectionSchema::Symmetric)),
      None,
    ));

    group.throughput(Throughput::Elements(20));
    group.bench_with_input(
      BenchmarkId::new("page_of_20", format!("{}recs", recs_per_provider)),
      recs_per_provider,
      |b, _| {
        b.to_async(&rt).iter(|| {
          let listing = listing.clone();
          async move { listing.list(ProviderQuery::default(), Some(caller)).await.unwrap() }
        });
      },
    );
  }
  group.finish();
}

fn bench_note_aggregation(c: &mut Criterion) {
  let mut group = c.benchmark_group("NoteAggregation");
  for count in [10, 100, 1000].iter() {
    let notes: Vec<&str> = (0..*count).map(|i| NOTES[i % NOTES.len()]).collect();
    group.throughput(Throughput::Elements(*count as u64));
    group.bench_with_input(BenchmarkId::from_parameter(count), &notes, |b, notes| {
      b.iter(|| criterion::black_box(aggregate_tags(notes.iter().copied())));
    });
  }
  group.finish();
}

fn bench_dedupe(c: &mut Criterion) {
  let mut group = c.benchmark_group("DedupeByPhone");
  for count in [100, 10_000].iter() {
    let users: Vec<User> = (0..*count).map(bench_user).collect();
    group.throughput(Throughput::Elements(*count as u64));
    group.bench_with_input(BenchmarkId::from_parameter(count), &users, |b, users| {
      b.iter_batched(
        || users.clone(),
        |users| criterion::black_box(dedupe_by_phone(users)),
        criterion::BatchSize::LargeInput,
      );
    });
  }
  group.finish();
}

fn bench_phone_codec(c: &mut Criterion) {
  let mut group = c.benchmark_group("PhoneCodec");
  let cipher = PhoneCipher::from_key_hex(Some(KEY_HEX));
  let envelope = cipher.encode("+221771234567").unwrap();
  let legacy = format!("\\x{}", hex::encode("+221771234567"));

  group.bench_function("encode", |b| b.iter(|| cipher.encode(criterion::black_box("+221771234567")).unwrap()));
  group.bench_function("decode_envelope", |b| b.iter(|| cipher.decode(criterion::black_box(&envelope))));
  group.bench_function("decode_legacy_fallback", |b| b.iter(|| cipher.decode(criterion::black_box(&legacy))));
  group.finish();
}

criterion_group!(
  benches,
  bench_provider_listing,
  bench_note_aggregation,
  bench_dedupe,
  bench_phone_codec
);
criterion_main!(benches);
