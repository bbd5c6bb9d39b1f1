// tests/codec_tests.rs
mod common;

use common::*;
use jokko::codec::{is_phone_shaped, phone_hash, BYTEA_HEX_PREFIX, DEFAULT_HASH_SALT};
use jokko::{CodecError, PhoneCipher};

#[test]
fn test_envelope_round_trip() {
  setup_tracing();
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  assert!(cipher.has_key());

  for phone in ["+221771234567", "+14155550100", "771234567"] {
    let envelope = cipher.encode(phone).unwrap();
    assert!(envelope.starts_with(BYTEA_HEX_PREFIX));
    assert_eq!(cipher.decode(&envelope).as_deref(), Some(phone));
  }
}

#[test]
fn test_each_envelope_uses_a_fresh_nonce() {
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  let first = cipher.encode("+221771234567").unwrap();
  let second = cipher.encode("+221771234567").unwrap();
  assert_ne!(first, second);
  assert_eq!(cipher.decode(&first), cipher.decode(&second));
}

#[test]
fn test_envelope_without_prefix_still_decodes() {
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  let envelope = cipher.encode("+221771234567").unwrap();
  let bare = envelope.trim_start_matches(BYTEA_HEX_PREFIX);
  assert_eq!(cipher.decode(bare).as_deref(), Some("+221771234567"));
}

#[test]
fn test_legacy_plaintext_hex_without_key() {
  setup_tracing();
  let cipher = PhoneCipher::from_key_hex(None);
  assert!(!cipher.has_key());
  assert_eq!(
    cipher.decode(&legacy_hex("+221771234567")).as_deref(),
    Some("+221771234567")
  );
}

#[test]
fn test_legacy_plaintext_hex_with_key() {
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  assert_eq!(
    cipher.decode(&legacy_hex("+221 77 123 45 67")).as_deref(),
    Some("+221 77 123 45 67")
  );
}

#[test]
fn test_wrong_key_yields_none() {
  let sealed_with = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  let other = PhoneCipher::from_key_hex(Some(OTHER_KEY_HEX));
  let envelope = sealed_with.encode("+221771234567").unwrap();
  assert_eq!(other.decode(&envelope), None);
  assert_eq!(PhoneCipher::without_key().decode(&envelope), None);
}

#[test]
fn test_tampered_envelope_yields_none() {
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  let envelope = cipher.encode("+221771234567").unwrap();
  let mut chars: Vec<char> = envelope.chars().collect();
  let last = chars.len() - 1;
  chars[last] = if chars[last] == '0' { '1' } else { '0' };
  let tampered: String = chars.into_iter().collect();
  assert_eq!(cipher.decode(&tampered), None);
}

#[test]
fn test_garbage_never_fails_loudly() {
  let cipher = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  for input in ["", "\\x", "\\xzz", "not hex at all", "\\x0", "\\xdeadbeef"] {
    assert_eq!(cipher.decode(input), None, "input {:?}", input);
  }
  // Valid hex of text that is not a phone number.
  assert_eq!(cipher.decode(&legacy_hex("hello world")), None);
  assert_eq!(cipher.decode(&legacy_hex("12345")), None);
}

#[test]
fn test_invalid_keys_fall_back_to_keyless() {
  setup_tracing();
  assert_eq!(
    PhoneCipher::try_from_key_hex(&"zz".repeat(32)).unwrap_err(),
    CodecError::InvalidKey { expected: 64 }
  );
  assert!(!PhoneCipher::from_key_hex(Some("  ")).has_key());
  assert!(!PhoneCipher::from_key_hex(Some("g".repeat(64).as_str())).has_key());
  assert_eq!(
    PhoneCipher::without_key().encode("+221771234567").unwrap_err(),
    CodecError::MissingKey
  );
}

#[test]
fn test_hash_is_salted_with_key() {
  let keyed = PhoneCipher::from_key_hex(Some(TEST_KEY_HEX));
  let keyless = PhoneCipher::without_key();

  assert_eq!(keyed.hash("+221771234567"), phone_hash(TEST_KEY_HEX, "+221771234567"));
  assert_eq!(keyless.hash("+221771234567"), phone_hash(DEFAULT_HASH_SALT, "+221771234567"));
  assert_ne!(keyed.hash("+221771234567"), keyless.hash("+221771234567"));
  assert_eq!(keyed.hash("+221771234567").len(), 64);
}

#[test]
fn test_debug_hides_key() {
  let rendered = format!("{:?}", PhoneCipher::from_key_hex(Some(TEST_KEY_HEX)));
  assert!(!rendered.contains(TEST_KEY_HEX));
  assert!(rendered.contains("has_key: true"));
}

#[test]
fn test_phone_shape() {
  assert!(is_phone_shaped("+221771234567"));
  assert!(is_phone_shaped(" 77 123 45 67 "));
  assert!(!is_phone_shaped("+"));
  assert!(!is_phone_shaped("phone: 771234567"));
}
