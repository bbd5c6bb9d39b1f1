// jokko/src/codec.rs

//! Phone envelope codec.
//!
//! Phone numbers are stored as an envelope: `\x` followed by the hex of
//! `nonce(12) ‖ tag(16) ‖ ciphertext`, sealed with AES-256-GCM. Older rows hold
//! the plain hex of the UTF-8 phone number; [`PhoneCipher::decode`] accepts both
//! and never fails loudly.

use crate::error::CodecError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{event, Level};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_HEX_LEN: usize = 64;
/// Postgres `bytea` hex output prefix.
pub const BYTEA_HEX_PREFIX: &str = "\\x";
pub const DEFAULT_HASH_SALT: &str = "jokko-default-salt";

static PHONE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{6,}$").expect("valid phone shape pattern"));

/// True when `text`, with all whitespace removed, is an optional `+` and at least six digits.
pub fn is_phone_shaped(text: &str) -> bool {
  let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
  PHONE_SHAPE.is_match(&compact)
}

/// Hex SHA-256 of `salt ‖ phone`, used to look providers up by phone without decrypting.
pub fn phone_hash(salt: &str, phone: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(salt.as_bytes());
  hasher.update(phone.as_bytes());
  hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct PhoneCipher {
  cipher: Option<Aes256Gcm>,
  salt: String,
}

impl std::fmt::Debug for PhoneCipher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PhoneCipher").field("has_key", &self.cipher.is_some()).finish()
  }
}

impl PhoneCipher {
  /// Builds a cipher from a 64-hex-char key. Any other input yields a cipher
  /// without a key: it can still decode legacy plaintext rows.
  pub fn from_key_hex(key_hex: Option<&str>) -> Self {
    match key_hex.map(str::trim).filter(|k| !k.is_empty()) {
      Some(key) => match Self::try_from_key_hex(key) {
        Ok(cipher) => cipher,
        Err(err) => {
          event!(Level::WARN, error = %err, "Ignoring invalid phone encryption key.");
          Self::without_key()
        }
      },
      None => Self::without_key(),
    }
  }

  pub fn try_from_key_hex(key_hex: &str) -> Result<Self, CodecError> {
    let invalid = CodecError::InvalidKey { expected: KEY_HEX_LEN };
    if key_hex.len() != KEY_HEX_LEN {
      return Err(invalid);
    }
    let key = hex::decode(key_hex).map_err(|_| invalid.clone())?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| invalid)?;
    Ok(Self {
      cipher: Some(cipher),
      salt: key_hex.to_string(),
    })
  }

  pub fn without_key() -> Self {
    Self {
      cipher: None,
      salt: DEFAULT_HASH_SALT.to_string(),
    }
  }

  pub fn has_key(&self) -> bool {
    self.cipher.is_some()
  }

  /// Lookup hash of `phone` salted with this cipher's key.
  pub fn hash(&self, phone: &str) -> String {
    phone_hash(&self.salt, phone)
  }

  /// Seals `phone` into a fresh envelope with a random nonce.
  pub fn encode(&self, phone: &str) -> Result<String, CodecError> {
    let cipher = self.cipher.as_ref().ok_or(CodecError::MissingKey)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    // aes-gcm appends the tag to the ciphertext; the envelope puts it first.
    let sealed = cipher.encrypt(&nonce, phone.as_bytes()).map_err(|_| CodecError::Encrypt)?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(nonce.as_slice());
    envelope.extend_from_slice(tag);
    envelope.extend_from_slice(ciphertext);
    Ok(format!("{}{}", BYTEA_HEX_PREFIX, hex::encode(envelope)))
  }

  /// Recovers a phone number from an envelope or a legacy plaintext hex row.
  /// Returns `None` whenever nothing phone-shaped can be recovered.
  pub fn decode(&self, envelope: &str) -> Option<String> {
    let body = envelope.strip_prefix(BYTEA_HEX_PREFIX).unwrap_or(envelope);
    if body.is_empty() {
      return None;
    }
    let bytes = hex::decode(body).ok()?;

    if let Some(cipher) = &self.cipher {
      if let Some(phone) = open(cipher, &bytes).filter(|p| is_phone_shaped(p)) {
        return Some(phone);
      }
    }

    let text = String::from_utf8(bytes).ok()?;
    is_phone_shaped(&text).then_some(text)
  }
}

fn open(cipher: &Aes256Gcm, bytes: &[u8]) -> Option<String> {
  if bytes.len() < NONCE_LEN + TAG_LEN {
    return None;
  }
  let (nonce, rest) = bytes.split_at(NONCE_LEN);
  let (tag, ciphertext) = rest.split_at(TAG_LEN);

  let mut sealed = Vec::with_capacity(rest.len());
  sealed.extend_from_slice(ciphertext);
  sealed.extend_from_slice(tag);

  let plain = cipher.decrypt(Nonce::from_slice(nonce), sealed.as_slice()).ok()?;
  String::from_utf8(plain).ok()
}
