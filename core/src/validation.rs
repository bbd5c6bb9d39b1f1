// jokko/src/validation.rs

//! Field validation and normalisation for provider input.

use crate::error::ValidationErrors;
use once_cell::sync::Lazy;
use regex::Regex;

static SENEGAL_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+221[0-9]{9}$").expect("valid pattern"));
static US_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+1[0-9]{10}$").expect("valid pattern"));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\u{00C0}-\u{00FF}\s'-]+$").expect("valid pattern"));
static SERVICE_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s-]+$").expect("valid pattern"));
static LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s,-]+$").expect("valid pattern"));

/// Normalises a Senegalese (+221, 9 digits) or US (+1, 10 digits) number.
/// Everything except digits and `+` is dropped first; a bare 9-digit number
/// gets +221 and a bare 10-digit number gets +1.
pub fn validate_phone(raw: &str) -> Result<String, String> {
  if raw.trim().is_empty() {
    return Err("Phone number is required".to_string());
  }
  let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
  if SENEGAL_PHONE.is_match(&cleaned) || US_PHONE.is_match(&cleaned) {
    return Ok(cleaned);
  }

  let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
  if digits.chars().all(|c| c.is_ascii_digit()) {
    match digits.len() {
      9 => return Ok(format!("+221{}", digits)),
      10 => return Ok(format!("+1{}", digits)),
      _ => {}
    }
  }
  Err("Invalid phone number format. Use +221XXXXXXXXX for Senegal or +1XXXXXXXXXX for US".to_string())
}

pub fn validate_name(raw: &str) -> Result<String, String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err("Name is required".to_string());
  }
  let len = trimmed.chars().count();
  if len < 2 {
    return Err("Name must be at least 2 characters long".to_string());
  }
  if len > 100 {
    return Err("Name must be less than 100 characters".to_string());
  }
  if !NAME.is_match(trimmed) {
    return Err("Name contains invalid characters".to_string());
  }
  Ok(trimmed.to_string())
}

pub fn validate_service_type(raw: &str) -> Result<String, String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err("Service type is required".to_string());
  }
  let len = trimmed.chars().count();
  if len < 2 {
    return Err("Service type must be at least 2 characters long".to_string());
  }
  if len > 50 {
    return Err("Service type must be less than 50 characters".to_string());
  }
  if !SERVICE_TYPE.is_match(trimmed) {
    return Err("Service type contains invalid characters".to_string());
  }
  Ok(trimmed.to_string())
}

/// Optional: blank input is valid and yields `None`.
pub fn validate_location(raw: Option<&str>) -> Result<Option<String>, String> {
  let Some(trimmed) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return Ok(None);
  };
  if trimmed.chars().count() > 100 {
    return Err("Location must be less than 100 characters".to_string());
  }
  if !LOCATION.is_match(trimmed) {
    return Err("Location contains invalid characters".to_string());
  }
  Ok(Some(trimmed.to_string()))
}

/// Collects the outcome of several field checks so every failure is reported at once.
#[derive(Debug, Default)]
pub struct Validator {
  errors: ValidationErrors,
}

impl Validator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records the error of `outcome` under `field` and returns its value, if any.
  pub fn check<T>(&mut self, field: &str, outcome: Result<T, String>) -> Option<T> {
    match outcome {
      Ok(value) => Some(value),
      Err(message) => {
        self.errors.push(field, message);
        None
      }
    }
  }

  pub fn require(&mut self, field: &str, message: &str) {
    self.errors.push(field, message);
  }

  pub fn finish(self) -> Result<(), ValidationErrors> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(self.errors)
    }
  }
}
