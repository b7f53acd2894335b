//! Free-text and coordinate input validation.
//!
//! Normalization is idempotent: cleaning an already-normalized string
//! returns it unchanged.

use super::types::{CoordinateError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_LENGTH: usize = 2;
pub const MAX_LENGTH: usize = 100;

/// Inputs above this length get a "be more specific" hint.
const VERBOSE_INPUT_HINT: usize = 50;

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("nyc", "New York City"),
    ("la", "Los Angeles"),
    ("sf", "San Francisco"),
    ("chi", "Chicago"),
    ("philly", "Philadelphia"),
];

/// A cleaned, title-cased location name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedLocation(String);

impl NormalizedLocation {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey(self.0.to_lowercase())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased normalized name used for cache lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key read back from a data file, lower-cased so lookups still match.
    pub(crate) fn from_stored(key: &str) -> Self {
        CacheKey(key.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clean and standardize a free-text location.
pub fn clean(raw: &str) -> Result<NormalizedLocation, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let cleaned = title_case(trimmed);
    let len = cleaned.chars().count();
    if len < MIN_LENGTH {
        return Err(ValidationError::TooShort { min: MIN_LENGTH });
    }
    if len > MAX_LENGTH {
        return Err(ValidationError::TooLong { max: MAX_LENGTH });
    }
    if !cleaned.chars().all(is_allowed) {
        return Err(ValidationError::InvalidCharacters);
    }

    let lower = cleaned.to_lowercase();
    let expanded = ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == lower)
        .map(|(_, full)| full.to_string())
        .unwrap_or(cleaned);

    Ok(NormalizedLocation(expanded))
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, ' ' | '-' | '\'' | ',' | '.')
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Advisory hints for input that failed validation.
pub fn invalid_input_suggestions(raw: &str) -> Vec<String> {
    let mut hints = Vec::new();

    if raw.trim().chars().count() < MIN_LENGTH {
        hints.push("Try entering a city name (e.g., 'New York' or 'London')".to_string());
    }
    if raw.chars().any(|c| c.is_ascii_digit()) {
        hints.push("Remove numbers from location name".to_string());
    }
    if raw.chars().count() > VERBOSE_INPUT_HINT {
        hints.push("Try a shorter, more specific location name".to_string());
    }

    hints.push("Examples: 'Chicago, IL', 'Paris, France', 'Tokyo, Japan'".to_string());
    hints.push("Include state or country for better results".to_string());
    hints
}

/// Parse and range-check a textual coordinate pair.
pub fn validate_coordinates(lat: &str, lon: &str) -> Result<(f64, f64), CoordinateError> {
    let lat = parse_finite(lat)?;
    let lon = parse_finite(lon)?;
    check_coordinates(lat, lon)?;
    Ok((lat, lon))
}

/// Range-check an already numeric coordinate pair.
pub fn check_coordinates(lat: f64, lon: f64) -> Result<(), CoordinateError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(CoordinateError::NonNumeric);
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::LatitudeOutOfRange);
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::LongitudeOutOfRange);
    }
    Ok(())
}

fn parse_finite(s: &str) -> Result<f64, CoordinateError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(CoordinateError::NonNumeric)
}
