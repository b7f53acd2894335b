//! Core types for the location subsystem.

use super::shortname::shorten_display_name;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Cache,
    Geocoding,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Geocoding => write!(f, "geocoding"),
        }
    }
}

/// Where a weather-ready location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    DefaultLocation,
    UserInput,
}

/// Structured address breakdown returned alongside a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetails {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub hamlet: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl AddressDetails {
    /// First non-blank settlement field, most specific kind of place first.
    pub fn place(&self) -> Option<&str> {
        [&self.city, &self.town, &self.village, &self.hamlet]
            .into_iter()
            .find_map(|f| f.as_deref().map(str::trim).filter(|p| !p.is_empty()))
    }
}

/// A single candidate returned by a geocoding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub latitude: f64,
    pub longitude: f64,
    /// Verbose, comma-separated address (e.g. "Chicago, Cook County, Illinois, United States")
    pub display_name: String,
    pub place_type: String,
    pub place_class: String,
    /// Provider relevance score (0.0 to 1.0)
    pub importance: f64,
    pub address: Option<AddressDetails>,
}

/// A resolved location, ready for a weather lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct LocationRecord {
    pub original_input: String,
    pub normalized_input: String,
    pub display_name: String,
    pub short_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub place_type: String,
}

/// A record pinned as default, favorite or history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct SavedLocation {
    #[serde(flatten)]
    pub location: LocationRecord,
    pub saved_at: DateTime<Utc>,
}

impl SavedLocation {
    pub fn now(location: LocationRecord) -> Self {
        Self {
            location,
            saved_at: Utc::now(),
        }
    }

    pub fn short_name(&self) -> &str {
        &self.location.short_name
    }
}

// ─── On-disk entry shape ────────────────────────────────────────

/// Any record shape found in a user data file.
///
/// Older files store favorites as `{name, short_name, latitude, longitude,
/// added_date}`, history with `search_date`, the default with `set_date`,
/// and cache entries with `cleaned_input` and no short name.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(default)]
    original_input: Option<String>,
    #[serde(default, alias = "cleaned_input")]
    normalized_input: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default, alias = "added_date", alias = "set_date", alias = "search_date")]
    saved_at: Option<String>,
}

/// Parse RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

impl TryFrom<StoredRecord> for SavedLocation {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let saved_at = stored
            .saved_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Ok(Self {
            location: LocationRecord::try_from(stored)?,
            saved_at,
        })
    }
}

impl TryFrom<StoredRecord> for LocationRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let display_name = stored
            .display_name
            .or(stored.name)
            .or_else(|| stored.short_name.clone())
            .ok_or("record has no display_name, name or short_name")?;
        let short_name = stored
            .short_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| shorten_display_name(&display_name));
        let normalized_input = stored.normalized_input.unwrap_or_else(|| short_name.clone());

        Ok(Self {
            original_input: stored.original_input.unwrap_or_else(|| normalized_input.clone()),
            normalized_input,
            display_name,
            short_name,
            latitude: stored.latitude,
            longitude: stored.longitude,
            place_type: stored.place_type.unwrap_or_else(|| "location".to_string()),
        })
    }
}

/// Result of reverse geocoding a coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverseAddress {
    pub display_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// An autocomplete entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub short_name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "type")]
    pub place_type: String,
    pub importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Suggestion {
    /// A suggestion without coordinates (popular or fallback entries).
    pub fn label(short_name: String, display_name: String, place_type: &str) -> Self {
        Self {
            short_name,
            display_name,
            latitude: None,
            longitude: None,
            place_type: place_type.to_string(),
            importance: 0.0,
            state: None,
            country: None,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub location: LocationRecord,
    pub source: LocationSource,
}

/// A failed resolution with advisory hints for the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct ResolutionFailure {
    pub error: LocationError,
    pub suggestions: Vec<String>,
}

impl ResolutionFailure {
    pub fn new(error: impl Into<LocationError>, suggestions: Vec<String>) -> Self {
        Self {
            error: error.into(),
            suggestions,
        }
    }
}

pub type ResolutionResult = Result<Resolved, ResolutionFailure>;

/// Coordinates handed to a weather lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: WeatherSource,
}

/// Outcome of inserting into the favorites list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    AlreadyExists,
}

/// Counts describing the persisted user state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub default_location: Option<String>,
    pub favorite_count: usize,
    pub history_count: usize,
    pub cache_count: usize,
}

// ─── Errors ─────────────────────────────────────────────────────

/// Rejected free-text location input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Location cannot be empty")]
    EmptyInput,
    #[error("Location name too short (minimum {min} characters)")]
    TooShort { min: usize },
    #[error("Location name too long (maximum {max} characters)")]
    TooLong { max: usize },
    #[error("Location contains invalid characters. Use only letters, spaces, hyphens, apostrophes, commas, and periods.")]
    InvalidCharacters,
}

/// Rejected coordinate input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Coordinates must be valid numbers")]
    NonNumeric,
    #[error("Latitude must be between -90 and 90 degrees")]
    LatitudeOutOfRange,
    #[error("Longitude must be between -180 and 180 degrees")]
    LongitudeOutOfRange,
}

/// Failure talking to the geocoding provider. Always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("Geocoding is disabled in offline mode")]
    Offline,
}

/// Failure reading or writing persisted user state.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed user data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Location resolution errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
    #[error("Could not find location '{0}'")]
    NotFound(String),
    #[error("No default location set. Please specify a location.")]
    NoDefaultLocation,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
