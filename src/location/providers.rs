//! Geocoding providers: OpenStreetMap Nominatim and a fixture-backed client.

use super::types::{AddressDetails, GeocodeMatch, ProviderError, ReverseAddress};
use super::validator::check_coordinates;
use crate::config::ProviderConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a forward search is for; selects the request timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Single best-match resolution.
    Resolve,
    /// Autocomplete candidates.
    Suggest,
}

/// A source of geocoding results.
///
/// Implementations report non-success statuses and transport failures as
/// [`ProviderError`]; callers recover from them locally.
pub trait GeocodingClient {
    /// Candidate matches for `query`, best first, at most `limit`.
    fn forward_geocode(
        &self,
        query: &str,
        limit: usize,
        kind: SearchKind,
    ) -> Result<Vec<GeocodeMatch>, ProviderError>;

    /// Address at the given coordinates, if the provider knows one.
    fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseAddress>, ProviderError>;

    /// The provider's single best match for `query`.
    fn geocode(&self, query: &str) -> Result<Option<GeocodeMatch>, ProviderError> {
        Ok(self
            .forward_geocode(query, 1, SearchKind::Resolve)?
            .into_iter()
            .next())
    }
}

impl<G: GeocodingClient + ?Sized> GeocodingClient for Box<G> {
    fn forward_geocode(
        &self,
        query: &str,
        limit: usize,
        kind: SearchKind,
    ) -> Result<Vec<GeocodeMatch>, ProviderError> {
        (**self).forward_geocode(query, limit, kind)
    }

    fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseAddress>, ProviderError> {
        (**self).reverse_geocode(lat, lon)
    }
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default, rename = "class")]
    place_class: Option<String>,
    #[serde(default)]
    address: Option<AddressDetails>,
}

impl NominatimResult {
    /// Rows with unparseable or out-of-range coordinates are discarded.
    fn into_match(self) -> Option<GeocodeMatch> {
        let latitude: f64 = self.lat.trim().parse().ok()?;
        let longitude: f64 = self.lon.trim().parse().ok()?;
        if let Err(e) = check_coordinates(latitude, longitude) {
            tracing::debug!("dropping '{}': {}", self.display_name, e);
            return None;
        }

        Some(GeocodeMatch {
            latitude,
            longitude,
            display_name: self.display_name,
            place_type: self.place_type.unwrap_or_else(|| "location".to_string()),
            place_class: self.place_class.unwrap_or_default(),
            importance: self.importance.unwrap_or(0.0).clamp(0.0, 1.0),
            address: self.address,
        })
    }
}

#[derive(Deserialize, Debug)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<AddressDetails>,
}

/// Blocking Nominatim client.
pub struct NominatimClient {
    agent: ureq::Agent,
    config: ProviderConfig,
}

impl NominatimClient {
    pub fn new(config: ProviderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(&config.user_agent)
            .build();
        Self { agent, config }
    }

    fn timeout(&self, kind: SearchKind) -> Duration {
        match kind {
            SearchKind::Resolve => self.config.resolve_timeout,
            SearchKind::Suggest => self.config.suggest_timeout,
        }
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

impl GeocodingClient for NominatimClient {
    fn forward_geocode(
        &self,
        query: &str,
        limit: usize,
        kind: SearchKind,
    ) -> Result<Vec<GeocodeMatch>, ProviderError> {
        tracing::debug!("nominatim search q={:?} limit={} kind={:?}", query, limit, kind);

        let mut request = self
            .agent
            .get(&self.config.search_url)
            .timeout(self.timeout(kind))
            .query("q", query)
            .query("format", "json")
            .query("limit", &limit.max(1).to_string())
            .query("addressdetails", "1");
        if kind == SearchKind::Suggest {
            request = request.query("extratags", "1");
        }

        let response = request.call().map_err(provider_error)?;
        let rows: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().filter_map(NominatimResult::into_match).collect())
    }

    fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseAddress>, ProviderError> {
        tracing::debug!("nominatim reverse lat={} lon={}", lat, lon);

        let response = self
            .agent
            .get(&self.config.reverse_url)
            .timeout(self.config.resolve_timeout)
            .query("lat", &lat.to_string())
            .query("lon", &lon.to_string())
            .query("format", "json")
            .query("addressdetails", "1")
            .call()
            .map_err(provider_error)?;

        let body: NominatimReverse = response
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        // Nominatim answers unknown coordinates with {"error": "..."}.
        let Some(display_name) = body.display_name else {
            return Ok(None);
        };
        let address = body.address.unwrap_or_default();

        Ok(Some(ReverseAddress {
            display_name,
            city: address.place().unwrap_or_default().to_string(),
            state: address.state.unwrap_or_default(),
            country: address.country.unwrap_or_default(),
        }))
    }
}

fn provider_error(e: ureq::Error) -> ProviderError {
    match e {
        ureq::Error::Status(code, _) => ProviderError::Status(code),
        ureq::Error::Transport(t) => ProviderError::Transport(t.to_string()),
    }
}

// ─── Fixture provider ───────────────────────────────────────────

/// Serves canned results; backs offline mode and tests.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    forward: HashMap<String, Vec<GeocodeMatch>>,
    reverse: Vec<((f64, f64), ReverseAddress)>,
    failure: Option<ProviderError>,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that fails every request with `err`.
    pub fn failing(err: ProviderError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    /// A client that refuses all network work.
    pub fn offline() -> Self {
        Self::failing(ProviderError::Offline)
    }

    /// Register results for a query (matched case-insensitively).
    pub fn with_matches(mut self, query: &str, matches: Vec<GeocodeMatch>) -> Self {
        self.forward.insert(query.to_lowercase(), matches);
        self
    }

    pub fn with_reverse(mut self, lat: f64, lon: f64, address: ReverseAddress) -> Self {
        self.reverse.push(((lat, lon), address));
        self
    }

    /// Number of provider requests served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn record_call(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl GeocodingClient for StaticGeocoder {
    fn forward_geocode(
        &self,
        query: &str,
        limit: usize,
        _kind: SearchKind,
    ) -> Result<Vec<GeocodeMatch>, ProviderError> {
        self.record_call()?;
        Ok(self
            .forward
            .get(&query.to_lowercase())
            .map(|m| m.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<ReverseAddress>, ProviderError> {
        self.record_call()?;
        Ok(self
            .reverse
            .iter()
            .find(|((la, lo), _)| (la - lat).abs() < 1e-6 && (lo - lon).abs() < 1e-6)
            .map(|(_, addr)| addr.clone()))
    }
}
