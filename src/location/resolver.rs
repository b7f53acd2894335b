//! Location service: orchestrates the resolution pipeline.
//!
//! Resolve flow:  validate → cache → provider → short name → cache write
//! Weather flow:  default location, or resolve + history
//!
//! Every failure is returned as a [`ResolutionFailure`]; nothing escapes
//! as a panic or an unhandled provider error.

use super::autocomplete::Autocompleter;
use super::providers::GeocodingClient;
use super::shortname::shorten;
use super::store::UserLocationStore;
use super::types::{
    FavoriteOutcome, LocationError, LocationRecord, LocationSource, ResolutionFailure,
    ResolutionResult, Resolved, ReverseAddress, Suggestion, UserSummary, WeatherLocation,
    WeatherSource,
};
use super::validator::{clean, invalid_input_suggestions, validate_coordinates, NormalizedLocation};

/// The location service with its injected provider and user store.
pub struct LocationService<G> {
    geocoder: G,
    store: UserLocationStore,
    autocomplete: Autocompleter,
}

impl<G: GeocodingClient> LocationService<G> {
    pub fn new(geocoder: G, store: UserLocationStore) -> Self {
        Self {
            geocoder,
            store,
            autocomplete: Autocompleter::new(),
        }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn store(&self) -> &UserLocationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut UserLocationStore {
        &mut self.store
    }

    /// Resolve free text into a location record.
    ///
    /// A cache hit issues no provider request and writes nothing. The cache
    /// and the store file change only after a successful provider lookup.
    pub fn resolve(&mut self, raw: &str) -> ResolutionResult {
        let normalized = clean(raw)
            .map_err(|e| ResolutionFailure::new(e, invalid_input_suggestions(raw)))?;

        let key = normalized.cache_key();
        if let Some(record) = self.store.cache().get(&key) {
            tracing::debug!("using cached result for '{}'", normalized);
            return Ok(Resolved {
                location: record.clone(),
                source: LocationSource::Cache,
            });
        }

        let found = match self.geocoder.geocode(normalized.as_str()) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("geocoding '{}' failed: {}", normalized, e);
                None
            }
        };
        let Some(m) = found else {
            let suggestions = not_found_suggestions(&normalized);
            return Err(ResolutionFailure::new(
                LocationError::NotFound(normalized.into_string()),
                suggestions,
            ));
        };

        let record = LocationRecord {
            original_input: raw.to_string(),
            short_name: shorten(&m),
            normalized_input: normalized.into_string(),
            display_name: m.display_name,
            latitude: m.latitude,
            longitude: m.longitude,
            place_type: m.place_type,
        };
        tracing::debug!("geocoded '{}' to {}", record.normalized_input, record.display_name);

        self.store.cache_location(key, record.clone());
        Ok(Resolved {
            location: record,
            source: LocationSource::Geocoding,
        })
    }

    /// Coordinates for a weather lookup.
    ///
    /// Without input the saved default is used. Resolved input is pushed
    /// onto the search history.
    pub fn weather_location(
        &mut self,
        input: Option<&str>,
    ) -> Result<WeatherLocation, ResolutionFailure> {
        let Some(input) = input else {
            let Some(default) = &self.store.state().default_location else {
                return Err(ResolutionFailure::new(
                    LocationError::NoDefaultLocation,
                    vec!["Set a default location with `locator default set <location>`".to_string()],
                ));
            };
            return Ok(WeatherLocation {
                name: default.location.short_name.clone(),
                latitude: default.location.latitude,
                longitude: default.location.longitude,
                source: WeatherSource::DefaultLocation,
            });
        };

        let resolved = self.resolve(input)?;
        let loc = &resolved.location;
        let weather = WeatherLocation {
            name: loc.short_name.clone(),
            latitude: loc.latitude,
            longitude: loc.longitude,
            source: WeatherSource::UserInput,
        };
        self.store.push_history(resolved.location);
        Ok(weather)
    }

    /// Resolve `input` and remember it as the default location.
    pub fn set_default_location(&mut self, input: &str) -> Result<LocationRecord, ResolutionFailure> {
        let resolved = self.resolve(input)?;
        self.store.set_default(resolved.location.clone());
        Ok(resolved.location)
    }

    /// Resolve `input` and add it to favorites.
    pub fn add_favorite(
        &mut self,
        input: &str,
    ) -> Result<(LocationRecord, FavoriteOutcome), ResolutionFailure> {
        let resolved = self.resolve(input)?;
        let outcome = self.store.add_favorite(resolved.location.clone());
        Ok((resolved.location, outcome))
    }

    /// Autocomplete suggestions for partial input.
    pub fn suggest(&mut self, partial: &str, max: usize) -> Vec<Suggestion> {
        self.autocomplete.suggest(&self.geocoder, partial, max)
    }

    /// Record a chosen suggestion in the history.
    ///
    /// Suggestions without coordinates (popular or fallback entries) are
    /// resolved through the pipeline by their short name first.
    pub fn select_suggestion(
        &mut self,
        query: &str,
        suggestion: &Suggestion,
    ) -> Result<LocationRecord, ResolutionFailure> {
        let record = match suggestion.coordinates() {
            Some((latitude, longitude)) => LocationRecord {
                original_input: query.to_string(),
                normalized_input: clean(query)
                    .map(NormalizedLocation::into_string)
                    .unwrap_or_else(|_| query.trim().to_string()),
                display_name: suggestion.display_name.clone(),
                short_name: suggestion.short_name.clone(),
                latitude,
                longitude,
                place_type: suggestion.place_type.clone(),
            },
            None => self.resolve(&suggestion.short_name)?.location,
        };
        self.store.push_history(record.clone());
        Ok(record)
    }

    /// Address at a textual coordinate pair.
    pub fn reverse(&self, lat: &str, lon: &str) -> Result<ReverseAddress, LocationError> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let found = match self.geocoder.reverse_geocode(lat, lon) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("reverse geocoding ({}, {}) failed: {}", lat, lon, e);
                None
            }
        };
        found.ok_or_else(|| LocationError::NotFound(format!("{}, {}", lat, lon)))
    }

    pub fn clear_cache(&mut self) {
        self.store.clear_cache();
    }

    pub fn clear_history(&mut self) {
        self.store.clear_history();
    }

    pub fn summary(&self) -> UserSummary {
        self.store.summary()
    }
}

fn not_found_suggestions(name: &NormalizedLocation) -> Vec<String> {
    vec![
        format!("Check spelling of '{}'", name),
        "Try including state or country (e.g., 'Springfield, IL')".to_string(),
        "Use major city names for better results".to_string(),
        "Try alternative name (e.g., 'NYC' for New York City)".to_string(),
    ]
}
