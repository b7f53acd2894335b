//! Autocomplete: ranking, deduplication and a per-process suggestion cache.
//!
//! Flow:  short input → popular list
//!        cache hit   → cached list verbatim
//!        provider    → filter → importance sort → dedupe by short name → truncate
//!        failure     → synthesized USA/UK/Canada fallbacks

use super::providers::{GeocodingClient, SearchKind};
use super::shortname::shorten;
use super::types::{GeocodeMatch, Suggestion};
use super::validator::{title_case, MIN_LENGTH};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

const PLACE_TYPES: &[&str] = &["city", "town", "village", "hamlet"];
const PLACE_CLASSES: &[&str] = &["place", "boundary"];

/// Shown while the user has typed fewer than two characters.
pub const POPULAR_LOCATIONS: &[&str] = &[
    "New York, NY",
    "Los Angeles, CA",
    "Chicago, IL",
    "Houston, TX",
    "Phoenix, AZ",
    "Philadelphia, PA",
    "London, UK",
    "Paris, France",
    "Tokyo, Japan",
    "Berlin, Germany",
    "Sydney, Australia",
    "Toronto, Canada",
];

const FALLBACK_REGIONS: &[(&str, &str)] = &[
    ("USA", "United States"),
    ("UK", "United Kingdom"),
    ("Canada", "Canada"),
];

fn is_settlement(m: &GeocodeMatch) -> bool {
    PLACE_TYPES.contains(&m.place_type.as_str()) || PLACE_CLASSES.contains(&m.place_class.as_str())
}

/// Rank raw provider candidates into at most `max` unique suggestions.
///
/// Output is non-increasing by importance; ties keep provider order and the
/// first occurrence of each short name wins.
pub fn rank(candidates: &[GeocodeMatch], max: usize) -> Vec<Suggestion> {
    let mut ranked: Vec<Suggestion> = candidates
        .iter()
        .filter(|m| is_settlement(m))
        .map(|m| Suggestion {
            short_name: shorten(m),
            display_name: m.display_name.clone(),
            latitude: Some(m.latitude),
            longitude: Some(m.longitude),
            place_type: m.place_type.clone(),
            importance: m.importance,
            state: m.address.as_ref().and_then(|a| a.state.clone()),
            country: m.address.as_ref().and_then(|a| a.country.clone()),
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|s| seen.insert(s.short_name.clone()))
        .take(max)
        .collect()
}

/// Popular locations containing `partial` (case-insensitive).
pub fn popular_suggestions(partial: &str, max: usize) -> Vec<Suggestion> {
    let needle = partial.trim().to_lowercase();
    POPULAR_LOCATIONS
        .iter()
        .filter(|loc| loc.to_lowercase().contains(&needle))
        .take(max)
        .map(|loc| Suggestion::label(loc.to_string(), loc.to_string(), "popular"))
        .collect()
}

/// Placeholder suggestions used when the provider cannot be reached.
pub fn fallback_suggestions(partial: &str, max: usize) -> Vec<Suggestion> {
    let name = title_case(partial.trim());
    FALLBACK_REGIONS
        .iter()
        .take(max)
        .map(|(short, long)| {
            Suggestion::label(
                format!("{}, {}", name, short),
                format!("{}, {}", name, long),
                "fallback",
            )
        })
        .collect()
}

/// Suggestion engine with an unbounded cache keyed by `(input, max)`.
#[derive(Debug, Default)]
pub struct Autocompleter {
    cache: HashMap<(String, usize), Vec<Suggestion>>,
}

impl Autocompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggestions for what the user has typed so far.
    pub fn suggest<G: GeocodingClient + ?Sized>(
        &mut self,
        geocoder: &G,
        partial: &str,
        max: usize,
    ) -> Vec<Suggestion> {
        let trimmed = partial.trim();
        if trimmed.chars().count() < MIN_LENGTH {
            return popular_suggestions(trimmed, max);
        }

        let key = (trimmed.to_lowercase(), max);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("autocomplete cache hit for {:?}", key.0);
            return cached.clone();
        }

        match geocoder.forward_geocode(trimmed, max.saturating_mul(2), SearchKind::Suggest) {
            Ok(candidates) => {
                let suggestions = rank(&candidates, max);
                self.cache.insert(key, suggestions.clone());
                suggestions
            }
            Err(e) => {
                tracing::warn!("autocomplete provider error for {:?}: {}", trimmed, e);
                fallback_suggestions(trimmed, max)
            }
        }
    }

    /// Number of cached `(input, max)` entries.
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::providers::StaticGeocoder;
    use crate::location::types::{AddressDetails, ProviderError};

    fn candidate(display_name: &str, place_type: &str, place_class: &str, importance: f64) -> GeocodeMatch {
        GeocodeMatch {
            latitude: 1.0,
            longitude: 2.0,
            display_name: display_name.into(),
            place_type: place_type.into(),
            place_class: place_class.into(),
            importance,
            address: None,
        }
    }

    fn sample() -> Vec<GeocodeMatch> {
        vec![
            candidate("Paris, Lamar County, Texas, United States", "city", "place", 0.45),
            candidate("Paris, Ile-de-France, Metropolitan France, France", "city", "place", 0.93),
            candidate("Paris Las Vegas, Las Vegas Boulevard, Nevada, United States", "hotel", "tourism", 0.99),
            candidate("Paris, Henry County, Tennessee, United States", "town", "place", 0.45),
            candidate("Paris, Ile-de-France, France", "administrative", "boundary", 0.80),
        ]
    }

    #[test]
    fn test_rank_filters_non_settlements() {
        let ranked = rank(&sample(), 10);
        assert!(ranked.iter().all(|s| s.place_type != "hotel"));
        assert_eq!(ranked.len(), 4);
    }

    #[test]
    fn test_rank_sorted_and_unique() {
        let mut input = sample();
        input.push(candidate("Paris, Somewhere, Metropolitan France, France", "village", "place", 0.10));
        let ranked = rank(&input, 10);

        assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
        let names: HashSet<&str> = ranked.iter().map(|s| s.short_name.as_str()).collect();
        assert_eq!(names.len(), ranked.len());
        // the 0.93 entry owns "Paris, Metropolitan France"; the 0.10 duplicate is dropped
        assert_eq!(ranked[0].short_name, "Paris, Metropolitan France");
        assert!(ranked.iter().all(|s| s.importance != 0.10));
    }

    #[test]
    fn test_rank_ties_keep_provider_order() {
        let ranked = rank(&sample(), 10);
        let tied: Vec<&str> = ranked
            .iter()
            .filter(|s| s.importance == 0.45)
            .map(|s| s.short_name.as_str())
            .collect();
        assert_eq!(tied, ["Paris, Texas", "Paris, Tennessee"]);
    }

    #[test]
    fn test_rank_truncates() {
        assert_eq!(rank(&sample(), 2).len(), 2);
        assert!(rank(&sample(), 0).is_empty());
    }

    #[test]
    fn test_rank_uses_address_breakdown() {
        let mut m = candidate("Toronto, Golden Horseshoe, Ontario, Canada", "city", "place", 0.7);
        m.address = Some(AddressDetails {
            city: Some("Toronto".into()),
            state: Some("Ontario".into()),
            country: Some("Canada".into()),
            ..Default::default()
        });
        let ranked = rank(&[m], 5);
        assert_eq!(ranked[0].short_name, "Toronto, Ontario, Canada");
        assert_eq!(ranked[0].country.as_deref(), Some("Canada"));
    }

    #[test]
    fn test_popular_for_short_input() {
        let geo = StaticGeocoder::new();
        let mut ac = Autocompleter::new();

        let all = ac.suggest(&geo, "", 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].short_name, "New York, NY");
        assert!(all.iter().all(|s| s.place_type == "popular" && s.latitude.is_none()));

        let filtered = ac.suggest(&geo, "X", 5);
        assert_eq!(filtered.len(), 2); // Houston, TX and Phoenix, AZ
        assert_eq!(geo.calls(), 0);
    }

    #[test]
    fn test_suggest_caches_per_input_and_limit() {
        let geo = StaticGeocoder::new().with_matches("paris", sample());
        let mut ac = Autocompleter::new();

        let first = ac.suggest(&geo, "Paris", 3);
        let second = ac.suggest(&geo, "  paris ", 3);
        assert_eq!(first, second);
        assert_eq!(geo.calls(), 1);

        ac.suggest(&geo, "paris", 2);
        assert_eq!(geo.calls(), 2);
        assert_eq!(ac.cached_queries(), 2);
    }

    #[test]
    fn test_suggest_empty_results_cached() {
        let geo = StaticGeocoder::new();
        let mut ac = Autocompleter::new();
        assert!(ac.suggest(&geo, "Atlantis", 5).is_empty());
        assert!(ac.suggest(&geo, "Atlantis", 5).is_empty());
        assert_eq!(geo.calls(), 1);
    }

    #[test]
    fn test_suggest_fallback_on_provider_error() {
        let geo = StaticGeocoder::failing(ProviderError::Status(503));
        let mut ac = Autocompleter::new();

        let fallback = ac.suggest(&geo, "lond", 5);
        let names: Vec<&str> = fallback.iter().map(|s| s.short_name.as_str()).collect();
        assert_eq!(names, ["Lond, USA", "Lond, UK", "Lond, Canada"]);
        assert_eq!(fallback[1].display_name, "Lond, United Kingdom");
        assert!(fallback.iter().all(|s| s.place_type == "fallback" && s.coordinates().is_none()));

        assert_eq!(ac.suggest(&geo, "lond", 2).len(), 2);
        assert_eq!(ac.cached_queries(), 0);
    }
}
