//! Compact "City, Region" labels from verbose provider addresses.

use super::types::GeocodeMatch;

/// Derive a short display label for a match.
///
/// The address breakdown wins when it names a place, state or country;
/// otherwise the comma-separated display name is cut down positionally.
pub fn shorten(m: &GeocodeMatch) -> String {
    if let Some(address) = &m.address {
        let parts: Vec<&str> = [address.place(), address.state.as_deref(), address.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join(", ");
        }
    }
    shorten_display_name(&m.display_name)
}

/// Positional fallback: first component plus the second-to-last one.
pub fn shorten_display_name(display_name: &str) -> String {
    let parts: Vec<&str> = display_name.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [first, .., penultimate, _] => format!("{}, {}", first, penultimate),
        [first, second] => format!("{}, {}", first, second),
        [only] => only.to_string(),
        [] => String::new(),
    }
}
