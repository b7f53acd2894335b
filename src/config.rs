//! Provider endpoints, timeouts and on-disk locations.

use std::path::PathBuf;
use std::time::Duration;

pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
/// Nominatim's usage policy requires an identifying User-Agent.
pub const USER_AGENT: &str = "WeatherLocator/0.3 (location-resolution)";

/// Settings for the geocoding provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub search_url: String,
    pub reverse_url: String,
    pub user_agent: String,
    /// Single best-match resolution and reverse lookups.
    pub resolve_timeout: Duration,
    /// Autocomplete queries; kept short so typing stays responsive.
    pub suggest_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            search_url: NOMINATIM_SEARCH_URL.to_string(),
            reverse_url: NOMINATIM_REVERSE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            resolve_timeout: Duration::from_secs(10),
            suggest_timeout: Duration::from_secs(5),
        }
    }
}

/// Default user data file (~/.weather-locator/user_locations.json).
pub fn default_data_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weather-locator")
        .join("user_locations.json")
}
