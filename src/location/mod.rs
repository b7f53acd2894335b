//! Location subsystem for the weather locator.
//!
//! Input validation, geocoding providers, short-name formatting,
//! autocomplete ranking, the location cache and persisted user state.

pub mod autocomplete;
pub mod cache;
pub mod providers;
pub mod resolver;
pub mod shortname;
pub mod store;
pub mod types;
pub mod validator;

pub use autocomplete::{rank, Autocompleter, DEFAULT_MAX_SUGGESTIONS};
pub use cache::LocationCache;
pub use providers::{GeocodingClient, NominatimClient, SearchKind, StaticGeocoder};
pub use resolver::LocationService;
pub use shortname::shorten;
pub use store::{UserLocationStore, UserState};
pub use types::{
    FavoriteOutcome, GeocodeMatch, LocationError, LocationRecord, LocationSource,
    ResolutionFailure, ResolutionResult, Resolved, ReverseAddress, Suggestion, WeatherLocation,
};
pub use validator::{clean, validate_coordinates, CacheKey, NormalizedLocation};
