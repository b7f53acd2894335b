use crate::location::{GeocodingClient, LocationService};
use std::sync::Mutex;

pub type SharedService = LocationService<Box<dyn GeocodingClient + Send>>;

/// All pipeline and store access goes through this one lock.
pub struct AppState {
    pub service: Mutex<SharedService>,
}
