//! Weather Locator: resolves free-text and coordinate input into geocoded
//! locations for weather lookups, with autocomplete and persisted user state.

pub mod config;
pub mod location;
pub mod repl;
pub mod server;
