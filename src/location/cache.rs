//! In-memory location cache keyed by normalized name.
//!
//! Lives inside the persisted user state, so entries survive restarts
//! whenever the store is flushed. Last write wins.

use super::types::LocationRecord;
use super::validator::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The location cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCache {
    entries: HashMap<CacheKey, LocationRecord>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously resolved location.
    pub fn get(&self, key: &CacheKey) -> Option<&LocationRecord> {
        self.entries.get(key)
    }

    /// Store a resolved location, replacing any previous entry under `key`.
    pub fn put(&mut self, key: CacheKey, record: LocationRecord) {
        self.entries.insert(key, record);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
