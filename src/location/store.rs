//! Persistent user location state at ~/.weather-locator/user_locations.json.
//!
//! The file is merged over in-memory defaults on load: keys present in the
//! file win, absent keys keep their defaults. Every mutation is flushed to
//! disk when `auto_save` is enabled.
//!
//! Sections and list entries are read independently; an unreadable entry is
//! dropped on its own. A file that could not be read in full is copied to
//! `<name>.bak` before anything overwrites it.

use super::cache::LocationCache;
use super::types::{FavoriteOutcome, LocationRecord, PersistenceError, SavedLocation, UserSummary};
use super::validator::CacheKey;
use crate::config::default_data_file;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub units: Units,
    pub max_history: usize,
    pub auto_save: bool,
    pub show_coordinates: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            units: Units::Imperial,
            max_history: DEFAULT_MAX_HISTORY,
            auto_save: true,
            show_coordinates: false,
        }
    }
}

/// Everything remembered about a user between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserState {
    pub default_location: Option<SavedLocation>,
    #[serde(rename = "favorite_locations")]
    pub favorites: Vec<SavedLocation>,
    /// Most recent first, unique by short name.
    #[serde(rename = "search_history")]
    pub history: Vec<SavedLocation>,
    #[serde(rename = "location_cache")]
    pub cache: LocationCache,
    #[serde(rename = "user_preferences")]
    pub preferences: Preferences,
}

impl UserState {
    /// Append to favorites unless an entry with the same short name exists.
    pub fn add_favorite(&mut self, record: LocationRecord) -> FavoriteOutcome {
        if self
            .favorites
            .iter()
            .any(|f| f.short_name() == record.short_name)
        {
            return FavoriteOutcome::AlreadyExists;
        }
        self.favorites.push(SavedLocation::now(record));
        FavoriteOutcome::Added
    }

    /// Move `record` to the front of history, dropping any older entry
    /// with the same short name and anything past `max_history`.
    pub fn push_history(&mut self, record: LocationRecord) {
        self.history.retain(|h| h.short_name() != record.short_name);
        self.history.insert(0, SavedLocation::now(record));
        self.history.truncate(self.preferences.max_history);
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            default_location: self
                .default_location
                .as_ref()
                .map(|d| d.short_name().to_string()),
            favorite_count: self.favorites.len(),
            history_count: self.history.len(),
            cache_count: self.cache.len(),
        }
    }
}

// ─── Merge-on-load ──────────────────────────────────────────────

/// A persisted document; every key is optional.
#[derive(Debug, Default)]
pub struct StatePatch {
    pub default_location: Option<SavedLocation>,
    pub favorite_locations: Option<Vec<SavedLocation>>,
    pub search_history: Option<Vec<SavedLocation>>,
    pub location_cache: Option<LocationCache>,
    pub user_preferences: Option<PreferencesPatch>,
}

impl StatePatch {
    /// Parse a data file section by section.
    ///
    /// Returns the patch and how many sections or entries were dropped.
    /// Only a document that is not a JSON object fails outright.
    pub fn parse(data: &str) -> Result<(Self, usize), serde_json::Error> {
        let doc: serde_json::Map<String, Value> = serde_json::from_str(data)?;
        let mut dropped = 0;
        let mut patch = Self::default();

        for (key, value) in doc {
            match key.as_str() {
                "default_location" => {
                    patch.default_location =
                        read_section::<Option<SavedLocation>>(&key, value, &mut dropped).flatten()
                }
                "favorite_locations" => patch.favorite_locations = read_entries(&key, value, &mut dropped),
                "search_history" => patch.search_history = read_entries(&key, value, &mut dropped),
                "location_cache" => patch.location_cache = read_cache(value, &mut dropped),
                "user_preferences" => patch.user_preferences = read_section(&key, value, &mut dropped),
                _ => tracing::debug!("ignoring unknown key '{}' in user data", key),
            }
        }
        Ok((patch, dropped))
    }
}

fn read_section<T: DeserializeOwned>(key: &str, value: Value, dropped: &mut usize) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("dropping unreadable '{}' entry: {}", key, e);
            *dropped += 1;
            None
        }
    }
}

fn read_entries<T: DeserializeOwned>(key: &str, value: Value, dropped: &mut usize) -> Option<Vec<T>> {
    let Value::Array(items) = value else {
        tracing::warn!("dropping '{}': expected a list", key);
        *dropped += 1;
        return None;
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| read_section(key, item, dropped))
            .collect(),
    )
}

fn read_cache(value: Value, dropped: &mut usize) -> Option<LocationCache> {
    let Value::Object(entries) = value else {
        tracing::warn!("dropping 'location_cache': expected an object");
        *dropped += 1;
        return None;
    };
    let mut cache = LocationCache::new();
    for (key, entry) in entries {
        if let Some(record) = read_section::<LocationRecord>("location_cache", entry, dropped) {
            cache.put(CacheKey::from_stored(&key), record);
        }
    }
    Some(cache)
}

/// Keep the first entry for each short name.
fn dedupe_by_short_name(entries: &mut Vec<SavedLocation>) {
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.short_name().to_string()));
}

#[derive(Debug, Default, Deserialize)]
pub struct PreferencesPatch {
    #[serde(default)]
    pub units: Option<Units>,
    #[serde(default)]
    pub max_history: Option<usize>,
    #[serde(default)]
    pub auto_save: Option<bool>,
    #[serde(default)]
    pub show_coordinates: Option<bool>,
}

/// Overlay a persisted document onto `base`, field by field.
pub fn merge(base: UserState, patch: StatePatch) -> UserState {
    let preferences = match patch.user_preferences {
        Some(p) => Preferences {
            units: p.units.unwrap_or(base.preferences.units),
            max_history: p.max_history.unwrap_or(base.preferences.max_history),
            auto_save: p.auto_save.unwrap_or(base.preferences.auto_save),
            show_coordinates: p.show_coordinates.unwrap_or(base.preferences.show_coordinates),
        },
        None => base.preferences,
    };

    let mut merged = UserState {
        default_location: patch.default_location.or(base.default_location),
        favorites: patch.favorite_locations.unwrap_or(base.favorites),
        history: patch.search_history.unwrap_or(base.history),
        cache: patch.location_cache.unwrap_or(base.cache),
        preferences,
    };
    dedupe_by_short_name(&mut merged.favorites);
    dedupe_by_short_name(&mut merged.history);
    merged.history.truncate(merged.preferences.max_history);
    merged
}

// ─── Store ──────────────────────────────────────────────────────

/// `user_locations.json` → `user_locations.json.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Owns the user state and its backing file.
#[derive(Debug)]
pub struct UserLocationStore {
    path: PathBuf,
    state: UserState,
}

impl UserLocationStore {
    /// Load from the default location (~/.weather-locator/user_locations.json).
    pub fn load() -> Self {
        Self::load_from(default_data_file())
    }

    /// Load from a specific path. Missing or unreadable files yield defaults.
    pub fn load_from(path: PathBuf) -> Self {
        let (state, lossy) = match Self::read_file(&path) {
            Ok(Some((patch, dropped))) => {
                tracing::debug!("loaded user location data from {}", path.display());
                (merge(UserState::default(), patch), dropped > 0)
            }
            Ok(None) => (UserState::default(), false),
            Err(e) => {
                tracing::warn!(
                    "could not load user data from {}: {}; starting fresh",
                    path.display(),
                    e
                );
                (UserState::default(), true)
            }
        };

        let mut store = Self { path, state };
        if lossy {
            store.back_up_original();
        }
        store
    }

    fn read_file(path: &Path) -> Result<Option<(StatePatch, usize)>, PersistenceError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(StatePatch::parse(&data)?))
    }

    /// Copy a partially read file aside. Without a copy, auto-save is
    /// turned off for this session so the file is never overwritten.
    fn back_up_original(&mut self) {
        let backup = backup_path(&self.path);
        match fs::copy(&self.path, &backup) {
            Ok(_) => tracing::warn!(
                "user data could not be read in full; original kept at {}",
                backup.display()
            ),
            Err(e) => {
                tracing::warn!(
                    "could not back up {}: {}; auto-save disabled for this session",
                    self.path.display(),
                    e
                );
                self.state.preferences.auto_save = false;
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &UserState {
        &self.state
    }

    pub fn cache(&self) -> &LocationCache {
        &self.state.cache
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.state.preferences
    }

    /// Write the state to disk unconditionally.
    pub fn save(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Save if auto-save is on. Failures are logged; in-memory state stays authoritative.
    pub fn flush(&self) {
        if !self.state.preferences.auto_save {
            return;
        }
        match self.save() {
            Ok(()) => tracing::debug!("saved user location data to {}", self.path.display()),
            Err(e) => tracing::warn!("could not save user data to {}: {}", self.path.display(), e),
        }
    }

    pub fn cache_location(&mut self, key: CacheKey, record: LocationRecord) {
        self.state.cache.put(key, record);
        self.flush();
    }

    pub fn set_default(&mut self, record: LocationRecord) {
        tracing::info!("default location set to {}", record.short_name);
        self.state.default_location = Some(SavedLocation::now(record));
        self.flush();
    }

    pub fn add_favorite(&mut self, record: LocationRecord) -> FavoriteOutcome {
        let outcome = self.state.add_favorite(record);
        if outcome == FavoriteOutcome::Added {
            self.flush();
        }
        outcome
    }

    pub fn push_history(&mut self, record: LocationRecord) {
        self.state.push_history(record);
        self.flush();
    }

    pub fn clear_cache(&mut self) {
        self.state.cache.clear();
        tracing::info!("location cache cleared");
        self.flush();
    }

    pub fn clear_history(&mut self) {
        self.state.history.clear();
        tracing::info!("search history cleared");
        self.flush();
    }

    pub fn summary(&self) -> UserSummary {
        self.state.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::validator::clean;
    use tempfile::TempDir;

    fn record(short_name: &str) -> LocationRecord {
        LocationRecord {
            original_input: short_name.to_lowercase(),
            normalized_input: short_name.into(),
            display_name: format!("{}, Region, Country", short_name),
            short_name: short_name.into(),
            latitude: 10.0,
            longitude: 20.0,
            place_type: "city".into(),
        }
    }

    const OLDER_FILE: &str = r#"{
        "default_location": {
            "name": "Chicago, Cook County, Illinois, United States",
            "short_name": "Chicago, Illinois",
            "latitude": 41.8755616,
            "longitude": -87.6244212,
            "set_date": "2024-03-01T09:00:00.000001"
        },
        "favorite_locations": [{
            "name": "London, Greater London, England, United Kingdom",
            "short_name": "London, England",
            "latitude": 51.5074456,
            "longitude": -0.1277653,
            "added_date": "2024-03-01T09:15:30.123456"
        }],
        "search_history": [{
            "short_name": "Tokyo, Japan",
            "display_name": "Tokyo, Japan",
            "latitude": 35.6768601,
            "longitude": 139.7638947,
            "search_date": "2024-03-02T18:00:00"
        }],
        "location_cache": {
            "chicago, il": {
                "original_input": "chicago, il",
                "cleaned_input": "Chicago, Il",
                "display_name": "Chicago, Cook County, Illinois, United States",
                "short_name": "Chicago, Illinois",
                "latitude": 41.8755616,
                "longitude": -87.6244212,
                "type": "city"
            }
        },
        "user_preferences": {"units": "metric", "max_history": 20, "auto_save": true, "show_coordinates": false}
    }"#;

    fn test_store() -> (UserLocationStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_locations.json");
        (UserLocationStore::load_from(path), dir)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (store, _dir) = test_store();
        assert_eq!(store.state(), &UserState::default());
        assert_eq!(store.state().preferences.max_history, 20);
        assert!(store.state().preferences.auto_save);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_locations.json");
        fs::write(&path, "{ not json").unwrap();

        let store = UserLocationStore::load_from(path.clone());
        assert_eq!(store.state(), &UserState::default());
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "{ not json");
    }

    #[test]
    fn test_loads_older_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_locations.json");
        fs::write(&path, OLDER_FILE).unwrap();

        let mut store = UserLocationStore::load_from(path.clone());
        assert_eq!(store.state().favorites[0].short_name(), "London, England");
        assert_eq!(store.state().default_location.as_ref().unwrap().short_name(), "Chicago, Illinois");
        assert_eq!(store.state().history.len(), 1);
        assert_eq!(store.state().preferences.units, Units::Metric);
        assert!(store.cache().get(&clean("chicago, il").unwrap().cache_key()).is_some());
        assert!(!backup_path(&path).exists());

        store.clear_history();
        let reloaded = UserLocationStore::load_from(path);
        assert_eq!(reloaded.summary().favorite_count, 1);
        assert_eq!(reloaded.summary().cache_count, 1);
        assert_eq!(reloaded.state().preferences.units, Units::Metric);
    }

    #[test]
    fn test_bad_entry_dropped_alone_and_file_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_locations.json");
        let data = r#"{
            "favorite_locations": [
                {"short_name": "Paris, France", "display_name": "Paris, France", "latitude": 48.85, "longitude": 2.35},
                {"short_name": "Broken", "latitude": "north"}
            ],
            "location_cache": {"oslo": {"display_name": "Oslo, Norway", "latitude": 59.9, "longitude": 10.7}},
            "user_preferences": "metric"
        }"#;
        fs::write(&path, data).unwrap();

        let mut store = UserLocationStore::load_from(path.clone());
        assert_eq!(store.summary().favorite_count, 1);
        assert_eq!(store.summary().cache_count, 1);
        assert_eq!(store.state().preferences, Preferences::default());

        store.clear_cache();
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), data);
    }

    #[test]
    fn test_unreadable_file_disables_auto_save_without_backup() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be: reading and copying both fail
        let path = dir.path().join("user_locations.json");
        fs::create_dir(&path).unwrap();

        let mut store = UserLocationStore::load_from(path.clone());
        assert!(!store.state().preferences.auto_save);
        store.push_history(record("Rome, Italy"));
        assert!(path.is_dir());
    }

    #[test]
    fn test_merge_dedupes_by_short_name() {
        let patch = StatePatch {
            favorite_locations: Some(vec![
                SavedLocation::now(record("Lima, Peru")),
                SavedLocation::now(record("Lima, Peru")),
            ]),
            search_history: Some(vec![
                SavedLocation::now(record("Quito, Ecuador")),
                SavedLocation::now(record("Lima, Peru")),
                SavedLocation::now(record("Quito, Ecuador")),
            ]),
            ..Default::default()
        };
        let merged = merge(UserState::default(), patch);
        assert_eq!(merged.favorites.len(), 1);
        let names: Vec<&str> = merged.history.iter().map(|h| h.short_name()).collect();
        assert_eq!(names, ["Quito, Ecuador", "Lima, Peru"]);
    }

    #[test]
    fn test_merge_keeps_defaults_for_absent_keys() {
        let (patch, dropped) =
            StatePatch::parse(r#"{"user_preferences": {"units": "metric", "max_history": 5}}"#).unwrap();
        assert_eq!(dropped, 0);
        let merged = merge(UserState::default(), patch);

        assert_eq!(merged.preferences.units, Units::Metric);
        assert_eq!(merged.preferences.max_history, 5);
        assert!(merged.preferences.auto_save);
        assert!(!merged.preferences.show_coordinates);
        assert!(merged.favorites.is_empty());
    }

    #[test]
    fn test_merge_present_keys_win() {
        let mut base = UserState::default();
        base.favorites.push(SavedLocation::now(record("Old")));

        let patch = StatePatch {
            favorite_locations: Some(vec![SavedLocation::now(record("New"))]),
            ..Default::default()
        };
        let merged = merge(base, patch);
        assert_eq!(merged.favorites.len(), 1);
        assert_eq!(merged.favorites[0].short_name(), "New");
    }

    #[test]
    fn test_merge_truncates_history() {
        let patch = StatePatch {
            search_history: Some((0..5).map(|i| SavedLocation::now(record(&format!("P{i}")))).collect()),
            user_preferences: Some(PreferencesPatch {
                max_history: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(merge(UserState::default(), patch).history.len(), 3);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("user_locations.json");

        {
            let mut store = UserLocationStore::load_from(path.clone());
            store.set_default(record("Chicago, Illinois"));
            store.add_favorite(record("London, England"));
            store.push_history(record("Tokyo, Japan"));
            store.cache_location(clean("tokyo").unwrap().cache_key(), record("Tokyo, Japan"));
        }

        let store = UserLocationStore::load_from(path);
        let summary = store.summary();
        assert_eq!(summary.default_location.as_deref(), Some("Chicago, Illinois"));
        assert_eq!(summary.favorite_count, 1);
        assert_eq!(summary.history_count, 1);
        assert_eq!(summary.cache_count, 1);
        assert!(store.cache().get(&clean("Tokyo").unwrap().cache_key()).is_some());
    }

    #[test]
    fn test_flush_skipped_without_auto_save() {
        let (mut store, _dir) = test_store();
        store.preferences_mut().auto_save = false;
        store.add_favorite(record("Paris, France"));
        assert!(!store.path().exists());

        store.save().unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_favorites_idempotent() {
        let mut state = UserState::default();
        assert_eq!(state.add_favorite(record("Paris, France")), FavoriteOutcome::Added);
        assert_eq!(state.add_favorite(record("Paris, France")), FavoriteOutcome::AlreadyExists);
        assert_eq!(state.favorites.len(), 1);
    }

    #[test]
    fn test_history_moves_existing_to_front() {
        let mut state = UserState::default();
        state.push_history(record("A"));
        state.push_history(record("B"));
        state.push_history(record("C"));
        state.push_history(record("A"));

        let names: Vec<&str> = state.history.iter().map(|h| h.short_name()).collect();
        assert_eq!(names, ["A", "C", "B"]);
    }

    #[test]
    fn test_history_bounded() {
        let mut state = UserState::default();
        state.preferences.max_history = 3;
        for i in 0..10 {
            state.push_history(record(&format!("City {i}")));
        }
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[0].short_name(), "City 9");
    }

    #[test]
    fn test_clear_history_and_cache() {
        let (mut store, _dir) = test_store();
        store.push_history(record("Oslo, Norway"));
        store.cache_location(clean("oslo").unwrap().cache_key(), record("Oslo, Norway"));

        store.clear_history();
        store.clear_cache();
        assert_eq!(store.summary().history_count, 0);
        assert_eq!(store.summary().cache_count, 0);
    }
}
