//! Typed, validated persistence for preferences and per-movie resume state.
//!
//! Keys live under one namespace prefix: `{prefix}preferences` for the
//! process-wide record and `{prefix}session_{movie}` per movie. Every read goes
//! through the record's validation; every write failure is logged and reported
//! as `false`, never propagated.

mod backend;
mod records;

pub use backend::{DisabledStorage, FileStorage, MemoryStorage, StorageBackend, StorageError};
pub use records::{
    Bookmark, ColumnLayoutTag, DEFAULT_PLAYBACK_SPEED_MS, DisplayPreferences, FontSizeTag,
    MAX_BOOKMARK_NOTE_CHARS, MAX_PLAYBACK_SPEED_MS, MIN_PLAYBACK_SPEED_MS, PlaybackPreferences,
    PlaybackSession, PlaybackState, Preferences, SpeedTag, validated_speed_ms,
};

use tracing::{debug, info, warn};

pub const DEFAULT_NAMESPACE: &str = "dualsub_";

pub struct PreferenceStore {
    backend: Box<dyn StorageBackend>,
    prefix: String,
    preferences: Preferences,
    degraded: bool,
}

impl PreferenceStore {
    /// Open the store and rehydrate preferences.
    pub fn open(backend: Box<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        let mut store = Self {
            backend,
            prefix: prefix.into(),
            preferences: Preferences::default(),
            degraded: false,
        };
        store.preferences = store.read_preferences();
        store
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStorage::new()), DEFAULT_NAMESPACE)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True once any write has failed in this process.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn preferences_key(&self) -> String {
        format!("{}preferences", self.prefix)
    }

    pub fn session_key(&self, movie_key: &str) -> String {
        format!("{}session_{}", self.prefix, movie_key)
    }

    /// Apply a change to the cached preferences and persist it. The change is
    /// kept for this process even when the write fails.
    pub fn update_preferences(&mut self, change: impl FnOnce(&mut Preferences)) -> bool {
        change(&mut self.preferences);
        let key = self.preferences_key();
        let record = self.preferences;
        self.write_record(&key, &record)
    }

    pub fn load_session(&self, movie_key: &str) -> Option<PlaybackSession> {
        let text = self.read_raw(&self.session_key(movie_key))?;
        PlaybackSession::from_stored(&text, movie_key)
    }

    pub fn save_session(&mut self, session: &PlaybackSession) -> bool {
        let key = self.session_key(&session.movie_key);
        self.write_record(&key, session)
    }

    pub fn clear_session(&mut self, movie_key: &str) -> bool {
        let key = self.session_key(movie_key);
        match self.backend.remove(&key) {
            Ok(()) => {
                info!(movie = movie_key, "Cleared stored session");
                true
            }
            Err(err) => {
                self.note_failure(&key, &err);
                false
            }
        }
    }

    fn read_preferences(&self) -> Preferences {
        match self.read_raw(&self.preferences_key()) {
            Some(text) => Preferences::from_stored(&text),
            None => Preferences::default(),
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.read(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "Storage read failed; using defaults: {err}");
                None
            }
        }
    }

    fn write_record<T: serde::Serialize>(&mut self, key: &str, record: &T) -> bool {
        let text = match serde_json::to_string(record) {
            Ok(text) => text,
            Err(err) => {
                warn!(key, "Failed to serialize record: {err}");
                return false;
            }
        };
        match self.backend.write(key, &text) {
            Ok(()) => {
                debug!(key, bytes = text.len(), "Persisted record");
                true
            }
            Err(err) => {
                self.note_failure(key, &err);
                false
            }
        }
    }

    fn note_failure(&mut self, key: &str, err: &StorageError) {
        if self.degraded {
            debug!(key, "Storage write failed again: {err}");
        } else {
            warn!(key, "Storage write failed; preferences will not be saved this session: {err}");
            self.degraded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = PreferenceStore::open(
            Box::new(FileStorage::new(dir.path())),
            DEFAULT_NAMESPACE,
        );
        assert!(store.update_preferences(|prefs| {
            prefs.display.font_size_tag = FontSizeTag::Large;
            prefs.playback.playback_speed_ms = 2500;
        }));

        let reopened = PreferenceStore::open(
            Box::new(FileStorage::new(dir.path())),
            DEFAULT_NAMESPACE,
        );
        assert_eq!(reopened.preferences().display.font_size_tag, FontSizeTag::Large);
        assert_eq!(reopened.preferences().playback.playback_speed_ms, 2500);
    }

    #[test]
    fn corrupt_stored_preferences_load_as_defaults() {
        let mut backend = MemoryStorage::new();
        backend.insert_raw("dualsub_preferences", "\u{0}garbage");
        let store = PreferenceStore::open(Box::new(backend), DEFAULT_NAMESPACE);
        assert_eq!(store.preferences(), Preferences::default());
    }

    #[test]
    fn disabled_storage_degrades_without_losing_in_process_values() {
        let mut store = PreferenceStore::open(Box::new(DisabledStorage), DEFAULT_NAMESPACE);
        assert!(!store.update_preferences(|prefs| {
            prefs.display.column_layout_tag = ColumnLayoutTag::Right;
        }));
        assert!(store.is_degraded());
        assert_eq!(
            store.preferences().display.column_layout_tag,
            ColumnLayoutTag::Right
        );
        assert!(store.load_session("1").is_none());
        assert!(!store.save_session(&PlaybackSession::new("1")));
        assert!(!store.clear_session("1"));
    }

    #[test]
    fn quota_exceeded_reports_failure() {
        let mut store = PreferenceStore::open(Box::new(MemoryStorage::with_quota(10)), "p_");
        assert!(!store.save_session(&PlaybackSession::new("1")));
        assert!(store.is_degraded());
    }

    #[test]
    fn sessions_are_keyed_per_movie_and_cleared_explicitly() {
        let mut store = PreferenceStore::in_memory();
        let mut session = PlaybackSession::new("42");
        session.current_index = 3;
        session.highest_index_reached = 5;
        assert!(store.save_session(&session));
        assert_eq!(store.session_key("42"), "dualsub_session_42");

        assert_eq!(store.load_session("42"), Some(session));
        assert!(store.load_session("43").is_none());

        assert!(store.clear_session("42"));
        assert!(store.load_session("42").is_none());
    }
}
