//! Persisted record types and their read-side validation.
//!
//! Every record is a flat JSON object. Reading never fails: a field that is
//! missing or out of bounds is replaced by its default, and a value that is not
//! an object at all is replaced by the whole default record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

pub const MIN_PLAYBACK_SPEED_MS: u32 = 1000;
pub const MAX_PLAYBACK_SPEED_MS: u32 = 5000;
pub const DEFAULT_PLAYBACK_SPEED_MS: u32 = 3000;
pub const MAX_BOOKMARK_NOTE_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSizeTag {
    Small,
    #[default]
    Medium,
    Large,
    Xlarge,
}

impl FontSizeTag {
    pub const ALL: [FontSizeTag; 4] = [
        FontSizeTag::Small,
        FontSizeTag::Medium,
        FontSizeTag::Large,
        FontSizeTag::Xlarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FontSizeTag::Small => "small",
            FontSizeTag::Medium => "medium",
            FontSizeTag::Large => "large",
            FontSizeTag::Xlarge => "xlarge",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for FontSizeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnLayoutTag {
    Left,
    Right,
    #[default]
    Equal,
}

impl ColumnLayoutTag {
    pub const ALL: [ColumnLayoutTag; 3] = [
        ColumnLayoutTag::Left,
        ColumnLayoutTag::Right,
        ColumnLayoutTag::Equal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnLayoutTag::Left => "left",
            ColumnLayoutTag::Right => "right",
            ColumnLayoutTag::Equal => "equal",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(tag))
    }

    /// Relative (source, target) column widths; the named side is emphasized.
    pub fn column_weights(self) -> (u16, u16) {
        match self {
            ColumnLayoutTag::Left => (2, 1),
            ColumnLayoutTag::Right => (1, 2),
            ColumnLayoutTag::Equal => (1, 1),
        }
    }
}

impl fmt::Display for ColumnLayoutTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    #[default]
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTag {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedTag {
    pub fn speed_ms(self) -> u32 {
        match self {
            SpeedTag::Slow => 4000,
            SpeedTag::Normal => DEFAULT_PLAYBACK_SPEED_MS,
            SpeedTag::Fast => 2000,
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "slow" => Some(SpeedTag::Slow),
            "normal" => Some(SpeedTag::Normal),
            "fast" => Some(SpeedTag::Fast),
            _ => None,
        }
    }
}

/// Replace an out-of-range autoplay interval with the default.
pub fn validated_speed_ms(speed_ms: u32) -> u32 {
    if (MIN_PLAYBACK_SPEED_MS..=MAX_PLAYBACK_SPEED_MS).contains(&speed_ms) {
        speed_ms
    } else {
        warn!(
            speed_ms,
            default = DEFAULT_PLAYBACK_SPEED_MS,
            "Playback speed out of range; using default"
        );
        DEFAULT_PLAYBACK_SPEED_MS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPreferences {
    pub font_size_tag: FontSizeTag,
    pub column_layout_tag: ColumnLayoutTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPreferences {
    pub is_auto_playing: bool,
    pub playback_speed_ms: u32,
    pub last_playback_state: PlaybackState,
    pub preferred_speed_tag: SpeedTag,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            is_auto_playing: false,
            playback_speed_ms: DEFAULT_PLAYBACK_SPEED_MS,
            last_playback_state: PlaybackState::Paused,
            preferred_speed_tag: SpeedTag::Normal,
        }
    }
}

/// The single process-wide preferences record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(flatten)]
    pub display: DisplayPreferences,
    #[serde(flatten)]
    pub playback: PlaybackPreferences,
}

impl Preferences {
    /// Validate stored text field by field.
    pub fn from_stored(text: &str) -> Self {
        let Some(object) = parse_object(text, "preferences") else {
            return Self::default();
        };
        let defaults = Self::default();
        let display = DisplayPreferences {
            font_size_tag: field(&object, "fontSizeTag", "preferences")
                .unwrap_or(defaults.display.font_size_tag),
            column_layout_tag: field(&object, "columnLayoutTag", "preferences")
                .unwrap_or(defaults.display.column_layout_tag),
        };
        let playback = PlaybackPreferences {
            is_auto_playing: field(&object, "isAutoPlaying", "preferences")
                .unwrap_or(defaults.playback.is_auto_playing),
            playback_speed_ms: field::<u32>(&object, "playbackSpeedMs", "preferences")
                .map(validated_speed_ms)
                .unwrap_or(defaults.playback.playback_speed_ms),
            last_playback_state: field(&object, "lastPlaybackState", "preferences")
                .unwrap_or(defaults.playback.last_playback_state),
            preferred_speed_tag: field(&object, "preferredSpeedTag", "preferences")
                .unwrap_or(defaults.playback.preferred_speed_tag),
        };
        Self { display, playback }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Resume state for one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub movie_key: String,
    pub current_index: usize,
    pub is_playing: bool,
    pub playback_speed_ms: u32,
    /// Unix epoch milliseconds.
    pub last_updated: u64,
    pub highest_index_reached: usize,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    /// Accumulated active study time for this movie.
    #[serde(default)]
    pub study_time_ms: u64,
}

impl PlaybackSession {
    pub fn new(movie_key: impl Into<String>) -> Self {
        Self {
            movie_key: movie_key.into(),
            current_index: 0,
            is_playing: false,
            playback_speed_ms: DEFAULT_PLAYBACK_SPEED_MS,
            last_updated: 0,
            highest_index_reached: 0,
            bookmarks: Vec::new(),
            study_time_ms: 0,
        }
    }

    /// Validate stored text for `movie_key`. Returns `None` when the record is
    /// not an object or belongs to another movie; bad fields fall back to
    /// defaults.
    pub fn from_stored(text: &str, movie_key: &str) -> Option<Self> {
        let object = parse_object(text, "session")?;
        match object.get("movieKey").and_then(Value::as_str) {
            Some(stored) if stored == movie_key => {}
            other => {
                warn!(
                    expected = movie_key,
                    stored = ?other,
                    "Discarding session record with mismatched movie key"
                );
                return None;
            }
        }

        let mut session = Self::new(movie_key);
        let index = field::<usize>(&object, "currentIndex", "session");
        if let Some(index) = index {
            session.current_index = index;
        }
        if let Some(playing) = field(&object, "isPlaying", "session") {
            session.is_playing = playing;
        }
        // A corrupt position restarts from the first unit, paused.
        if index.is_none() && object.contains_key("currentIndex") {
            session.is_playing = false;
        }
        if let Some(speed) = field::<u32>(&object, "playbackSpeedMs", "session") {
            session.playback_speed_ms = validated_speed_ms(speed);
        }
        if let Some(updated) = field(&object, "lastUpdated", "session") {
            session.last_updated = updated;
        }
        if let Some(study_time) = field(&object, "studyTimeMs", "session") {
            session.study_time_ms = study_time;
        }
        session.highest_index_reached = match field::<usize>(&object, "highestIndexReached", "session")
        {
            Some(highest) if highest >= session.current_index => highest,
            Some(highest) => {
                warn!(
                    highest,
                    current = session.current_index,
                    "High-water mark below current index; resetting"
                );
                session.current_index
            }
            None => session.current_index,
        };
        session.bookmarks = object
            .get("bookmarks")
            .map(validated_bookmarks)
            .unwrap_or_default();
        Some(session)
    }
}

fn validated_bookmarks(value: &Value) -> Vec<Bookmark> {
    let Some(entries) = value.as_array() else {
        warn!("Session bookmarks are not a list; dropping them");
        return Vec::new();
    };
    let mut bookmarks: Vec<Bookmark> = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Bookmark>(entry.clone()) {
            Ok(bookmark)
                if bookmark
                    .note
                    .as_ref()
                    .is_none_or(|note| note.chars().count() <= MAX_BOOKMARK_NOTE_CHARS) =>
            {
                if !bookmarks.iter().any(|existing| existing.index == bookmark.index) {
                    bookmarks.push(bookmark);
                }
            }
            _ => warn!(entry = %entry, "Dropping invalid stored bookmark"),
        }
    }
    bookmarks.sort_by_key(|bookmark| bookmark.index);
    bookmarks
}

fn parse_object(text: &str, record: &'static str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        Ok(other) => {
            warn!(record, kind = %value_kind(&other), "Stored record is not an object; using defaults");
            None
        }
        Err(err) => {
            warn!(record, "Stored record is not valid JSON; using defaults: {err}");
            None
        }
    }
}

fn field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    name: &'static str,
    record: &'static str,
) -> Option<T> {
    let Some(value) = object.get(name) else {
        debug!(record, field = name, "Stored field missing; using default");
        return None;
    };
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(record, field = name, value = %value, "Invalid stored field; using default: {err}");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_serialize_as_flat_object() {
        let text = serde_json::to_string(&Preferences::default()).expect("serialize");
        let value: Value = serde_json::from_str(&text).expect("json");
        let object = value.as_object().expect("object");
        assert_eq!(object.get("fontSizeTag"), Some(&Value::from("medium")));
        assert_eq!(object.get("playbackSpeedMs"), Some(&Value::from(3000)));
        assert_eq!(object.len(), 6);
    }

    #[test]
    fn out_of_range_speeds_fall_back_to_default() {
        for speed in [999, 6000] {
            let prefs = Preferences::from_stored(&format!(r#"{{"playbackSpeedMs": {speed}}}"#));
            assert_eq!(prefs.playback.playback_speed_ms, DEFAULT_PLAYBACK_SPEED_MS);
        }
        let prefs = Preferences::from_stored(r#"{"playbackSpeedMs": 1500}"#);
        assert_eq!(prefs.playback.playback_speed_ms, 1500);
    }

    #[test]
    fn unknown_tags_fall_back_per_field() {
        let prefs = Preferences::from_stored(
            r#"{"fontSizeTag": "huge", "columnLayoutTag": "left", "isAutoPlaying": "yes"}"#,
        );
        assert_eq!(prefs.display.font_size_tag, FontSizeTag::Medium);
        assert_eq!(prefs.display.column_layout_tag, ColumnLayoutTag::Left);
        assert!(!prefs.playback.is_auto_playing);
    }

    #[test]
    fn corrupt_preferences_become_defaults() {
        assert_eq!(Preferences::from_stored("{not json"), Preferences::default());
        assert_eq!(Preferences::from_stored("[1,2]"), Preferences::default());
    }

    #[test]
    fn negative_session_index_is_replaced_with_zero() {
        let session = PlaybackSession::from_stored(
            r#"{"movieKey": "42", "currentIndex": -5, "isPlaying": true}"#,
            "42",
        )
        .expect("session");
        assert_eq!(session.current_index, 0);
        assert_eq!(session.highest_index_reached, 0);
        assert!(!session.is_playing);
    }

    #[test]
    fn missing_session_index_keeps_stored_playback_mode() {
        let session =
            PlaybackSession::from_stored(r#"{"movieKey": "42", "isPlaying": true}"#, "42")
                .expect("session");
        assert_eq!(session.current_index, 0);
        assert!(session.is_playing);
    }

    #[test]
    fn negative_study_time_is_dropped() {
        let session = PlaybackSession::from_stored(
            r#"{"movieKey": "3", "currentIndex": 1, "studyTimeMs": -40}"#,
            "3",
        )
        .expect("session");
        assert_eq!(session.study_time_ms, 0);
        assert_eq!(session.current_index, 1);
    }

    #[test]
    fn session_for_other_movie_is_discarded() {
        assert!(PlaybackSession::from_stored(r#"{"movieKey": "7"}"#, "42").is_none());
        assert!(PlaybackSession::from_stored("null", "42").is_none());
    }

    #[test]
    fn session_high_water_mark_is_never_below_current() {
        let session = PlaybackSession::from_stored(
            r#"{"movieKey": "1", "currentIndex": 8, "highestIndexReached": 3}"#,
            "1",
        )
        .expect("session");
        assert_eq!(session.highest_index_reached, 8);
    }

    #[test]
    fn stored_bookmarks_are_filtered_and_sorted() {
        let long_note = "n".repeat(MAX_BOOKMARK_NOTE_CHARS + 1);
        let text = format!(
            r#"{{"movieKey": "1", "bookmarks": [{{"index": 9}}, {{"index": -1}}, {{"index": 2, "note": "hi"}}, {{"index": 9}}, {{"index": 4, "note": "{long_note}"}}]}}"#
        );
        let session = PlaybackSession::from_stored(&text, "1").expect("session");
        let indices: Vec<usize> = session.bookmarks.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![2, 9]);
        assert_eq!(session.bookmarks[0].note.as_deref(), Some("hi"));
    }

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!(FontSizeTag::parse(" XLarge "), Some(FontSizeTag::Xlarge));
        assert_eq!(ColumnLayoutTag::parse("RIGHT"), Some(ColumnLayoutTag::Right));
        assert_eq!(FontSizeTag::parse("tiny"), None);
        assert_eq!(SpeedTag::parse("fast").map(SpeedTag::speed_ms), Some(2000));
    }
}
