//! Contract with the catalog service that owns subtitle tracks and alignments.
//!
//! The core only ever asks for one track per (movie, language) and one
//! alignment per (movie, source, target). Whatever serves those (local files,
//! HTTP, a test fixture) implements [`ContentSource`].

use crate::alignment::AlignmentIndex;
use crate::model::{AlignmentUnit, LanguageId, MovieId, MovieSelection, SubtitleLine};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("content transport failed: {0}")]
    Transport(String),
    #[error("malformed content: {0}")]
    Malformed(String),
}

impl ContentError {
    pub fn track_not_found(movie: MovieId, language: LanguageId) -> Self {
        Self::NotFound(format!("subtitle track for movie {movie} language {language}"))
    }

    pub fn alignment_not_found(movie: MovieId, source: LanguageId, target: LanguageId) -> Self {
        Self::NotFound(format!(
            "alignment for movie {movie} languages {source}->{target}"
        ))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub trait ContentSource {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError>;

    fn alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
    ) -> Result<Vec<AlignmentUnit>, ContentError>;
}

impl<T: ContentSource + ?Sized> ContentSource for Box<T> {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError> {
        (**self).subtitle_track(movie, language)
    }

    fn alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
    ) -> Result<Vec<AlignmentUnit>, ContentError> {
        (**self).alignment(movie, source, target)
    }
}

/// Fetch both tracks and the alignment for `selection` and build the index.
pub fn load_content(
    source: &mut dyn ContentSource,
    selection: &MovieSelection,
) -> Result<AlignmentIndex, ContentError> {
    let MovieSelection {
        movie_id,
        source_language,
        target_language,
    } = *selection;
    let source_lines = source.subtitle_track(movie_id, source_language)?;
    let target_lines = source.subtitle_track(movie_id, target_language)?;
    let units = source.alignment(movie_id, source_language, target_language)?;
    info!(
        movie = %movie_id,
        source_lines = source_lines.len(),
        target_lines = target_lines.len(),
        units = units.len(),
        "Loaded movie content"
    );
    Ok(AlignmentIndex::build(source_lines, target_lines, units))
}

/// Fixture-style source holding everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
    tracks: HashMap<(MovieId, LanguageId), Vec<SubtitleLine>>,
    alignments: HashMap<(MovieId, LanguageId, LanguageId), Vec<AlignmentUnit>>,
    requests: usize,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_track(&mut self, movie: MovieId, language: LanguageId, lines: Vec<SubtitleLine>) {
        self.tracks.insert((movie, language), lines);
    }

    pub fn insert_alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
        units: Vec<AlignmentUnit>,
    ) {
        self.alignments.insert((movie, source, target), units);
    }

    /// Number of requests served, found or not.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl ContentSource for MemoryContentSource {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError> {
        self.requests += 1;
        self.tracks
            .get(&(movie, language))
            .cloned()
            .ok_or_else(|| ContentError::track_not_found(movie, language))
    }

    fn alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
    ) -> Result<Vec<AlignmentUnit>, ContentError> {
        self.requests += 1;
        self.alignments
            .get(&(movie, source, target))
            .cloned()
            .ok_or_else(|| ContentError::alignment_not_found(movie, source, target))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Track(MovieId, LanguageId),
    Alignment(MovieId, LanguageId, LanguageId),
}

impl CacheKey {
    fn movie(self) -> MovieId {
        match self {
            CacheKey::Track(movie, _) | CacheKey::Alignment(movie, _, _) => movie,
        }
    }
}

#[derive(Debug, Clone)]
enum CachedValue {
    Track(Vec<SubtitleLine>),
    Alignment(Vec<AlignmentUnit>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    value: CachedValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoizes successful responses of an inner source. Failures are never
/// cached. When full, the oldest entry is evicted.
#[derive(Debug)]
pub struct CachedContentSource<S> {
    inner: S,
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl<S: ContentSource> CachedContentSource<S> {
    pub fn new(inner: S, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            ttl,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    /// Drop every cached track and alignment of `movie`.
    pub fn invalidate(&mut self, movie: MovieId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.movie() != movie);
        let removed = before - self.entries.len();
        debug!(movie = %movie, removed, "Invalidated cached content");
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn lookup(&mut self, key: CacheKey) -> Option<CachedValue> {
        let fresh = match self.entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(&key);
                None
            }
            None => None,
        };
        if fresh.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        fresh
    }

    fn store(&mut self, key: CacheKey, value: CachedValue) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                value,
            },
        );
    }
}

impl<S: ContentSource> ContentSource for CachedContentSource<S> {
    fn subtitle_track(
        &mut self,
        movie: MovieId,
        language: LanguageId,
    ) -> Result<Vec<SubtitleLine>, ContentError> {
        let key = CacheKey::Track(movie, language);
        if let Some(CachedValue::Track(lines)) = self.lookup(key) {
            return Ok(lines);
        }
        let lines = self.inner.subtitle_track(movie, language)?;
        self.store(key, CachedValue::Track(lines.clone()));
        Ok(lines)
    }

    fn alignment(
        &mut self,
        movie: MovieId,
        source: LanguageId,
        target: LanguageId,
    ) -> Result<Vec<AlignmentUnit>, ContentError> {
        let key = CacheKey::Alignment(movie, source, target);
        if let Some(CachedValue::Alignment(units)) = self.lookup(key) {
            return Ok(units);
        }
        let units = self.inner.alignment(movie, source, target)?;
        self.store(key, CachedValue::Alignment(units.clone()));
        Ok(units)
    }
}
