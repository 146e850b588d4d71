//! Top-level owner of one study session.
//!
//! The coordinator is a synchronous state machine: commands come in through
//! [`SessionCoordinator::handle`], and work that has to happen outside (fetch
//! content, start or cancel the autoplay timer) goes out as [`Effect`]s for
//! the event loop to carry out. Timer ticks and fetch completions come back
//! tagged with the generation or request id they were issued for, and anything
//! stale is dropped. Every position change funnels through one `navigate`
//! call.
//!
//! Study time accrues while a movie is open and not ended. Gaps between two
//! persisted steps longer than [`STUDY_GAP_LIMIT_MS`] count only up to that
//! limit, so a session left open overnight does not inflate the total.

use crate::alignment::AlignmentIndex;
use crate::content::{ContentError, ContentSource, load_content};
use crate::events::{EventBus, MilestoneReached, PositionChanged, StudyEvent, SubscriptionId};
use crate::model::MovieSelection;
use crate::prefs::{
    Bookmark, MAX_BOOKMARK_NOTE_CHARS, PlaybackSession, PlaybackState, PreferenceStore, SpeedTag,
    validated_speed_ms,
};
use crate::progress::{ProgressTracker, completion_percentage};
use crate::renderer::{DualTrackRenderer, NavigationState, ViewEffect};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

pub const STUDY_GAP_LIMIT_MS: u64 = 5 * 60 * 1000;

type Clock = Box<dyn Fn() -> u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        }
    }

    fn accepts_navigation(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Ended)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Next,
    Previous,
    /// Explicit jump; out-of-range (including negative) targets are ignored.
    GoTo { index: i64 },
    JumpToBookmark { index: usize },
    Play,
    Pause,
    TogglePlayPause,
    SetSpeed { speed_ms: u32 },
    SetSpeedTag { tag: String },
    SetFontSize { tag: String },
    SetColumnLayout { tag: String },
    SetRapidNavigation { enabled: bool },
    AddBookmark { note: Option<String> },
    RemoveBookmark { index: usize },
    Tick { generation: u64 },
    ClearSession,
    SwitchMovie,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Next => "study_next",
            Self::Previous => "study_previous",
            Self::GoTo { .. } => "study_go_to",
            Self::JumpToBookmark { .. } => "study_jump_to_bookmark",
            Self::Play => "study_play",
            Self::Pause => "study_pause",
            Self::TogglePlayPause => "study_toggle_play_pause",
            Self::SetSpeed { .. } => "study_set_speed",
            Self::SetSpeedTag { .. } => "study_set_speed_tag",
            Self::SetFontSize { .. } => "study_set_font_size",
            Self::SetColumnLayout { .. } => "study_set_column_layout",
            Self::SetRapidNavigation { .. } => "study_set_rapid_navigation",
            Self::AddBookmark { .. } => "study_add_bookmark",
            Self::RemoveBookmark { .. } => "study_remove_bookmark",
            Self::Tick { .. } => "study_tick",
            Self::ClearSession => "study_clear_session",
            Self::SwitchMovie => "study_switch_movie",
        }
    }

    /// Process-wide settings that do not need a loaded movie.
    fn is_preference(&self) -> bool {
        matches!(
            self,
            Self::SetSpeed { .. }
                | Self::SetSpeedTag { .. }
                | Self::SetFontSize { .. }
                | Self::SetColumnLayout { .. }
                | Self::SetRapidNavigation { .. }
        )
    }
}

/// Work the event loop performs on the coordinator's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchContent {
        request_id: u64,
        selection: MovieSelection,
    },
    /// Deliver `SessionCommand::Tick { generation }` every `interval` until
    /// cancelled.
    StartTimer { generation: u64, interval: Duration },
    CancelTimer { generation: u64 },
}

pub struct SessionCoordinator {
    store: PreferenceStore,
    renderer: DualTrackRenderer,
    index: AlignmentIndex,
    state: SessionState,
    selection: Option<MovieSelection>,
    session: Option<PlaybackSession>,
    progress: ProgressTracker,
    events: EventBus,
    request_id: u64,
    timer: Option<u64>,
    next_generation: u64,
    autoplay_on_open: bool,
    clock: Clock,
    active_since: Option<u64>,
}

impl SessionCoordinator {
    pub fn new(store: PreferenceStore) -> Self {
        let renderer = DualTrackRenderer::new(store.preferences().display);
        Self {
            store,
            renderer,
            index: AlignmentIndex::empty(),
            state: SessionState::Idle,
            selection: None,
            session: None,
            progress: ProgressTracker::new(),
            events: EventBus::new(),
            request_id: 0,
            timer: None,
            next_generation: 0,
            autoplay_on_open: false,
            clock: Box::new(epoch_millis),
            active_since: None,
        }
    }

    /// Replace the wall clock (Unix epoch milliseconds).
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Start playing on open when the movie has no stored session.
    pub fn with_autoplay_on_open(mut self, enabled: bool) -> Self {
        self.autoplay_on_open = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selection(&self) -> Option<&MovieSelection> {
        self.selection.as_ref()
    }

    pub fn index(&self) -> &AlignmentIndex {
        &self.index
    }

    pub fn renderer(&self) -> &DualTrackRenderer {
        &self.renderer
    }

    pub fn navigation(&self) -> NavigationState {
        self.renderer.navigation()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.session
            .as_ref()
            .map(|session| session.bookmarks.as_slice())
            .unwrap_or(&[])
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn percentage(&self) -> f64 {
        self.progress.last_percentage()
    }

    pub fn playback_speed_ms(&self) -> u32 {
        self.session
            .as_ref()
            .map(|session| session.playback_speed_ms)
            .unwrap_or(self.store.preferences().playback.playback_speed_ms)
    }

    pub fn study_time(&self) -> Duration {
        Duration::from_millis(
            self.session
                .as_ref()
                .map(|session| session.study_time_ms)
                .unwrap_or_default(),
        )
    }

    /// Generation of the live autoplay timer, if any.
    pub fn active_timer(&self) -> Option<u64> {
        self.timer
    }

    pub fn take_view_effects(&mut self) -> Vec<ViewEffect> {
        self.renderer.take_effects()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StudyEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Begin loading `selection`, leaving any open movie first.
    pub fn select_movie(&mut self, selection: MovieSelection) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state != SessionState::Idle {
            effects.extend(self.switch_movie());
        }
        self.request_id += 1;
        self.selection = Some(selection);
        self.set_state(SessionState::Loading);
        info!(
            movie = %selection.movie_id,
            source = %selection.source_language,
            target = %selection.target_language,
            request_id = self.request_id,
            "Loading movie"
        );
        effects.push(Effect::FetchContent {
            request_id: self.request_id,
            selection,
        });
        effects
    }

    /// Complete a fetch issued by [`Effect::FetchContent`]. Results for any
    /// request other than the latest are ignored.
    pub fn content_loaded(
        &mut self,
        request_id: u64,
        result: Result<AlignmentIndex, ContentError>,
    ) -> Vec<Effect> {
        if self.state != SessionState::Loading || request_id != self.request_id {
            debug!(
                request_id,
                latest = self.request_id,
                state = self.state.name(),
                "Ignoring stale content result"
            );
            return Vec::new();
        }
        let Some(selection) = self.selection else {
            return Vec::new();
        };

        self.index = match result {
            Ok(index) => index,
            Err(err) if err.is_not_found() => {
                info!(movie = %selection.movie_id, "No content available: {err}");
                AlignmentIndex::empty()
            }
            Err(err) => {
                warn!(movie = %selection.movie_id, "Failed to load content: {err}");
                AlignmentIndex::empty()
            }
        };
        self.renderer.render_all(&self.index);
        self.set_state(SessionState::Ready);
        self.active_since = Some((self.clock)());
        self.restore(selection)
    }

    /// Select and load synchronously from `source`.
    pub fn open_movie(
        &mut self,
        selection: MovieSelection,
        source: &mut dyn ContentSource,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        for effect in self.select_movie(selection) {
            match effect {
                Effect::FetchContent {
                    request_id,
                    selection,
                } => {
                    let result = load_content(source, &selection);
                    effects.extend(self.content_loaded(request_id, result));
                }
                other => effects.push(other),
            }
        }
        effects
    }

    pub fn handle(&mut self, command: SessionCommand) -> Vec<Effect> {
        let action = command.action();
        if self.state == SessionState::Loading
            || (self.state == SessionState::Idle && !command.is_preference())
        {
            debug!(action, state = self.state.name(), "Dropping command");
            return Vec::new();
        }
        debug!(action, state = self.state.name(), "Handling command");

        let mut effects = Vec::new();
        match command {
            SessionCommand::Next => {
                if self.renderer.next() {
                    self.after_navigation();
                }
            }
            SessionCommand::Previous => {
                if self.renderer.previous() {
                    self.after_navigation();
                }
            }
            SessionCommand::GoTo { index } => match usize::try_from(index) {
                Ok(index) => {
                    self.navigate(index, false);
                }
                Err(_) => debug!(index, "Ignoring negative navigation target"),
            },
            SessionCommand::JumpToBookmark { index } => {
                if self.bookmarks().iter().any(|bookmark| bookmark.index == index) {
                    self.navigate(index, false);
                } else {
                    debug!(index, "No bookmark at index");
                }
            }
            SessionCommand::Play => self.play(&mut effects),
            SessionCommand::Pause => self.pause(&mut effects),
            SessionCommand::TogglePlayPause => {
                if self.state == SessionState::Playing {
                    self.pause(&mut effects);
                } else {
                    self.play(&mut effects);
                }
            }
            SessionCommand::SetSpeed { speed_ms } => {
                self.set_speed(validated_speed_ms(speed_ms), None, &mut effects)
            }
            SessionCommand::SetSpeedTag { tag } => match SpeedTag::parse(&tag) {
                Some(speed_tag) => self.set_speed(speed_tag.speed_ms(), Some(speed_tag), &mut effects),
                None => warn!(tag = %tag, "Unknown speed preset; ignoring"),
            },
            SessionCommand::SetFontSize { tag } => {
                self.renderer.set_font_size(&tag, &mut self.store);
            }
            SessionCommand::SetColumnLayout { tag } => {
                self.renderer.set_column_layout(&tag, &mut self.store);
            }
            SessionCommand::SetRapidNavigation { enabled } => {
                self.renderer.set_rapid_navigation(enabled);
            }
            SessionCommand::AddBookmark { note } => self.add_bookmark(note),
            SessionCommand::RemoveBookmark { index } => self.remove_bookmark(index),
            SessionCommand::Tick { generation } => self.tick(generation, &mut effects),
            SessionCommand::ClearSession => self.clear_session(),
            SessionCommand::SwitchMovie => effects.extend(self.switch_movie()),
        }
        effects
    }

    /// Leave the current movie: cancel autoplay, persist the final session and
    /// drop the index.
    pub fn switch_movie(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        if self.state.accepts_navigation() {
            self.persist_session();
        }
        if let Some(selection) = self.selection.take() {
            info!(movie = %selection.movie_id, "Leaving movie");
        }
        // Invalidates any fetch still in flight.
        self.request_id += 1;
        self.index = AlignmentIndex::empty();
        self.renderer.clear();
        self.session = None;
        self.progress = ProgressTracker::new();
        self.active_since = None;
        self.set_state(SessionState::Idle);
        effects
    }

    fn restore(&mut self, selection: MovieSelection) -> Vec<Effect> {
        let key = selection.storage_key();
        let total = self.index.count();
        let stored = self.store.load_session(&key);
        let had_session = stored.is_some();
        let mut session = stored.unwrap_or_else(|| {
            let mut fresh = PlaybackSession::new(key.clone());
            fresh.playback_speed_ms = self.store.preferences().playback.playback_speed_ms;
            fresh
        });
        if total > 0 && session.current_index >= total {
            warn!(
                movie = %key,
                index = session.current_index,
                total,
                "Stored position is past the end; restarting from the first unit"
            );
            session.current_index = 0;
            session.is_playing = false;
        }
        let last = total.saturating_sub(1);
        session.highest_index_reached = session
            .highest_index_reached
            .min(last)
            .max(session.current_index);
        session.bookmarks.retain(|bookmark| bookmark.index < total);

        let resume_playing = if had_session {
            session.is_playing
        } else {
            self.autoplay_on_open || self.store.preferences().playback.is_auto_playing
        };
        let restored_index = session.current_index;
        let highest = session.highest_index_reached;
        self.session = Some(session);

        let mut effects = Vec::new();
        if total == 0 {
            return effects;
        }
        self.renderer.restore_high_water(highest);
        self.progress = ProgressTracker::seeded(completion_percentage(highest, total));
        info!(movie = %key, index = restored_index, highest, total, "Restoring position");
        self.navigate(restored_index, false);
        if resume_playing {
            self.play(&mut effects);
        }
        effects
    }

    fn navigate(&mut self, index: usize, smooth: bool) -> bool {
        let moved = self.renderer.go_to(index, smooth);
        if moved {
            self.after_navigation();
        }
        moved
    }

    fn after_navigation(&mut self) {
        if self.state == SessionState::Ended {
            self.set_state(SessionState::Paused);
        }
        self.persist_session();

        let Some(selection) = self.selection else {
            return;
        };
        let nav = self.renderer.navigation();
        let report =
            self.progress
                .compute(nav.current_index, nav.total_units, nav.highest_index_reached);
        let study_time_ms = self.study_time().as_millis() as u64;
        self.events
            .publish(&StudyEvent::PositionChanged(PositionChanged {
                movie_id: selection.movie_id,
                current_index: report.current_index,
                highest_index_reached: report.highest_index_reached,
                percentage: report.percentage,
                study_time_ms,
            }));
        for milestone in report.milestones_crossed {
            info!(movie = %selection.movie_id, %milestone, "Milestone reached");
            self.events.publish(&StudyEvent::Milestone(MilestoneReached {
                movie_id: selection.movie_id,
                milestone,
            }));
        }
        if report.completed {
            info!(movie = %selection.movie_id, "Movie completed");
            self.events.publish(&StudyEvent::Completed {
                movie_id: selection.movie_id,
            });
        }
    }

    fn persist_session(&mut self) {
        let nav = self.renderer.navigation();
        let playing = self.state == SessionState::Playing;
        let now = (self.clock)();
        let studying = matches!(
            self.state,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        );
        let since = std::mem::replace(&mut self.active_since, studying.then_some(now));
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if nav.is_empty() {
            return;
        }
        if let Some(since) = since {
            let elapsed = now.saturating_sub(since).min(STUDY_GAP_LIMIT_MS);
            session.study_time_ms = session.study_time_ms.saturating_add(elapsed);
        }
        session.current_index = nav.current_index;
        session.highest_index_reached = nav.highest_index_reached;
        session.is_playing = playing;
        session.last_updated = now;
        let snapshot = session.clone();
        self.store.save_session(&snapshot);
    }

    fn play(&mut self, effects: &mut Vec<Effect>) {
        if !matches!(self.state, SessionState::Ready | SessionState::Paused) {
            debug!(state = self.state.name(), "Play ignored");
            return;
        }
        if self.index.is_empty() {
            debug!("Nothing to play");
            return;
        }
        self.set_state(SessionState::Playing);
        self.start_timer(effects);
        self.record_playback_state(PlaybackState::Playing);
        self.persist_session();
    }

    fn pause(&mut self, effects: &mut Vec<Effect>) {
        if self.state != SessionState::Playing {
            debug!(state = self.state.name(), "Pause ignored");
            return;
        }
        self.cancel_timer(effects);
        self.set_state(SessionState::Paused);
        self.record_playback_state(PlaybackState::Paused);
        self.persist_session();
    }

    fn tick(&mut self, generation: u64, effects: &mut Vec<Effect>) {
        if self.state != SessionState::Playing || self.timer != Some(generation) {
            debug!(generation, active = ?self.timer, "Ignoring stale autoplay tick");
            return;
        }
        if self.renderer.next() {
            self.after_navigation();
            return;
        }
        info!(index = self.navigation().current_index, "Reached the last unit; autoplay stopped");
        self.cancel_timer(effects);
        self.set_state(SessionState::Ended);
        self.record_playback_state(PlaybackState::Paused);
        self.persist_session();
    }

    fn start_timer(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_timer(effects);
        self.next_generation += 1;
        let generation = self.next_generation;
        let interval = Duration::from_millis(u64::from(self.playback_speed_ms()));
        self.timer = Some(generation);
        debug!(generation, interval_ms = interval.as_millis() as u64, "Starting autoplay timer");
        effects.push(Effect::StartTimer {
            generation,
            interval,
        });
    }

    fn cancel_timer(&mut self, effects: &mut Vec<Effect>) {
        if let Some(generation) = self.timer.take() {
            debug!(generation, "Cancelling autoplay timer");
            effects.push(Effect::CancelTimer { generation });
        }
    }

    fn set_speed(&mut self, speed_ms: u32, tag: Option<SpeedTag>, effects: &mut Vec<Effect>) {
        self.store.update_preferences(|prefs| {
            prefs.playback.playback_speed_ms = speed_ms;
            if let Some(tag) = tag {
                prefs.playback.preferred_speed_tag = tag;
            }
        });
        if let Some(session) = self.session.as_mut() {
            session.playback_speed_ms = speed_ms;
        }
        info!(speed_ms, "Playback speed changed");
        if self.state == SessionState::Playing {
            self.start_timer(effects);
        }
        if self.state.accepts_navigation() {
            self.persist_session();
        }
    }

    fn record_playback_state(&mut self, state: PlaybackState) {
        self.store.update_preferences(|prefs| {
            prefs.playback.last_playback_state = state;
            prefs.playback.is_auto_playing = state == PlaybackState::Playing;
        });
    }

    fn add_bookmark(&mut self, note: Option<String>) {
        let nav = self.renderer.navigation();
        if nav.is_empty() {
            debug!("No unit to bookmark");
            return;
        }
        let note = note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
        if let Some(note) = &note {
            let chars = note.chars().count();
            if chars > MAX_BOOKMARK_NOTE_CHARS {
                warn!(chars, limit = MAX_BOOKMARK_NOTE_CHARS, "Bookmark note too long; ignoring");
                return;
            }
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let index = nav.current_index;
        match session
            .bookmarks
            .binary_search_by_key(&index, |bookmark| bookmark.index)
        {
            Ok(_) => {
                debug!(index, "Unit already bookmarked");
                return;
            }
            Err(position) => session.bookmarks.insert(position, Bookmark { index, note }),
        }
        info!(
            index,
            preview = %self.index.preview(index).unwrap_or_default(),
            "Bookmark added"
        );
        self.persist_session();
    }

    fn remove_bookmark(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let before = session.bookmarks.len();
        session.bookmarks.retain(|bookmark| bookmark.index != index);
        if session.bookmarks.len() == before {
            debug!(index, "No bookmark to remove");
            return;
        }
        info!(index, "Bookmark removed");
        self.persist_session();
    }

    fn clear_session(&mut self) {
        let Some(selection) = self.selection else {
            return;
        };
        let key = selection.storage_key();
        self.store.clear_session(&key);
        let speed = self.playback_speed_ms();
        let mut fresh = PlaybackSession::new(key);
        fresh.playback_speed_ms = speed;
        self.session = Some(fresh);

        self.renderer.reset_high_water();
        let nav = self.renderer.navigation();
        self.progress = if nav.is_empty() {
            ProgressTracker::new()
        } else {
            ProgressTracker::seeded(completion_percentage(nav.current_index, nav.total_units))
        };
        if self.active_since.is_some() {
            self.active_since = Some((self.clock)());
        }
        info!(movie = %selection.movie_id, index = nav.current_index, "Session cleared");
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        let from = self.state.name();
        self.state = next;
        debug!(from, to = next.name(), "Session state changed");
        self.events.publish(&StudyEvent::StateChanged {
            from,
            to: next.name(),
        });
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
