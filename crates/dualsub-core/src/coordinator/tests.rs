use super::*;
use crate::content::MemoryContentSource;
use crate::model::{AlignmentUnit, LanguageId, LineId, MovieId, SubtitleLine};
use crate::prefs::{DEFAULT_NAMESPACE, DisabledStorage, MemoryStorage};
use crate::progress::Milestone;
use crate::renderer::ScrollBehavior;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const EN: LanguageId = LanguageId(1);
const ES: LanguageId = LanguageId(2);

fn selection(movie: u64) -> MovieSelection {
    MovieSelection {
        movie_id: MovieId(movie),
        source_language: EN,
        target_language: ES,
    }
}

fn line(id: u64, language: LanguageId) -> SubtitleLine {
    SubtitleLine {
        id: LineId(id),
        sequence_number: id as i64,
        content: format!("line {id}"),
        language,
    }
}

/// Movies 1 and 2 with `units` one-to-one units each.
fn content(units: u64) -> MemoryContentSource {
    let mut source = MemoryContentSource::new();
    for movie in [1, 2] {
        let base = movie * 10_000;
        source.insert_track(
            MovieId(movie),
            EN,
            (0..units).map(|i| line(base + i + 1, EN)).collect(),
        );
        source.insert_track(
            MovieId(movie),
            ES,
            (0..units).map(|i| line(base + 5_000 + i + 1, ES)).collect(),
        );
        source.insert_alignment(
            MovieId(movie),
            EN,
            ES,
            (0..units)
                .map(|i| {
                    AlignmentUnit::new(
                        i as usize,
                        vec![LineId(base + i + 1)],
                        vec![LineId(base + 5_000 + i + 1)],
                    )
                })
                .collect(),
        );
    }
    source
}

fn store_with(records: &[(&str, &str)]) -> PreferenceStore {
    let mut backend = MemoryStorage::new();
    for (key, value) in records {
        backend.insert_raw(*key, *value);
    }
    PreferenceStore::open(Box::new(backend), DEFAULT_NAMESPACE)
}

fn opened(units: u64) -> SessionCoordinator {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    coordinator.open_movie(selection(1), &mut content(units));
    coordinator
}

fn record_events(coordinator: &mut SessionCoordinator) -> Rc<RefCell<Vec<StudyEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    coordinator.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn milestones(events: &Rc<RefCell<Vec<StudyEvent>>>) -> Vec<Milestone> {
    events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            StudyEvent::Milestone(reached) => Some(reached.milestone),
            _ => None,
        })
        .collect()
}

fn started_timer(effects: &[Effect]) -> Option<(u64, Duration)> {
    effects.iter().find_map(|effect| match effect {
        Effect::StartTimer {
            generation,
            interval,
        } => Some((*generation, *interval)),
        _ => None,
    })
}

#[test]
fn fresh_movie_opens_ready_at_first_unit() {
    let coordinator = opened(10);
    assert_eq!(coordinator.state(), SessionState::Ready);
    let nav = coordinator.navigation();
    assert_eq!((nav.current_index, nav.total_units), (0, 10));
    assert_eq!(coordinator.percentage(), 10.0);
    assert!(coordinator.store().load_session("1").is_some());
}

#[test]
fn restore_jumps_without_animation_and_keeps_high_water_mark() {
    let store = store_with(&[(
        "dualsub_session_1",
        r#"{"movieKey": "1", "currentIndex": 6, "highestIndexReached": 8, "isPlaying": false, "playbackSpeedMs": 2500}"#,
    )]);
    let mut coordinator = SessionCoordinator::new(store);
    let events = record_events(&mut coordinator);
    coordinator.open_movie(selection(1), &mut content(10));

    let nav = coordinator.navigation();
    assert_eq!(nav.current_index, 6);
    assert_eq!(nav.highest_index_reached, 8);
    assert_eq!(coordinator.percentage(), 90.0);
    assert_eq!(coordinator.playback_speed_ms(), 2500);
    assert!(milestones(&events).is_empty());
    assert!(coordinator.take_view_effects().iter().any(|effect| matches!(
        effect,
        ViewEffect::ScrollIntoView {
            unit_index: 6,
            behavior: ScrollBehavior::Instant,
            ..
        }
    )));
}

#[test]
fn negative_stored_index_restores_to_zero_paused() {
    let store = store_with(&[(
        "dualsub_session_1",
        r#"{"movieKey": "1", "currentIndex": -5, "isPlaying": true}"#,
    )]);
    let mut coordinator = SessionCoordinator::new(store);
    let effects = coordinator.open_movie(selection(1), &mut content(10));
    assert_eq!(coordinator.navigation().current_index, 0);
    assert_eq!(coordinator.state(), SessionState::Ready);
    assert!(started_timer(&effects).is_none());
    assert_eq!(coordinator.active_timer(), None);
}

#[test]
fn stored_index_past_end_restores_to_zero_paused() {
    let store = store_with(&[(
        "dualsub_session_1",
        r#"{"movieKey": "1", "currentIndex": 40, "isPlaying": true}"#,
    )]);
    let mut coordinator = SessionCoordinator::new(store);
    let effects = coordinator.open_movie(selection(1), &mut content(10));
    assert_eq!(coordinator.navigation().current_index, 0);
    assert_eq!(coordinator.state(), SessionState::Ready);
    assert!(started_timer(&effects).is_none());
}

#[test]
fn corrupt_session_record_falls_back_to_defaults() {
    let store = store_with(&[("dualsub_session_1", "{{{ not json")]);
    let mut coordinator = SessionCoordinator::new(store);
    coordinator.open_movie(selection(1), &mut content(4));
    assert_eq!(coordinator.navigation().current_index, 0);
    assert_eq!(coordinator.state(), SessionState::Ready);
}

#[test]
fn stored_playing_session_resumes_autoplay() {
    let store = store_with(&[(
        "dualsub_session_1",
        r#"{"movieKey": "1", "currentIndex": 2, "isPlaying": true, "playbackSpeedMs": 4000}"#,
    )]);
    let mut coordinator = SessionCoordinator::new(store);
    let effects = coordinator.open_movie(selection(1), &mut content(10));
    assert_eq!(coordinator.state(), SessionState::Playing);
    let (_, interval) = started_timer(&effects).expect("timer started");
    assert_eq!(interval, Duration::from_millis(4000));
}

#[test]
fn autoplay_on_open_applies_only_without_stored_session() {
    let mut coordinator =
        SessionCoordinator::new(PreferenceStore::in_memory()).with_autoplay_on_open(true);
    let effects = coordinator.open_movie(selection(1), &mut content(3));
    assert_eq!(coordinator.state(), SessionState::Playing);
    assert!(started_timer(&effects).is_some());
}

#[test]
fn input_is_dropped_while_loading() {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    let effects = coordinator.select_movie(selection(1));
    assert_eq!(coordinator.state(), SessionState::Loading);
    assert!(matches!(effects.as_slice(), [Effect::FetchContent { .. }]));

    assert!(coordinator.handle(SessionCommand::Play).is_empty());
    coordinator.handle(SessionCommand::Next);
    coordinator.handle(SessionCommand::SetFontSize {
        tag: "large".to_string(),
    });
    assert_eq!(coordinator.state(), SessionState::Loading);
    assert_eq!(coordinator.navigation(), NavigationState::default());
    assert_eq!(
        coordinator.renderer().display().font_size_tag,
        crate::prefs::FontSizeTag::Medium
    );
}

#[test]
fn stale_fetch_results_are_ignored() {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    let mut source = content(5);
    let first = coordinator.select_movie(selection(1));
    let second = coordinator.select_movie(selection(2));
    let id_of = |effects: &[Effect]| {
        effects.iter().find_map(|effect| match effect {
            Effect::FetchContent { request_id, .. } => Some(*request_id),
            _ => None,
        })
    };
    let (first_id, second_id) = (id_of(&first).expect("id"), id_of(&second).expect("id"));

    coordinator.content_loaded(first_id, load_content(&mut source, &selection(1)));
    assert_eq!(coordinator.state(), SessionState::Loading);

    coordinator.content_loaded(second_id, load_content(&mut source, &selection(2)));
    assert_eq!(coordinator.state(), SessionState::Ready);
    assert_eq!(
        coordinator.selection().map(|selected| selected.movie_id),
        Some(MovieId(2))
    );
}

#[test]
fn missing_content_shows_placeholder_and_ignores_playback() {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    coordinator.open_movie(selection(7), &mut content(5));

    assert_eq!(coordinator.state(), SessionState::Ready);
    assert!(coordinator.index().is_empty());
    assert!(
        coordinator
            .renderer()
            .track(crate::model::Side::Source)
            .is_placeholder()
    );
    assert!(coordinator.handle(SessionCommand::Play).is_empty());
    assert_eq!(coordinator.state(), SessionState::Ready);
    coordinator.handle(SessionCommand::Next);
    assert!(coordinator.store().load_session("7").is_none());
}

#[test]
fn out_of_range_go_to_is_ignored() {
    let mut coordinator = opened(10);
    coordinator.handle(SessionCommand::GoTo { index: 3 });
    let before = coordinator.navigation();

    coordinator.handle(SessionCommand::GoTo { index: -1 });
    coordinator.handle(SessionCommand::GoTo { index: 10 });
    assert_eq!(coordinator.navigation(), before);
}

#[test]
fn ten_next_calls_stop_at_last_unit_with_full_progress() {
    let mut coordinator = opened(10);
    for _ in 0..10 {
        coordinator.handle(SessionCommand::Next);
    }
    assert_eq!(coordinator.navigation().current_index, 9);
    assert_eq!(coordinator.percentage(), 100.0);
}

#[test]
fn percentage_survives_backward_navigation() {
    let mut coordinator = opened(10);
    coordinator.handle(SessionCommand::GoTo { index: 9 });
    assert_eq!(coordinator.percentage(), 100.0);

    coordinator.handle(SessionCommand::GoTo { index: 0 });
    let nav = coordinator.navigation();
    assert_eq!(nav.current_index, 0);
    assert_eq!(nav.highest_index_reached, 9);
    assert_eq!(coordinator.percentage(), 100.0);
}

#[test]
fn half_milestone_fires_once_across_repeated_crossings() {
    let mut coordinator = opened(10);
    let events = record_events(&mut coordinator);
    for _ in 0..4 {
        coordinator.handle(SessionCommand::Next);
    }
    assert_eq!(milestones(&events), vec![Milestone::Quarter, Milestone::Half]);

    coordinator.handle(SessionCommand::Previous);
    coordinator.handle(SessionCommand::Next);
    coordinator.handle(SessionCommand::Next);
    coordinator.handle(SessionCommand::Previous);
    let halves = milestones(&events)
        .into_iter()
        .filter(|milestone| *milestone == Milestone::Half)
        .count();
    assert_eq!(halves, 1);
}

#[test]
fn every_accepted_navigation_publishes_position_and_persists() {
    let mut coordinator = opened(10);
    let events = record_events(&mut coordinator);
    coordinator.handle(SessionCommand::Next);
    coordinator.handle(SessionCommand::GoTo { index: 42 });
    coordinator.handle(SessionCommand::Next);

    let positions: Vec<usize> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            StudyEvent::PositionChanged(position) => Some(position.current_index),
            _ => None,
        })
        .collect();
    assert_eq!(positions, vec![1, 2]);
    let stored = coordinator.store().load_session("1").expect("session");
    assert_eq!(stored.current_index, 2);
    assert_eq!(stored.highest_index_reached, 2);
}

#[test]
fn autoplay_ticks_advance_then_end_and_complete_once() {
    let mut coordinator = opened(10);
    let events = record_events(&mut coordinator);
    let effects = coordinator.handle(SessionCommand::Play);
    let (generation, interval) = started_timer(&effects).expect("timer");
    assert_eq!(interval, Duration::from_millis(3000));
    assert_eq!(coordinator.state(), SessionState::Playing);

    for _ in 0..9 {
        assert!(coordinator.handle(SessionCommand::Tick { generation }).is_empty());
    }
    assert_eq!(coordinator.navigation().current_index, 9);
    assert_eq!(coordinator.state(), SessionState::Playing);

    let effects = coordinator.handle(SessionCommand::Tick { generation });
    assert_eq!(effects, vec![Effect::CancelTimer { generation }]);
    assert_eq!(coordinator.state(), SessionState::Ended);
    assert_eq!(coordinator.active_timer(), None);

    let completions = events
        .borrow()
        .iter()
        .filter(|event| matches!(event, StudyEvent::Completed { .. }))
        .count();
    assert_eq!(completions, 1);
    assert!(!coordinator.store().load_session("1").expect("session").is_playing);
}

#[test]
fn autoplay_scrolls_smoothly() {
    let mut coordinator = opened(5);
    let generation = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    coordinator.take_view_effects();
    coordinator.handle(SessionCommand::Tick { generation });
    assert!(coordinator.take_view_effects().iter().any(|effect| matches!(
        effect,
        ViewEffect::ScrollIntoView {
            behavior: ScrollBehavior::Smooth,
            ..
        }
    )));
}

#[test]
fn manual_navigation_while_playing_keeps_timer() {
    let mut coordinator = opened(10);
    let generation = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");

    assert!(coordinator.handle(SessionCommand::GoTo { index: 5 }).is_empty());
    assert_eq!(coordinator.active_timer(), Some(generation));
    coordinator.handle(SessionCommand::Tick { generation });
    assert_eq!(coordinator.navigation().current_index, 6);
    assert_eq!(coordinator.state(), SessionState::Playing);
}

#[test]
fn pause_cancels_timer_and_keeps_position() {
    let mut coordinator = opened(10);
    let generation = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    coordinator.handle(SessionCommand::Tick { generation });

    let effects = coordinator.handle(SessionCommand::TogglePlayPause);
    assert_eq!(effects, vec![Effect::CancelTimer { generation }]);
    assert_eq!(coordinator.state(), SessionState::Paused);
    coordinator.handle(SessionCommand::Tick { generation });
    assert_eq!(coordinator.navigation().current_index, 1);
    assert_eq!(
        coordinator.store().preferences().playback.last_playback_state,
        PlaybackState::Paused
    );
}

#[test]
fn stale_generation_ticks_are_ignored() {
    let mut coordinator = opened(10);
    let first = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    coordinator.handle(SessionCommand::Pause);
    let second = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    assert_ne!(first, second);

    coordinator.handle(SessionCommand::Tick { generation: first });
    assert_eq!(coordinator.navigation().current_index, 0);
    coordinator.handle(SessionCommand::Tick { generation: second });
    assert_eq!(coordinator.navigation().current_index, 1);
}

#[test]
fn switching_movies_mid_autoplay_stops_the_timer() {
    let mut source = content(10);
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    coordinator.open_movie(selection(1), &mut source);
    let generation = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    coordinator.handle(SessionCommand::Tick { generation });

    let effects = coordinator.open_movie(selection(2), &mut source);
    assert!(effects.contains(&Effect::CancelTimer { generation }));
    // Autoplay preference carries over, but on a fresh timer.
    assert_ne!(coordinator.active_timer(), Some(generation));

    coordinator.handle(SessionCommand::Tick { generation });
    coordinator.handle(SessionCommand::Tick { generation });
    assert_eq!(coordinator.navigation().current_index, 0);
    assert_eq!(
        coordinator.selection().map(|selected| selected.movie_id),
        Some(MovieId(2))
    );

    let first = coordinator.store().load_session("1").expect("old session");
    assert_eq!(first.current_index, 1);
}

#[test]
fn switch_movie_returns_to_idle_and_drops_navigation() {
    let mut coordinator = opened(10);
    coordinator.handle(SessionCommand::GoTo { index: 4 });
    coordinator.handle(SessionCommand::SwitchMovie);

    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(coordinator.index().is_empty());
    assert!(coordinator.handle(SessionCommand::Next).is_empty());
    assert_eq!(
        coordinator.store().load_session("1").map(|s| s.current_index),
        Some(4)
    );
}

#[test]
fn navigating_after_end_pauses() {
    let mut coordinator = opened(3);
    let generation = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    for _ in 0..3 {
        coordinator.handle(SessionCommand::Tick { generation });
    }
    assert_eq!(coordinator.state(), SessionState::Ended);

    coordinator.handle(SessionCommand::Next);
    assert_eq!(coordinator.state(), SessionState::Ended);
    coordinator.handle(SessionCommand::Previous);
    assert_eq!(coordinator.state(), SessionState::Paused);
    assert_eq!(coordinator.navigation().current_index, 1);
}

#[test]
fn invalid_speeds_fall_back_to_default() {
    let mut coordinator = opened(5);
    for speed_ms in [999, 6000] {
        coordinator.handle(SessionCommand::SetSpeed { speed_ms });
        assert_eq!(coordinator.playback_speed_ms(), 3000);
        assert_eq!(coordinator.store().preferences().playback.playback_speed_ms, 3000);
    }
    coordinator.handle(SessionCommand::SetSpeed { speed_ms: 1200 });
    assert_eq!(coordinator.playback_speed_ms(), 1200);
}

#[test]
fn speed_change_while_playing_restarts_timer() {
    let mut coordinator = opened(5);
    let first = started_timer(&coordinator.handle(SessionCommand::Play))
        .map(|(generation, _)| generation)
        .expect("timer");
    let effects = coordinator.handle(SessionCommand::SetSpeedTag {
        tag: "fast".to_string(),
    });
    assert!(effects.contains(&Effect::CancelTimer { generation: first }));
    let (second, interval) = started_timer(&effects).expect("restarted");
    assert_ne!(first, second);
    assert_eq!(interval, Duration::from_millis(2000));
    assert_eq!(
        coordinator.store().preferences().playback.preferred_speed_tag,
        SpeedTag::Fast
    );

    assert!(
        coordinator
            .handle(SessionCommand::SetSpeedTag {
                tag: "warp".to_string()
            })
            .is_empty()
    );
    assert_eq!(coordinator.playback_speed_ms(), 2000);
}

#[test]
fn display_preferences_apply_without_a_movie() {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    coordinator.handle(SessionCommand::SetColumnLayout {
        tag: "right".to_string(),
    });
    coordinator.handle(SessionCommand::SetFontSize {
        tag: "huge".to_string(),
    });
    assert_eq!(coordinator.renderer().layout_class(), "layout-right");
    assert_eq!(coordinator.renderer().font_class(), "font-size-medium");
}

#[test]
fn bookmarks_are_unique_validated_and_jumpable() {
    let mut coordinator = opened(10);
    coordinator.handle(SessionCommand::GoTo { index: 3 });
    coordinator.handle(SessionCommand::AddBookmark {
        note: Some("  tricky idiom ".to_string()),
    });
    coordinator.handle(SessionCommand::AddBookmark { note: None });
    coordinator.handle(SessionCommand::GoTo { index: 7 });
    coordinator.handle(SessionCommand::AddBookmark {
        note: Some("x".repeat(MAX_BOOKMARK_NOTE_CHARS + 1)),
    });
    assert_eq!(coordinator.bookmarks().len(), 1);
    assert_eq!(coordinator.bookmarks()[0].note.as_deref(), Some("tricky idiom"));

    coordinator.take_view_effects();
    coordinator.handle(SessionCommand::JumpToBookmark { index: 3 });
    assert_eq!(coordinator.navigation().current_index, 3);
    assert!(coordinator.take_view_effects().iter().all(|effect| !matches!(
        effect,
        ViewEffect::ScrollIntoView {
            behavior: ScrollBehavior::Smooth,
            ..
        }
    )));

    coordinator.handle(SessionCommand::JumpToBookmark { index: 7 });
    assert_eq!(coordinator.navigation().current_index, 3);

    let stored = coordinator.store().load_session("1").expect("session");
    assert_eq!(stored.bookmarks.len(), 1);
    coordinator.handle(SessionCommand::RemoveBookmark { index: 3 });
    assert!(coordinator.bookmarks().is_empty());
}

#[test]
fn clear_session_removes_stored_record() {
    let mut coordinator = opened(10);
    coordinator.handle(SessionCommand::GoTo { index: 5 });
    assert!(coordinator.store().load_session("1").is_some());

    coordinator.handle(SessionCommand::ClearSession);
    assert!(coordinator.store().load_session("1").is_none());
    assert_eq!(coordinator.navigation().current_index, 5);
}

#[test]
fn cleared_progress_stays_cleared_after_next_step() {
    let mut coordinator = opened(10);
    let events = record_events(&mut coordinator);
    coordinator.handle(SessionCommand::GoTo { index: 8 });
    coordinator.handle(SessionCommand::GoTo { index: 3 });
    coordinator.handle(SessionCommand::ClearSession);
    assert_eq!(coordinator.navigation().highest_index_reached, 3);
    coordinator.handle(SessionCommand::GoTo { index: 0 });

    let stored = coordinator.store().load_session("1").expect("session");
    assert_eq!(stored.current_index, 0);
    assert_eq!(stored.highest_index_reached, 3);
    assert_eq!(coordinator.percentage(), 40.0);

    // Milestones past the cleared position are earned again.
    events.borrow_mut().clear();
    coordinator.handle(SessionCommand::GoTo { index: 4 });
    assert_eq!(milestones(&events), vec![Milestone::Half]);
}

fn clocked(now: &Rc<Cell<u64>>) -> SessionCoordinator {
    let clock = Rc::clone(now);
    SessionCoordinator::new(PreferenceStore::in_memory()).with_clock(move || clock.get())
}

#[test]
fn study_time_accrues_between_steps_and_is_persisted() {
    let now = Rc::new(Cell::new(1_000));
    let mut coordinator = clocked(&now);
    let events = record_events(&mut coordinator);
    coordinator.open_movie(selection(1), &mut content(10));
    assert_eq!(coordinator.study_time(), Duration::ZERO);

    now.set(31_000);
    coordinator.handle(SessionCommand::Next);
    now.set(41_000);
    coordinator.handle(SessionCommand::Next);

    assert_eq!(coordinator.study_time(), Duration::from_secs(40));
    let stored = coordinator.store().load_session("1").expect("session");
    assert_eq!(stored.study_time_ms, 40_000);
    assert_eq!(stored.last_updated, 41_000);
    let reported = events.borrow().iter().rev().find_map(|event| match event {
        StudyEvent::PositionChanged(position) => Some(position.study_time_ms),
        _ => None,
    });
    assert_eq!(reported, Some(40_000));
}

#[test]
fn long_idle_gaps_count_only_up_to_the_limit() {
    let now = Rc::new(Cell::new(0));
    let mut coordinator = clocked(&now);
    coordinator.open_movie(selection(1), &mut content(10));

    now.set(8 * 60 * 60 * 1000);
    coordinator.handle(SessionCommand::Next);
    assert_eq!(coordinator.study_time(), Duration::from_millis(STUDY_GAP_LIMIT_MS));
}

#[test]
fn study_time_stops_when_ended_and_carries_across_reopen() {
    let now = Rc::new(Cell::new(0));
    let mut coordinator = clocked(&now);
    let effects = coordinator.open_movie(selection(1), &mut content(2));
    assert!(started_timer(&effects).is_none());
    let effects = coordinator.handle(SessionCommand::Play);
    let (generation, _) = started_timer(&effects).expect("timer");

    now.set(3_000);
    coordinator.handle(SessionCommand::Tick { generation });
    now.set(6_000);
    coordinator.handle(SessionCommand::Tick { generation });
    assert_eq!(coordinator.state(), SessionState::Ended);
    assert_eq!(coordinator.study_time(), Duration::from_secs(6));

    // Time spent on the end screen is not study time.
    now.set(60_000);
    coordinator.switch_movie();
    assert_eq!(coordinator.store().load_session("1").expect("session").study_time_ms, 6_000);

    coordinator.open_movie(selection(1), &mut content(2));
    now.set(62_000);
    coordinator.handle(SessionCommand::Previous);
    assert_eq!(coordinator.study_time(), Duration::from_secs(8));
}

#[test]
fn storage_failure_never_blocks_navigation() {
    let store = PreferenceStore::open(Box::new(DisabledStorage), DEFAULT_NAMESPACE);
    let mut coordinator = SessionCoordinator::new(store);
    coordinator.open_movie(selection(1), &mut content(4));
    coordinator.handle(SessionCommand::Next);
    coordinator.handle(SessionCommand::SetFontSize {
        tag: "small".to_string(),
    });

    assert_eq!(coordinator.navigation().current_index, 1);
    assert!(coordinator.store().is_degraded());
    assert_eq!(coordinator.renderer().font_class(), "font-size-small");
}

#[test]
fn state_changes_are_published() {
    let mut coordinator = SessionCoordinator::new(PreferenceStore::in_memory());
    let events = record_events(&mut coordinator);
    coordinator.open_movie(selection(1), &mut content(3));
    let transitions: Vec<(&str, &str)> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            StudyEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(transitions, vec![("idle", "loading"), ("loading", "ready")]);
}
