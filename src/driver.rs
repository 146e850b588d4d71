//! Single-threaded event loop around the session coordinator.
//!
//! Stdin lines, autoplay ticks and Ctrl-C all arrive on one channel and are
//! applied one at a time, so every position change is serialized through the
//! coordinator. Ticker threads only ever send; they never touch state.

use crate::cancellation::CancellationToken;
use crate::terminal::{self, HELP, Input};
use anyhow::{Context, Result};
use dualsub_core::content::load_content;
use dualsub_core::{
    ContentSource, Effect, LanguageId, MovieId, MovieSelection, SessionCommand,
    SessionCoordinator,
};
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum Event {
    Input(String),
    Tick { generation: u64 },
    InputClosed,
    Interrupt,
}

pub struct Driver {
    coordinator: SessionCoordinator,
    source: Box<dyn ContentSource>,
    default_languages: (LanguageId, LanguageId),
    timers: HashMap<u64, CancellationToken>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Driver {
    pub fn new(
        coordinator: SessionCoordinator,
        source: Box<dyn ContentSource>,
        default_languages: (LanguageId, LanguageId),
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            coordinator,
            source,
            default_languages,
            timers: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn run(mut self, selection: MovieSelection) -> Result<()> {
        spawn_stdin_reader(self.sender()).context("Failed to start input reader")?;
        let effects = self.coordinator.select_movie(selection);
        self.apply(effects);
        self.draw();
        println!("type `help` for commands");

        while let Ok(event) = self.rx.recv() {
            match event {
                Event::Input(line) => match terminal::parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => self.handle_input(input),
                    Err(err) => println!("{err}"),
                },
                Event::Tick { generation } => {
                    let effects = self
                        .coordinator
                        .handle(SessionCommand::Tick { generation });
                    self.apply(effects);
                    self.draw();
                }
                Event::InputClosed => {
                    info!("Input closed");
                    break;
                }
                Event::Interrupt => {
                    info!("Interrupted");
                    break;
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Command(command) => {
                let effects = self.coordinator.handle(command);
                self.apply(effects);
                self.draw();
            }
            Input::Open { movie, languages } => {
                let (source_language, target_language) = languages
                    .map(|(source, target)| (LanguageId(source), LanguageId(target)))
                    .unwrap_or(self.default_languages);
                let effects = self.coordinator.select_movie(MovieSelection {
                    movie_id: MovieId(movie),
                    source_language,
                    target_language,
                });
                self.apply(effects);
                self.draw();
            }
            Input::Show => self.draw(),
            Input::Marks => self.print_bookmarks(),
            Input::Help => println!("{HELP}"),
            Input::Quit => {}
        }
    }

    /// Carry out effects, including any effects that follow from them.
    fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::FetchContent {
                    request_id,
                    selection,
                } => {
                    let result = load_content(self.source.as_mut(), &selection);
                    if let Err(err) = &result {
                        println!("{err}");
                    }
                    queue.extend(self.coordinator.content_loaded(request_id, result));
                }
                Effect::StartTimer {
                    generation,
                    interval,
                } => self.start_ticker(generation, interval),
                Effect::CancelTimer { generation } => {
                    if let Some(token) = self.timers.remove(&generation) {
                        token.cancel();
                    }
                }
            }
        }
    }

    fn start_ticker(&mut self, generation: u64, interval: Duration) {
        let token = CancellationToken::new();
        self.timers.insert(generation, token.clone());
        let tx = self.sender();
        let spawned = thread::Builder::new()
            .name(format!("autoplay-{generation}"))
            .spawn(move || {
                while token.sleep(interval) {
                    if tx.send(Event::Tick { generation }).is_err() {
                        break;
                    }
                }
                debug!(generation, "Autoplay ticker stopped");
            });
        if let Err(err) = spawned {
            warn!(generation, "Failed to start autoplay ticker: {err}");
        }
    }

    fn draw(&mut self) {
        // Whole frames are redrawn; view effects are only drained.
        let _ = self.coordinator.take_view_effects();
        println!("{}", terminal::render(&self.coordinator));
    }

    fn print_bookmarks(&self) {
        if self.coordinator.bookmarks().is_empty() {
            println!("no bookmarks");
            return;
        }
        for bookmark in self.coordinator.bookmarks() {
            let preview = self
                .coordinator
                .index()
                .preview(bookmark.index)
                .unwrap_or_default();
            match &bookmark.note {
                Some(note) => println!("{:>4}  {preview}  ({note})", bookmark.index),
                None => println!("{:>4}  {preview}", bookmark.index),
            }
        }
    }

    fn shutdown(&mut self) {
        let effects = self.coordinator.switch_movie();
        self.apply(effects);
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
        info!("Session saved");
    }
}

fn spawn_stdin_reader(tx: Sender<Event>) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Event::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read input: {err}");
                        break;
                    }
                }
            }
            let _ = tx.send(Event::InputClosed);
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualsub_core::content::MemoryContentSource;
    use dualsub_core::{AlignmentUnit, LineId, PreferenceStore, SubtitleLine};

    fn source() -> MemoryContentSource {
        let mut source = MemoryContentSource::new();
        let line = |id: u64, language: u32| SubtitleLine {
            id: LineId(id),
            sequence_number: id as i64,
            content: format!("line {id}"),
            language: LanguageId(language),
        };
        source.insert_track(MovieId(1), LanguageId(1), vec![line(1, 1), line(2, 1)]);
        source.insert_track(MovieId(1), LanguageId(2), vec![line(3, 2), line(4, 2)]);
        source.insert_alignment(
            MovieId(1),
            LanguageId(1),
            LanguageId(2),
            vec![
                AlignmentUnit::new(0, vec![LineId(1)], vec![LineId(3)]),
                AlignmentUnit::new(1, vec![LineId(2)], vec![LineId(4)]),
            ],
        );
        source
    }

    fn driver() -> Driver {
        Driver::new(
            SessionCoordinator::new(PreferenceStore::in_memory()),
            Box::new(source()),
            (LanguageId(1), LanguageId(2)),
        )
    }

    #[test]
    fn fetch_effect_loads_content_and_restores() {
        let mut driver = driver();
        let effects = driver.coordinator.select_movie(MovieSelection {
            movie_id: MovieId(1),
            source_language: LanguageId(1),
            target_language: LanguageId(2),
        });
        driver.apply(effects);
        assert_eq!(driver.coordinator.navigation().total_units, 2);
    }

    #[test]
    fn cancel_effect_stops_ticker() {
        let mut driver = driver();
        driver.handle_input(Input::Open {
            movie: 1,
            languages: None,
        });
        driver.handle_input(Input::Command(SessionCommand::Play));
        assert_eq!(driver.timers.len(), 1);
        let token = driver.timers.values().next().cloned().expect("token");

        driver.handle_input(Input::Command(SessionCommand::Pause));
        assert!(driver.timers.is_empty());
        assert!(token.is_cancelled());
    }
}
