//! Entry point for the dual-track subtitle reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Open the preference store and content source.
//! - Hand the session coordinator to the terminal event loop.

mod cancellation;
mod config;
mod content;
mod driver;
mod terminal;

use crate::config::{AppConfig, load_config};
use crate::driver::{Driver, Event};
use anyhow::{Context, Result, anyhow};
use dualsub_core::prefs::FileStorage;
use dualsub_core::{
    LanguageId, MovieId, MovieSelection, PreferenceStore, SessionCoordinator, StudyEvent,
};
use std::env;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    let selection = parse_args(&config)?;
    info!(
        movie = %selection.movie_id,
        source = %selection.source_language,
        target = %selection.target_language,
        content = %config.content_source,
        level = %config.log_level,
        "Starting dual-track reader"
    );

    let store = PreferenceStore::open(
        Box::new(FileStorage::new(&config.cache_dir)),
        config.namespace_prefix.clone(),
    );
    let mut coordinator =
        SessionCoordinator::new(store).with_autoplay_on_open(config.autoplay_on_open);
    coordinator.subscribe(report_progress);

    let source = content::build_source(&config)?;
    let driver = Driver::new(
        coordinator,
        source,
        (
            LanguageId(config.source_language),
            LanguageId(config.target_language),
        ),
    );
    let interrupt = driver.sender();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Event::Interrupt);
    })
    .context("Failed to install Ctrl-C handler")?;

    driver.run(selection)
}

fn report_progress(event: &StudyEvent) {
    match event {
        StudyEvent::PositionChanged(position) => debug!(
            movie = %position.movie_id,
            index = position.current_index,
            highest = position.highest_index_reached,
            percentage = position.percentage,
            study_time_ms = position.study_time_ms,
            "Position changed"
        ),
        StudyEvent::Milestone(reached) => {
            println!("** {} of movie {} reached **", reached.milestone, reached.movie_id)
        }
        StudyEvent::Completed { movie_id } => println!("** movie {movie_id} completed **"),
        StudyEvent::StateChanged { .. } => {}
    }
}

fn parse_args(config: &AppConfig) -> Result<MovieSelection> {
    let usage = || anyhow!("Usage: dualsub-reader <movie-id> [source-lang target-lang]");
    let args: Vec<String> = env::args().skip(1).collect();
    let number = |text: &str| -> Result<u64> {
        text.parse()
            .with_context(|| format!("`{text}` is not a valid id"))
    };
    let language = |text: &str| -> Result<LanguageId> {
        let id = number(text)?;
        Ok(LanguageId(u32::try_from(id).context("language id out of range")?))
    };
    match args.as_slice() {
        [movie] => Ok(MovieSelection {
            movie_id: MovieId(number(movie.as_str())?),
            source_language: LanguageId(config.source_language),
            target_language: LanguageId(config.target_language),
        }),
        [movie, source, target] => Ok(MovieSelection {
            movie_id: MovieId(number(movie.as_str())?),
            source_language: language(source.as_str())?,
            target_language: language(target.as_str())?,
        }),
        _ => Err(usage()),
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    debug!("Logging initialized; override level with logging.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        debug!("RUST_LOG set; keeping bootstrap filter");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
