//! Plain-text adapter: parses typed commands and draws both tracks side by
//! side around the current unit.

use anyhow::{Result, anyhow, bail};
use dualsub_core::prefs::{ColumnLayoutTag, FontSizeTag};
use dualsub_core::renderer::{ElementKind, TrackElement};
use dualsub_core::{SessionCommand, SessionCoordinator, Side};

/// Units shown on each side of the current one.
const WINDOW_RADIUS: usize = 3;
const NO_CONTENT: &str = "No alignments available for this movie.";

pub const HELP: &str = "\
commands:
  n | next             next unit            p | prev        previous unit
  g <i> | goto <i>     jump to unit i       t | toggle      play / pause
  play | pause         autoplay             speed <ms|slow|normal|fast>
  font <small|medium|large|xlarge>          layout <left|right|equal>
  rapid <on|off>       instant scrolling    bm [note]       bookmark current unit
  unbm <i>             remove bookmark      jump <i>        go to bookmarked unit
  marks                list bookmarks       clear           forget saved position
  open <movie> [src tgt]                    switch movie
  show | help | q";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(SessionCommand),
    Open {
        movie: u64,
        languages: Option<(u32, u32)>,
    },
    Show,
    Marks,
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> Result<Input> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "" | "n" | "next" => SessionCommand::Next,
        "p" | "prev" | "previous" => SessionCommand::Previous,
        "g" | "goto" => SessionCommand::GoTo {
            index: rest
                .parse()
                .map_err(|_| anyhow!("goto needs a unit number"))?,
        },
        "t" | "toggle" => SessionCommand::TogglePlayPause,
        "play" => SessionCommand::Play,
        "pause" => SessionCommand::Pause,
        "speed" => match rest.parse::<u32>() {
            Ok(speed_ms) => SessionCommand::SetSpeed { speed_ms },
            Err(_) if !rest.is_empty() => SessionCommand::SetSpeedTag {
                tag: rest.to_string(),
            },
            Err(_) => bail!("speed needs milliseconds or a preset"),
        },
        "font" => SessionCommand::SetFontSize {
            tag: rest.to_string(),
        },
        "layout" => SessionCommand::SetColumnLayout {
            tag: rest.to_string(),
        },
        "rapid" => SessionCommand::SetRapidNavigation {
            enabled: match rest {
                "on" => true,
                "off" => false,
                _ => bail!("rapid takes on or off"),
            },
        },
        "bm" | "bookmark" => SessionCommand::AddBookmark {
            note: (!rest.is_empty()).then(|| rest.to_string()),
        },
        "unbm" => SessionCommand::RemoveBookmark {
            index: rest
                .parse()
                .map_err(|_| anyhow!("unbm needs a unit number"))?,
        },
        "jump" => SessionCommand::JumpToBookmark {
            index: rest
                .parse()
                .map_err(|_| anyhow!("jump needs a unit number"))?,
        },
        "clear" => SessionCommand::ClearSession,
        "open" => return parse_open(rest),
        "show" => return Ok(Input::Show),
        "marks" => return Ok(Input::Marks),
        "h" | "help" | "?" => return Ok(Input::Help),
        "q" | "quit" | "exit" => return Ok(Input::Quit),
        other => bail!("unknown command `{other}`; type help"),
    };
    Ok(Input::Command(command))
}

fn parse_open(rest: &str) -> Result<Input> {
    let numbers: Vec<&str> = rest.split_whitespace().collect();
    let parse = |text: &str| {
        text.parse::<u64>()
            .map_err(|_| anyhow!("`{text}` is not a number"))
    };
    match numbers.as_slice() {
        [movie] => Ok(Input::Open {
            movie: parse(*movie)?,
            languages: None,
        }),
        [movie, source, target] => Ok(Input::Open {
            movie: parse(*movie)?,
            languages: Some((
                u32::try_from(parse(*source)?)?,
                u32::try_from(parse(*target)?)?,
            )),
        }),
        _ => bail!("usage: open <movie> [source-lang target-lang]"),
    }
}

/// Total characters per row; larger type means fewer characters.
fn row_width(font_size: FontSizeTag) -> usize {
    match font_size {
        FontSizeTag::Small => 120,
        FontSizeTag::Medium => 100,
        FontSizeTag::Large => 80,
        FontSizeTag::Xlarge => 64,
    }
}

fn column_widths(font_size: FontSizeTag, layout: ColumnLayoutTag) -> (usize, usize) {
    let usable = row_width(font_size) - 5;
    let (source, target) = layout.column_weights();
    let left = usable * usize::from(source) / usize::from(source + target);
    (left, usable - left)
}

pub fn render(coordinator: &SessionCoordinator) -> String {
    let renderer = coordinator.renderer();
    let display = renderer.display();
    let (left, right) = column_widths(display.font_size_tag, display.column_layout_tag);
    let source = renderer.track(Side::Source);
    let target = renderer.track(Side::Target);
    let nav = renderer.navigation();
    let mut rows = Vec::new();

    if source.is_placeholder() || nav.is_empty() {
        rows.push(format!("  {NO_CONTENT}"));
    } else {
        let first = nav.current_index.saturating_sub(WINDOW_RADIUS);
        let last = (nav.current_index + WINDOW_RADIUS).min(nav.total_units - 1);
        for unit in first..=last {
            let source_block = source.block(unit);
            let target_block = target.block(unit);
            let active = source_block.iter().any(|element| element.active);
            if active && source_block.iter().any(|element| element.start_boundary) {
                rows.push("  [start]".to_string());
            }
            let source_rows = block_rows(source_block, left);
            let target_rows = block_rows(target_block, right);
            for row in 0..source_rows.len().max(target_rows.len()) {
                let marker = if active && row == 0 { '>' } else { ' ' };
                let number = if row == 0 {
                    unit.to_string()
                } else {
                    String::new()
                };
                rows.push(format!(
                    "{marker}{number:>4} {:<left$} | {}",
                    source_rows.get(row).map(String::as_str).unwrap_or(""),
                    target_rows.get(row).map(String::as_str).unwrap_or(""),
                ));
            }
            if active && source_block.iter().any(|element| element.end_boundary) {
                rows.push("  [end]".to_string());
            }
        }
    }
    rows.push(status_line(coordinator));
    rows.join("\n")
}

fn status_line(coordinator: &SessionCoordinator) -> String {
    let nav = coordinator.navigation();
    let movie = coordinator
        .selection()
        .map(|selection| selection.movie_id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let bookmarked = coordinator
        .bookmarks()
        .iter()
        .any(|bookmark| bookmark.index == nav.current_index);
    let position = if nav.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", nav.current_index + 1, nav.total_units)
    };
    format!(
        "-- movie {movie} | unit {position}{} | {:.0}% reached | {} min studied | {} | {} ms{}",
        if bookmarked { " *" } else { "" },
        coordinator.percentage(),
        coordinator.study_time().as_secs() / 60,
        coordinator.state().name(),
        coordinator.playback_speed_ms(),
        if coordinator.renderer().is_rapid_navigation() {
            " | rapid"
        } else {
            ""
        },
    )
}

fn block_rows(block: &[TrackElement], width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for element in block {
        match &element.kind {
            ElementKind::Line { text, .. } => rows.extend(wrap(text, width)),
            ElementKind::Empty => rows.push("~".to_string()),
            ElementKind::Unresolved { missing } => {
                rows.push(format!("(missing {missing} line(s))"));
            }
            ElementKind::NoContent => rows.push(NO_CONTENT.to_string()),
        }
    }
    rows
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
            rows.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > width && !current.is_empty() {
            rows.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }
    rows
}
