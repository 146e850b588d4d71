//! Lookup structure over one movie's two subtitle tracks and their alignment.
//!
//! Lines are indexed by id once at build time so resolving a unit never scans
//! the track. An index with zero units is a normal, renderable state meaning
//! "no content available".

use crate::model::{AlignmentUnit, LineId, Side, SubtitleLine, TrackIssue, validate_track};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// Preview text per side is cut to this many characters.
pub const PREVIEW_CHARS: usize = 100;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Default)]
pub struct AlignmentIndex {
    units: Vec<AlignmentUnit>,
    source_lines: HashMap<LineId, SubtitleLine>,
    target_lines: HashMap<LineId, SubtitleLine>,
    issues: Vec<(Side, TrackIssue)>,
}

impl AlignmentIndex {
    pub fn build(
        source_lines: Vec<SubtitleLine>,
        target_lines: Vec<SubtitleLine>,
        units: Vec<AlignmentUnit>,
    ) -> Self {
        let mut issues = Vec::new();
        for (side, lines) in [(Side::Source, &source_lines), (Side::Target, &target_lines)] {
            for issue in validate_track(lines) {
                warn!(%side, "Subtitle track issue: {issue}");
                issues.push((side, issue));
            }
        }

        let units: Vec<AlignmentUnit> = units
            .into_iter()
            .enumerate()
            .map(|(position, unit)| {
                if unit.index != position {
                    debug!(
                        declared = unit.index,
                        position, "Re-indexing alignment unit to its position"
                    );
                }
                AlignmentUnit::new(position, unit.source_line_ids, unit.target_line_ids)
            })
            .collect();

        let index = Self {
            units,
            source_lines: index_lines(source_lines),
            target_lines: index_lines(target_lines),
            issues,
        };
        debug!(
            units = index.units.len(),
            source_lines = index.source_lines.len(),
            target_lines = index.target_lines.len(),
            "Built alignment index"
        );
        index
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit_at(&self, index: usize) -> Option<&AlignmentUnit> {
        self.units.get(index)
    }

    pub fn units(&self) -> impl Iterator<Item = &AlignmentUnit> {
        self.units.iter()
    }

    /// Resolve ids on one side, in the given order. Ids with no loaded line
    /// are skipped.
    pub fn resolve_lines(&self, ids: &[LineId], side: Side) -> Vec<&SubtitleLine> {
        let lines = match side {
            Side::Source => &self.source_lines,
            Side::Target => &self.target_lines,
        };
        ids.iter().filter_map(|id| lines.get(id)).collect()
    }

    pub fn issues(&self) -> &[(Side, TrackIssue)] {
        &self.issues
    }

    /// First line of each side, truncated, as `"source | target"`.
    pub fn preview(&self, index: usize) -> Option<String> {
        let unit = self.unit_at(index)?;
        let first = |side: Side| {
            self.resolve_lines(unit.line_ids(side), side)
                .first()
                .map(|line| line.content.chars().take(PREVIEW_CHARS).collect::<String>())
                .unwrap_or_default()
        };
        Some(format!("{} | {}", first(Side::Source), first(Side::Target)))
    }
}

fn index_lines(lines: Vec<SubtitleLine>) -> HashMap<LineId, SubtitleLine> {
    let mut map = HashMap::with_capacity(lines.len());
    for mut line in lines {
        line.content = normalize_content(&line.content);
        map.insert(line.id, line);
    }
    map
}

/// NFC-normalize and collapse whitespace runs (subtitle files carry hard
/// line breaks inside a single cue).
pub fn normalize_content(content: &str) -> String {
    let composed: String = content.nfc().collect();
    WHITESPACE_RUN.replace_all(composed.trim(), " ").into_owned()
}
