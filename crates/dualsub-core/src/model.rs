//! Subtitle lines, alignment units and the identifiers that tie them together.
//!
//! Lines arrive from the catalog in the shape it stores them
//! (`id`, `sequence`, `content`, `language_id`); alignment arrives either as
//! ready-made units or as the catalog's raw `[[source ids], [target ids]]`
//! pair list.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct MovieId(pub u64);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(pub u32);

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which column of the study view a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Source, Side::Target];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Side::Source => "source",
            Side::Target => "target",
        };
        write!(f, "{}", label)
    }
}

/// One subtitle line as stored by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleLine {
    pub id: LineId,
    #[serde(alias = "sequence")]
    pub sequence_number: i64,
    pub content: String,
    #[serde(alias = "language_id")]
    pub language: LanguageId,
}

/// The movie and language pair a study session is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovieSelection {
    pub movie_id: MovieId,
    pub source_language: LanguageId,
    pub target_language: LanguageId,
}

impl MovieSelection {
    /// Key used for per-movie persisted state.
    pub fn storage_key(&self) -> String {
        self.movie_id.to_string()
    }
}

/// One synchronized pairing of source and target lines.
///
/// Either side may be empty; an empty side still renders as a marker so the
/// two columns stay paired.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignmentUnit {
    pub index: usize,
    #[serde(default)]
    pub source_line_ids: Vec<LineId>,
    #[serde(default)]
    pub target_line_ids: Vec<LineId>,
}

/// Raw alignment entry as the catalog stores it: `[source ids, target ids]`,
/// where either side may be `null` or missing entirely.
pub type LinkPair = Vec<Option<Vec<LineId>>>;

impl AlignmentUnit {
    pub fn new(index: usize, source_line_ids: Vec<LineId>, target_line_ids: Vec<LineId>) -> Self {
        Self {
            index,
            source_line_ids: dedup_ordered(source_line_ids),
            target_line_ids: dedup_ordered(target_line_ids),
        }
    }

    pub fn line_ids(&self, side: Side) -> &[LineId] {
        match side {
            Side::Source => &self.source_line_ids,
            Side::Target => &self.target_line_ids,
        }
    }

    /// Convert the catalog's pair list into contiguous units.
    pub fn from_link_pairs(pairs: Vec<LinkPair>) -> Vec<AlignmentUnit> {
        pairs
            .into_iter()
            .enumerate()
            .map(|(index, pair)| {
                let mut sides = pair.into_iter();
                let source = sides.next().flatten().unwrap_or_default();
                let target = sides.next().flatten().unwrap_or_default();
                AlignmentUnit::new(index, source, target)
            })
            .collect()
    }
}

fn dedup_ordered(ids: Vec<LineId>) -> Vec<LineId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Integrity problems found in a subtitle track. None of them reject the track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackIssue {
    NonPositiveId { position: usize },
    NegativeSequence { position: usize, sequence: i64 },
    BlankContent { position: usize, id: LineId },
    OutOfOrder { position: usize, previous: i64, sequence: i64 },
}

impl fmt::Display for TrackIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackIssue::NonPositiveId { position } => {
                write!(f, "line at position {position} has a non-positive id")
            }
            TrackIssue::NegativeSequence { position, sequence } => {
                write!(f, "line at position {position} has negative sequence {sequence}")
            }
            TrackIssue::BlankContent { position, id } => {
                write!(f, "line {id} at position {position} has blank content")
            }
            TrackIssue::OutOfOrder {
                position,
                previous,
                sequence,
            } => write!(
                f,
                "line at position {position} has sequence {sequence} after {previous}"
            ),
        }
    }
}

/// Check a track the way the catalog checks its own data.
pub fn validate_track(lines: &[SubtitleLine]) -> Vec<TrackIssue> {
    let mut issues = Vec::new();
    let mut previous: Option<i64> = None;
    for (position, line) in lines.iter().enumerate() {
        if line.id.0 == 0 {
            issues.push(TrackIssue::NonPositiveId { position });
        }
        if line.sequence_number < 0 {
            issues.push(TrackIssue::NegativeSequence {
                position,
                sequence: line.sequence_number,
            });
        }
        if line.content.trim().is_empty() {
            issues.push(TrackIssue::BlankContent {
                position,
                id: line.id,
            });
        }
        if let Some(prev) = previous {
            if line.sequence_number < prev {
                issues.push(TrackIssue::OutOfOrder {
                    position,
                    previous: prev,
                    sequence: line.sequence_number,
                });
            }
        }
        previous = Some(line.sequence_number);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: u64, sequence: i64, content: &str) -> SubtitleLine {
        SubtitleLine {
            id: LineId(id),
            sequence_number: sequence,
            content: content.to_string(),
            language: LanguageId(1),
        }
    }

    #[test]
    fn link_pairs_become_contiguous_units_with_empty_sides() {
        let pairs: Vec<LinkPair> =
            serde_json::from_str("[[[1,2],[10]], [null,[11]], [[3]], []]").expect("pairs");
        let units = AlignmentUnit::from_link_pairs(pairs);

        assert_eq!(units.len(), 4);
        assert_eq!(units[0].source_line_ids, vec![LineId(1), LineId(2)]);
        assert!(units[1].source_line_ids.is_empty());
        assert!(units[2].target_line_ids.is_empty());
        assert!(units[3].source_line_ids.is_empty() && units[3].target_line_ids.is_empty());
        assert!(units.iter().enumerate().all(|(i, unit)| unit.index == i));
    }

    #[test]
    fn unit_ids_keep_first_occurrence_order() {
        let unit = AlignmentUnit::new(0, vec![LineId(3), LineId(1), LineId(3)], Vec::new());
        assert_eq!(unit.source_line_ids, vec![LineId(3), LineId(1)]);
    }

    #[test]
    fn catalog_field_names_deserialize() {
        let parsed: SubtitleLine = serde_json::from_str(
            r#"{"id": 7, "sequence": 2, "content": "Hola", "language_id": 3}"#,
        )
        .expect("line");
        assert_eq!(parsed.id, LineId(7));
        assert_eq!(parsed.sequence_number, 2);
        assert_eq!(parsed.content, "Hola");
        assert_eq!(parsed.language, LanguageId(3));
    }

    #[test]
    fn validation_reports_every_issue_without_rejecting() {
        let lines = vec![line(1, 0, "a"), line(0, 2, "  "), line(3, 1, "c")];
        let issues = validate_track(&lines);

        assert!(issues.contains(&TrackIssue::NonPositiveId { position: 1 }));
        assert!(issues.contains(&TrackIssue::BlankContent {
            position: 1,
            id: LineId(0)
        }));
        assert!(issues.contains(&TrackIssue::OutOfOrder {
            position: 2,
            previous: 2,
            sequence: 1
        }));
        assert!(validate_track(&lines[..1]).is_empty());
    }
}
