use crate::model::{LineId, Side};
use std::ops::Range;

/// What a single element in a track shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Line { line_id: LineId, text: String },
    /// The unit has no line on this side.
    Empty,
    /// The unit referenced lines on this side but none of them were loaded.
    Unresolved { missing: usize },
    /// The whole track has no alignment units.
    NoContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackElement {
    /// `None` only for the no-content placeholder.
    pub unit_index: Option<usize>,
    pub kind: ElementKind,
    pub active: bool,
    pub start_boundary: bool,
    pub end_boundary: bool,
}

impl TrackElement {
    fn new(unit_index: Option<usize>, kind: ElementKind) -> Self {
        Self {
            unit_index,
            kind,
            active: false,
            start_boundary: false,
            end_boundary: false,
        }
    }
}

/// One column of the study view. Elements of a unit are contiguous and their
/// range is recorded per unit index.
#[derive(Debug, Clone)]
pub struct Track {
    side: Side,
    elements: Vec<TrackElement>,
    blocks: Vec<Range<usize>>,
}

impl Track {
    pub(super) fn new(side: Side) -> Self {
        Self {
            side,
            elements: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub(super) fn clear(&mut self) {
        self.elements.clear();
        self.blocks.clear();
    }

    pub(super) fn push_block(&mut self, unit_index: usize, kinds: Vec<ElementKind>) {
        debug_assert_eq!(unit_index, self.blocks.len());
        let start = self.elements.len();
        self.elements.extend(
            kinds
                .into_iter()
                .map(|kind| TrackElement::new(Some(unit_index), kind)),
        );
        self.blocks.push(start..self.elements.len());
    }

    pub(super) fn push_placeholder(&mut self) {
        self.elements
            .push(TrackElement::new(None, ElementKind::NoContent));
    }

    pub(super) fn set_markers(&mut self, unit_index: usize, active: bool, start: bool, end: bool) {
        let Some(range) = self.blocks.get(unit_index).cloned() else {
            return;
        };
        for element in &mut self.elements[range] {
            element.active = active;
            element.start_boundary = start;
            element.end_boundary = end;
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn elements(&self) -> &[TrackElement] {
        &self.elements
    }

    pub fn block(&self, unit_index: usize) -> &[TrackElement] {
        self.blocks
            .get(unit_index)
            .map(|range| &self.elements[range.clone()])
            .unwrap_or(&[])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_placeholder(&self) -> bool {
        self.blocks.is_empty()
            && self
                .elements
                .iter()
                .any(|element| element.kind == ElementKind::NoContent)
    }

    /// Unit indices with at least one active element, ascending.
    pub fn active_units(&self) -> Vec<usize> {
        let mut units: Vec<usize> = self
            .elements
            .iter()
            .filter(|element| element.active)
            .filter_map(|element| element.unit_index)
            .collect();
        units.dedup();
        units
    }
}
