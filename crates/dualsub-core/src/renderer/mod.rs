//! Two parallel tracks materialized from an alignment index, plus the single
//! authoritative "current position".
//!
//! The renderer holds a view model (elements, highlight and boundary flags,
//! control states) and queues [`ViewEffect`]s for whatever adapter draws it.
//! It never draws anything itself.

mod track;

pub use track::{ElementKind, Track, TrackElement};

use crate::alignment::AlignmentIndex;
use crate::model::Side;
use crate::prefs::{ColumnLayoutTag, DisplayPreferences, FontSizeTag, PreferenceStore};
use tracing::{debug, info, warn};

/// Position within the aligned sequence.
///
/// `highest_index_reached` never decreases; progress is computed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationState {
    pub current_index: usize,
    pub total_units: usize,
    pub highest_index_reached: usize,
}

impl NavigationState {
    pub fn new(total_units: usize) -> Self {
        Self {
            current_index: 0,
            total_units,
            highest_index_reached: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_units == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.total_units
    }

    /// State after moving to `index`, or `None` when `index` is out of range.
    pub fn moved_to(self, index: usize) -> Option<Self> {
        if !self.contains(index) {
            return None;
        }
        Some(Self {
            current_index: index,
            total_units: self.total_units,
            highest_index_reached: self.highest_index_reached.max(index),
        })
    }

    /// Raise the high-water mark (clamped to the last unit).
    pub fn with_high_water(self, highest: usize) -> Self {
        let last = self.total_units.saturating_sub(1);
        Self {
            highest_index_reached: self.highest_index_reached.max(highest.min(last)),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// Bring the unit's block to the vertical center of one track.
    ScrollIntoView {
        side: Side,
        unit_index: usize,
        behavior: ScrollBehavior,
    },
    PositionChanged(NavigationState),
    Rendered {
        units: usize,
    },
    FontSizeApplied(FontSizeTag),
    ColumnLayoutApplied(ColumnLayoutTag),
}

/// Pressed state of one option in a button group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlToggle<T> {
    pub value: T,
    pub pressed: bool,
}

fn toggles<T: Copy + PartialEq>(all: &[T], selected: T) -> Vec<ControlToggle<T>> {
    all.iter()
        .map(|value| ControlToggle {
            value: *value,
            pressed: *value == selected,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DualTrackRenderer {
    source: Track,
    target: Track,
    nav: NavigationState,
    active: Option<usize>,
    display: DisplayPreferences,
    font_controls: Vec<ControlToggle<FontSizeTag>>,
    layout_controls: Vec<ControlToggle<ColumnLayoutTag>>,
    rapid_navigation: bool,
    effects: Vec<ViewEffect>,
}

impl Default for DualTrackRenderer {
    fn default() -> Self {
        Self::new(DisplayPreferences::default())
    }
}

impl DualTrackRenderer {
    pub fn new(display: DisplayPreferences) -> Self {
        Self {
            source: Track::new(Side::Source),
            target: Track::new(Side::Target),
            nav: NavigationState::default(),
            active: None,
            display,
            font_controls: toggles(&FontSizeTag::ALL, display.font_size_tag),
            layout_controls: toggles(&ColumnLayoutTag::ALL, display.column_layout_tag),
            rapid_navigation: false,
            effects: Vec::new(),
        }
    }

    pub fn navigation(&self) -> NavigationState {
        self.nav
    }

    pub fn track(&self, side: Side) -> &Track {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    fn track_mut(&mut self, side: Side) -> &mut Track {
        match side {
            Side::Source => &mut self.source,
            Side::Target => &mut self.target,
        }
    }

    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Replace both tracks with one block per unit, in index order.
    pub fn render_all(&mut self, index: &AlignmentIndex) {
        self.source.clear();
        self.target.clear();
        self.active = None;
        self.nav = NavigationState::new(index.count());

        if index.is_empty() {
            self.source.push_placeholder();
            self.target.push_placeholder();
            info!("No alignments available; showing placeholder");
        } else {
            for unit in index.units() {
                for side in Side::BOTH {
                    let ids = unit.line_ids(side);
                    let lines = index.resolve_lines(ids, side);
                    let kinds = if ids.is_empty() {
                        vec![ElementKind::Empty]
                    } else if lines.is_empty() {
                        warn!(unit = unit.index, %side, ids = ids.len(), "Alignment unit references no loaded lines");
                        vec![ElementKind::Unresolved { missing: ids.len() }]
                    } else {
                        lines
                            .into_iter()
                            .map(|line| ElementKind::Line {
                                line_id: line.id,
                                text: line.content.clone(),
                            })
                            .collect()
                    };
                    self.track_mut(side).push_block(unit.index, kinds);
                }
            }
        }
        debug!(units = index.count(), "Rendered dual tracks");
        self.effects.push(ViewEffect::Rendered {
            units: index.count(),
        });
    }

    /// Drop all content (movie switched away).
    pub fn clear(&mut self) {
        self.source.clear();
        self.target.clear();
        self.active = None;
        self.nav = NavigationState::default();
        self.effects.clear();
    }

    /// Carry a previously reached high-water mark into this render.
    pub fn restore_high_water(&mut self, highest: usize) {
        self.nav = self.nav.with_high_water(highest);
    }

    /// Forget progress past the current unit.
    pub fn reset_high_water(&mut self) {
        self.nav.highest_index_reached = self.nav.current_index;
    }

    pub fn go_to(&mut self, index: usize, smooth: bool) -> bool {
        let Some(next) = self.nav.moved_to(index) else {
            debug!(index, total = self.nav.total_units, "Ignoring out-of-range navigation");
            return false;
        };

        if let Some(previous) = self.active.take() {
            for side in Side::BOTH {
                self.track_mut(side).set_markers(previous, false, false, false);
            }
        }
        let at_start = index == 0;
        let at_end = index + 1 == next.total_units;
        for side in Side::BOTH {
            self.track_mut(side).set_markers(index, true, at_start, at_end);
        }
        self.active = Some(index);
        self.nav = next;

        let behavior = self.scroll_behavior(smooth);
        for side in Side::BOTH {
            self.effects.push(ViewEffect::ScrollIntoView {
                side,
                unit_index: index,
                behavior,
            });
        }
        self.effects.push(ViewEffect::PositionChanged(next));
        true
    }

    pub fn next(&mut self) -> bool {
        if self.nav.is_empty() {
            return false;
        }
        self.go_to(self.nav.current_index + 1, true)
    }

    pub fn previous(&mut self) -> bool {
        match self.nav.current_index.checked_sub(1) {
            Some(index) if !self.nav.is_empty() => self.go_to(index, true),
            _ => false,
        }
    }

    fn scroll_behavior(&self, smooth: bool) -> ScrollBehavior {
        if smooth && !self.rapid_navigation {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Instant
        }
    }

    pub fn is_rapid_navigation(&self) -> bool {
        self.rapid_navigation
    }

    /// Returns whether the mode changed.
    pub fn set_rapid_navigation(&mut self, enabled: bool) -> bool {
        if self.rapid_navigation == enabled {
            return false;
        }
        self.rapid_navigation = enabled;
        debug!(enabled, "Rapid navigation mode");
        true
    }

    pub fn display(&self) -> DisplayPreferences {
        self.display
    }

    pub fn font_class(&self) -> String {
        format!("font-size-{}", self.display.font_size_tag)
    }

    pub fn layout_class(&self) -> String {
        format!("layout-{}", self.display.column_layout_tag)
    }

    pub fn font_controls(&self) -> &[ControlToggle<FontSizeTag>] {
        &self.font_controls
    }

    pub fn layout_controls(&self) -> &[ControlToggle<ColumnLayoutTag>] {
        &self.layout_controls
    }

    pub fn set_font_size(&mut self, tag: &str, store: &mut PreferenceStore) -> bool {
        let Some(font_size) = FontSizeTag::parse(tag) else {
            warn!(tag, "Unknown font size; ignoring");
            return false;
        };
        self.display.font_size_tag = font_size;
        self.font_controls = toggles(&FontSizeTag::ALL, font_size);
        store.update_preferences(|prefs| prefs.display.font_size_tag = font_size);
        self.effects.push(ViewEffect::FontSizeApplied(font_size));
        info!(%font_size, "Font size changed");
        true
    }

    pub fn set_column_layout(&mut self, tag: &str, store: &mut PreferenceStore) -> bool {
        let Some(layout) = ColumnLayoutTag::parse(tag) else {
            warn!(tag, "Unknown column layout; ignoring");
            return false;
        };
        self.display.column_layout_tag = layout;
        self.layout_controls = toggles(&ColumnLayoutTag::ALL, layout);
        store.update_preferences(|prefs| prefs.display.column_layout_tag = layout);
        self.effects.push(ViewEffect::ColumnLayoutApplied(layout));
        info!(%layout, "Column layout changed");
        true
    }
}
