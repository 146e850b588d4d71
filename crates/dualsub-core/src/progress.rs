//! Completion percentage and milestone crossings.
//!
//! Progress is derived from the high-water mark, not the current position, so
//! stepping back to review never lowers it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Completion threshold; serialized as its whole percent (25, 50, 75, 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
    Complete,
}

/// Ascending threshold list.
pub const MILESTONES: [Milestone; 4] = [
    Milestone::Quarter,
    Milestone::Half,
    Milestone::ThreeQuarters,
    Milestone::Complete,
];

impl Milestone {
    pub fn threshold(self) -> f64 {
        match self {
            Milestone::Quarter => 25.0,
            Milestone::Half => 50.0,
            Milestone::ThreeQuarters => 75.0,
            Milestone::Complete => 100.0,
        }
    }

    pub fn percent(self) -> u8 {
        self.threshold() as u8
    }
}

impl From<Milestone> for u8 {
    fn from(milestone: Milestone) -> Self {
        milestone.percent()
    }
}

impl TryFrom<u8> for Milestone {
    type Error = String;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        MILESTONES
            .into_iter()
            .find(|milestone| milestone.percent() == percent)
            .ok_or_else(|| format!("{percent} is not a milestone percentage"))
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

pub fn completion_percentage(highest_index_reached: usize, total_units: usize) -> f64 {
    if total_units == 0 {
        return 0.0;
    }
    let reached = highest_index_reached.saturating_add(1) as f64;
    (reached * 100.0 / total_units as f64).clamp(0.0, 100.0)
}

/// Thresholds `t` with `previous < t <= current`.
pub fn milestones_between(previous: f64, current: f64) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .copied()
        .filter(|milestone| previous < milestone.threshold() && milestone.threshold() <= current)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub current_index: usize,
    pub highest_index_reached: usize,
    pub percentage: f64,
    pub milestones_crossed: Vec<Milestone>,
    /// Set exactly once, on the update that first reaches 100%.
    pub completed: bool,
}

/// Per-session progress state: last reported percentage and the milestones
/// already announced.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last_percentage: f64,
    fired: BTreeSet<Milestone>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously reached percentage without announcing the
    /// milestones below it.
    pub fn seeded(percentage: f64) -> Self {
        let percentage = percentage.clamp(0.0, 100.0);
        Self {
            last_percentage: percentage,
            fired: milestones_between(-1.0, percentage).into_iter().collect(),
        }
    }

    pub fn last_percentage(&self) -> f64 {
        self.last_percentage
    }

    pub fn compute(
        &mut self,
        current_index: usize,
        total_units: usize,
        highest_index_reached: usize,
    ) -> ProgressReport {
        let percentage = completion_percentage(highest_index_reached, total_units)
            .max(self.last_percentage);
        let milestones_crossed: Vec<Milestone> =
            milestones_between(self.last_percentage, percentage)
                .into_iter()
                .filter(|milestone| self.fired.insert(*milestone))
                .collect();
        let completed = milestones_crossed.contains(&Milestone::Complete);
        self.last_percentage = percentage;
        ProgressReport {
            current_index,
            highest_index_reached,
            percentage,
            milestones_crossed,
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_uses_high_water_mark_plus_one() {
        assert_eq!(completion_percentage(0, 0), 0.0);
        assert_eq!(completion_percentage(4, 10), 50.0);
        assert_eq!(completion_percentage(9, 10), 100.0);
        assert_eq!(completion_percentage(25, 10), 100.0);
    }

    #[test]
    fn half_milestone_fires_once_on_entering_fifth_of_ten_units() {
        let mut tracker = ProgressTracker::new();
        for idx in 0..4 {
            let report = tracker.compute(idx, 10, idx);
            assert!(!report.milestones_crossed.contains(&Milestone::Half));
        }
        let report = tracker.compute(4, 10, 4);
        assert_eq!(report.milestones_crossed, vec![Milestone::Half]);

        // Back and forth across the same boundary stays quiet.
        assert!(tracker.compute(3, 10, 4).milestones_crossed.is_empty());
        assert!(tracker.compute(4, 10, 4).milestones_crossed.is_empty());
        assert!(tracker.compute(5, 10, 5).milestones_crossed.is_empty());
    }

    #[test]
    fn jump_crosses_several_thresholds_at_once() {
        let mut tracker = ProgressTracker::new();
        let report = tracker.compute(9, 10, 9);
        assert_eq!(report.milestones_crossed, MILESTONES.to_vec());
        assert!(report.completed);
        assert_eq!(report.percentage, 100.0);

        let again = tracker.compute(0, 10, 9);
        assert!(again.milestones_crossed.is_empty());
        assert!(!again.completed);
        assert_eq!(again.percentage, 100.0);
    }

    #[test]
    fn percentage_never_decreases_within_tracker() {
        let mut tracker = ProgressTracker::new();
        tracker.compute(7, 10, 7);
        let report = tracker.compute(1, 10, 1);
        assert_eq!(report.percentage, 80.0);
    }

    #[test]
    fn seeded_tracker_does_not_refire_passed_milestones() {
        let mut tracker = ProgressTracker::seeded(completion_percentage(5, 10));
        let report = tracker.compute(7, 10, 7);
        assert_eq!(report.milestones_crossed, vec![Milestone::ThreeQuarters]);
    }

    #[test]
    fn milestones_serialize_as_whole_percentages() {
        let text = serde_json::to_string(&MILESTONES).expect("serialize");
        assert_eq!(text, "[25,50,75,100]");
        let half: Milestone = serde_json::from_str("50").expect("deserialize");
        assert_eq!(half, Milestone::Half);
        assert!(serde_json::from_str::<Milestone>("60").is_err());
    }

    #[test]
    fn single_unit_track_completes_immediately() {
        let mut tracker = ProgressTracker::new();
        let report = tracker.compute(0, 1, 0);
        assert!(report.completed);
        assert_eq!(report.milestones_crossed.len(), 4);
    }
}
