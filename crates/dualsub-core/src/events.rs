//! Explicit publish/subscribe channel between the coordinator and whatever
//! listens for study progress (terminal view, dashboard uploader).

use crate::model::MovieId;
use crate::progress::Milestone;
use serde::Serialize;
use std::fmt;
use tracing::trace;
use ts_rs::TS;

/// Emitted on every accepted navigation.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PositionChanged {
    pub movie_id: MovieId,
    pub current_index: usize,
    pub highest_index_reached: usize,
    pub percentage: f64,
    /// Active study time accumulated for the movie so far.
    #[ts(type = "number")]
    pub study_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MilestoneReached {
    pub movie_id: MovieId,
    #[ts(as = "u8")]
    pub milestone: Milestone,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StudyEvent {
    PositionChanged(PositionChanged),
    Milestone(MilestoneReached),
    /// The high-water mark reached the last unit.
    Completed { movie_id: MovieId },
    StateChanged { from: &'static str, to: &'static str },
}

impl StudyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PositionChanged(_) => "position_changed",
            Self::Milestone(_) => "milestone",
            Self::Completed { .. } => "completed",
            Self::StateChanged { .. } => "state_changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StudyEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StudyEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to every listener in subscription order.
    pub fn publish(&mut self, event: &StudyEvent) {
        trace!(event = event.name(), listeners = self.listeners.len(), "Publishing");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn position(index: usize) -> StudyEvent {
        StudyEvent::PositionChanged(PositionChanged {
            movie_id: MovieId(1),
            current_index: index,
            highest_index_reached: index,
            percentage: 0.0,
            study_time_ms: 0,
        })
    }

    #[test]
    fn listeners_receive_events_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |event| sink.borrow_mut().push(event.name()));

        bus.publish(&position(0));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&position(1));

        assert_eq!(*seen.borrow(), vec!["position_changed"]);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn payloads_serialize_in_camel_case() {
        let payload = MilestoneReached {
            movie_id: MovieId(9),
            milestone: Milestone::Half,
        };
        let value = serde_json::to_value(payload).expect("serialize");
        assert_eq!(value["movieId"], 9);
        assert_eq!(value["milestone"], 50);
    }
}
