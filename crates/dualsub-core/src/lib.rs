//! Alignment navigation and session state for studying a movie through two
//! synchronized subtitle tracks.

pub mod alignment;
pub mod content;
pub mod coordinator;
pub mod events;
pub mod model;
pub mod prefs;
pub mod progress;
pub mod renderer;

pub use alignment::AlignmentIndex;
pub use content::{CachedContentSource, ContentError, ContentSource, MemoryContentSource};
pub use coordinator::{Effect, SessionCommand, SessionCoordinator, SessionState};
pub use events::{EventBus, StudyEvent};
pub use model::{AlignmentUnit, LanguageId, LineId, MovieId, MovieSelection, Side, SubtitleLine};
pub use prefs::PreferenceStore;
