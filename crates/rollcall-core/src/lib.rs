//! rollcall-core — Identity matching and attendance state transitions.
//!
//! Pure decision logic: cosine-similarity matching of face embeddings
//! against the registered gallery, and the per-day IN/OUT state machine.
//! Capture and model inference live behind the traits in [`provider`].

pub mod ledger;
pub mod provider;
pub mod types;

pub use ledger::{AttendanceState, MarkOutcome};
pub use provider::{EmbeddingProvider, FaceLocator, FaceRegion, ProviderError};
pub use types::{AttendanceRecord, DayTimes, Embedding, FirstMatchMatcher, Identity, MatchResult, Matcher};
