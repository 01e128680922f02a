//! In-process realtime event bus.
//!
//! Handlers publish a [`RealtimeEvent`] after each user-visible mutation; the
//! SSE endpoint subscribes and forwards the events addressed to the caller.
//! Slow subscribers lose the oldest events rather than blocking publishers.

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{RealtimeEvent, RealtimeEventKind};
