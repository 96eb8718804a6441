//! Event history for late-joiner replay
//!
//! The stream appends every published event to its [`EventLog`] when
//! auto-replay is enabled, and replays the full history to connections that
//! ask for it. Replay runs on the stream's processing step, so implementations
//! must push to the sink without blocking.

pub mod memory;

pub use memory::MemoryEventLog;

use crate::event::Event;
use crate::subscriber::EventSink;

/// Append-only ordered event history
pub trait EventLog: Send + 'static {
    /// Append an event, preserving publish order (no deduplication)
    ///
    /// Returns the event exactly as it was logged, so live delivery and
    /// later replay carry identical copies.
    fn add(&mut self, event: Event) -> Event;

    /// Push the full history to `sink` in append order
    ///
    /// Returns the number of events the sink accepted.
    fn replay(&self, sink: &dyn EventSink) -> usize;

    /// Number of events currently held
    fn len(&self) -> usize;

    /// Check if the log holds no events
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all history
    fn clear(&mut self);
}
