//! Stream lifecycle state

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// State of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Actor is running and accepting intents
    Active,
    /// Actor has exited (terminal)
    Closed,
}

/// State shared between the actor and its handles
///
/// Only the actor writes `state`. `shutdown_requested` is the
/// compare-and-set guard that makes `close()` idempotent.
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    shutdown_requested: AtomicBool,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(StreamState::Active as u8),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> StreamState {
        if self.state.load(Ordering::Acquire) == StreamState::Closed as u8 {
            StreamState::Closed
        } else {
            StreamState::Active
        }
    }

    pub(crate) fn set_closed(&self) {
        self.state.store(StreamState::Closed as u8, Ordering::Release);
    }

    /// Returns true for exactly one caller
    pub(crate) fn request_shutdown(&self) -> bool {
        self.shutdown_requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transition() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), StreamState::Active);

        shared.set_closed();
        assert_eq!(shared.state(), StreamState::Closed);
    }

    #[test]
    fn test_shutdown_requested_once() {
        let shared = SharedState::new();

        assert!(shared.request_shutdown());
        assert!(!shared.request_shutdown());
    }
}
