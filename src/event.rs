//! Event payloads
//!
//! An [`Event`] is the unit published to a stream and fanned out to every
//! subscriber. All byte fields are `bytes::Bytes`, so cloning an event for
//! each connection only bumps reference counts.

use std::time::Duration;

use bytes::Bytes;

/// A published event
///
/// Cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Event ID (assigned by the log when absent and replay is enabled)
    pub id: Option<Bytes>,
    /// Event name
    pub event: Option<Bytes>,
    /// Event payload
    pub data: Bytes,
    /// Reconnection delay hint for clients
    pub retry: Option<Duration>,
    /// Comment line, carried through untouched
    pub comment: Option<Bytes>,
}

impl Event {
    /// Create an event carrying only data
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// Set the event ID
    pub fn id(mut self, id: impl Into<Bytes>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the event name
    pub fn event(mut self, name: impl Into<Bytes>) -> Self {
        self.event = Some(name.into());
        self
    }

    /// Set the retry hint
    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the comment
    pub fn comment(mut self, comment: impl Into<Bytes>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether the event carries anything at all
    pub fn has_content(&self) -> bool {
        !self.data.is_empty()
            || self.id.is_some()
            || self.event.is_some()
            || self.retry.is_some()
            || self.comment.is_some()
    }

    /// Approximate payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
            + self.id.as_ref().map_or(0, Bytes::len)
            + self.event.as_ref().map_or(0, Bytes::len)
            + self.comment.as_ref().map_or(0, Bytes::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let event = Event::new("hello")
            .id("1")
            .event("greeting")
            .retry(Duration::from_secs(3));

        assert_eq!(event.data, Bytes::from_static(b"hello"));
        assert_eq!(event.id.as_deref(), Some(&b"1"[..]));
        assert_eq!(event.event.as_deref(), Some(&b"greeting"[..]));
        assert_eq!(event.retry, Some(Duration::from_secs(3)));
        assert_eq!(event.size(), 5 + 1 + 8);
    }

    #[test]
    fn test_has_content() {
        assert!(!Event::default().has_content());
        assert!(Event::new("x").has_content());
        assert!(Event::default().comment("keepalive").has_content());
    }
}
