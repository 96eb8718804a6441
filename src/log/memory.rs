//! In-memory event log
//!
//! Keeps history in a `VecDeque` in publish order. Unbounded by default;
//! callers that publish indefinitely should cap it by event count or bytes,
//! in which case the oldest events are dropped first.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::event::Event;
use crate::subscriber::EventSink;

use super::EventLog;

/// A logged event
#[derive(Debug, Clone)]
struct LoggedEvent {
    /// The event as it will be replayed
    event: Event,
    /// Size in bytes
    size: usize,
}

/// In-memory append-only event log
#[derive(Debug)]
pub struct MemoryEventLog {
    /// Logged events, oldest first
    entries: VecDeque<LoggedEvent>,
    /// Sequence number for the next appended event
    next_seq: u64,
    /// Maximum number of events kept (None = unbounded)
    max_events: Option<usize>,
    /// Maximum total size in bytes (None = unbounded)
    max_bytes: Option<usize>,
    /// Current total size in bytes
    current_size: usize,
}

impl MemoryEventLog {
    /// Create an unbounded log
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 0,
            max_events: None,
            max_bytes: None,
            current_size: 0,
        }
    }

    /// Cap the number of events kept
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = Some(max);
        self
    }

    /// Cap the total size of kept events in bytes
    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = Some(max);
        self
    }

    /// Sequence number the next appended event will get
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Current total size in bytes
    pub fn size(&self) -> usize {
        self.current_size
    }

    fn over_limit(&self, incoming: usize) -> bool {
        let count_exceeded = self
            .max_events
            .is_some_and(|max| self.entries.len() + 1 > max);
        let bytes_exceeded = self
            .max_bytes
            .is_some_and(|max| self.current_size + incoming > max);
        count_exceeded || bytes_exceeded
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for MemoryEventLog {
    fn add(&mut self, mut event: Event) -> Event {
        let seq = self.next_seq;
        self.next_seq += 1;

        if event.id.is_none() {
            event.id = Some(Bytes::from(seq.to_string()));
        }

        let size = event.size();

        // Make room by dropping oldest events
        while self.over_limit(size) && !self.entries.is_empty() {
            if let Some(old) = self.entries.pop_front() {
                self.current_size -= old.size;
            }
        }

        // A single event larger than the byte cap is still kept on its own
        // so that the most recent event is always replayable.
        self.entries.push_back(LoggedEvent {
            event: event.clone(),
            size,
        });
        self.current_size += size;
        event
    }

    fn replay(&self, sink: &dyn EventSink) -> usize {
        self.entries
            .iter()
            .filter(|entry| sink.send_event(&entry.event))
            .count()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct CollectSink {
        events: Mutex<Vec<Event>>,
    }

    impl EventSink for CollectSink {
        fn send_event(&self, event: &Event) -> bool {
            self.events.lock().unwrap().push(event.clone());
            true
        }
    }

    impl CollectSink {
        fn data(&self) -> Vec<Bytes> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.data.clone())
                .collect()
        }
    }

    #[test]
    fn test_replay_in_append_order() {
        let mut log = MemoryEventLog::new();
        log.add(Event::new("a"));
        log.add(Event::new("b"));
        log.add(Event::new("c"));

        let sink = CollectSink::default();
        assert_eq!(log.replay(&sink), 3);
        assert_eq!(sink.data(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_assigns_missing_ids() {
        let mut log = MemoryEventLog::new();
        log.add(Event::new("a"));
        log.add(Event::new("b").id("custom"));
        log.add(Event::new("c"));

        let sink = CollectSink::default();
        log.replay(&sink);
        let ids: Vec<_> = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["0", "custom", "2"]);
        assert_eq!(log.next_seq(), 3);
    }

    #[test]
    fn test_add_returns_logged_event() {
        let mut log = MemoryEventLog::new();
        let logged = log.add(Event::new("a"));
        assert_eq!(logged.id.as_deref(), Some(&b"0"[..]));
    }

    #[test]
    fn test_no_deduplication() {
        let mut log = MemoryEventLog::new();
        log.add(Event::new("same").id("1"));
        log.add(Event::new("same").id("1"));

        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_max_events_drops_oldest() {
        let mut log = MemoryEventLog::new().with_max_events(2);
        log.add(Event::new("a"));
        log.add(Event::new("b"));
        log.add(Event::new("c"));

        let sink = CollectSink::default();
        log.replay(&sink);
        assert_eq!(sink.data(), vec!["b", "c"]);
    }

    #[test]
    fn test_max_bytes_drops_oldest() {
        // Each event: 4 bytes data + 1 byte id
        let mut log = MemoryEventLog::new().with_max_bytes(10);
        log.add(Event::new("aaaa"));
        log.add(Event::new("bbbb"));
        assert_eq!(log.size(), 10);

        log.add(Event::new("cccc"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.size(), 10);

        // Oversized event evicts everything else but is kept
        log.add(Event::new(vec![0u8; 64]));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut log = MemoryEventLog::new();
        log.add(Event::new("a"));
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.size(), 0);
        // Sequence keeps counting after clear
        assert_eq!(log.next_seq(), 1);
    }
}
