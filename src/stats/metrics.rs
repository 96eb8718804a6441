//! Statistics for broadcast streams

use std::time::Duration;

use crate::stream::StreamState;

/// Snapshot of one stream, produced by its actor
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// Stream name
    pub name: String,
    /// Current state
    pub state: StreamState,
    /// Registered subscribers
    pub subscriber_count: usize,
    /// Registered subscribers with at least one open connection
    pub active_subscriber_count: usize,
    /// Events currently held in the log
    pub log_len: usize,
    /// Total events published
    pub events_published: u64,
    /// Total replays served
    pub replays_served: u64,
    /// Time since the stream started
    pub uptime: Duration,
}

impl StreamStats {
    /// Calculate publish rate in events per second
    pub fn publish_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.events_published as f64 / secs
        } else {
            0.0
        }
    }

    /// Registered subscribers with no open connection
    pub fn idle_subscriber_count(&self) -> usize {
        self.subscriber_count
            .saturating_sub(self.active_subscriber_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(events_published: u64, uptime: Duration) -> StreamStats {
        StreamStats {
            name: "test".into(),
            state: StreamState::Active,
            subscriber_count: 3,
            active_subscriber_count: 1,
            log_len: 0,
            events_published,
            replays_served: 0,
            uptime,
        }
    }

    #[test]
    fn test_publish_rate() {
        let s = stats(100, Duration::from_secs(10));
        assert!((s.publish_rate() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_publish_rate_zero_uptime() {
        let s = stats(100, Duration::ZERO);
        assert_eq!(s.publish_rate(), 0.0);
    }

    #[test]
    fn test_idle_subscriber_count() {
        assert_eq!(stats(0, Duration::ZERO).idle_subscriber_count(), 2);
    }
}
