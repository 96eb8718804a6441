//! Stream configuration

use std::time::Duration;

/// Default intake buffer size (publish commands queued before `publish` waits)
pub const DEFAULT_INTAKE_BUFFER_SIZE: usize = 1024;

/// Default idle period after which a stream with no active subscribers closes
pub const DEFAULT_MAX_INACTIVITY: Duration = Duration::from_secs(5 * 60);

/// How registration treats a subscriber ID that is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse the registration with `Error::DuplicateSubscriber`
    #[default]
    Reject,
    /// Accept it; deregister and lookup then act on the first match only
    Allow,
}

/// Stream configuration options
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Name used in log output
    pub name: String,

    /// Capacity of the intake queue
    pub intake_buffer_size: usize,

    /// Log published events and replay them to new connections
    pub auto_replay: bool,

    /// Idle period before the stream closes when nobody is connected
    pub max_inactivity: Duration,

    /// Handling of duplicate subscriber IDs
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: String::from("stream"),
            intake_buffer_size: DEFAULT_INTAKE_BUFFER_SIZE,
            auto_replay: true,
            max_inactivity: DEFAULT_MAX_INACTIVITY,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }
}

impl StreamConfig {
    /// Create a config with a custom intake buffer size
    pub fn with_buffer_size(size: usize) -> Self {
        Self::default().intake_buffer_size(size)
    }

    /// Set the stream name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the intake buffer size (at least 1)
    pub fn intake_buffer_size(mut self, size: usize) -> Self {
        self.intake_buffer_size = size.max(1);
        self
    }

    /// Enable or disable event logging and replay
    pub fn auto_replay(mut self, enabled: bool) -> Self {
        self.auto_replay = enabled;
        self
    }

    /// Set the idle period
    pub fn max_inactivity(mut self, timeout: Duration) -> Self {
        self.max_inactivity = timeout;
        self
    }

    /// Set the duplicate subscriber policy
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();

        assert_eq!(config.intake_buffer_size, DEFAULT_INTAKE_BUFFER_SIZE);
        assert!(config.auto_replay);
        assert_eq!(config.max_inactivity, DEFAULT_MAX_INACTIVITY);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_buffer_size_floor() {
        let config = StreamConfig::with_buffer_size(0);

        assert_eq!(config.intake_buffer_size, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = StreamConfig::default()
            .name("news")
            .intake_buffer_size(16)
            .auto_replay(false)
            .max_inactivity(Duration::from_millis(50))
            .duplicate_policy(DuplicatePolicy::Allow);

        assert_eq!(config.name, "news");
        assert_eq!(config.intake_buffer_size, 16);
        assert!(!config.auto_replay);
        assert_eq!(config.max_inactivity, Duration::from_millis(50));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Allow);
    }
}
