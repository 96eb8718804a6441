//! Channel-backed subscriber
//!
//! A [`ChannelSubscriber`] owns any number of [`Connection`]s for one logical
//! client. Each call to [`ChannelSubscriber::connect`] opens a new connection
//! and returns its receiver. When the stream replays history, the new
//! connection stays pending until the replay has been pushed, so it sees the
//! full history followed by live events with no gap and no duplicate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::event::Event;
use crate::stream::StreamLink;

use super::connection::{Connection, EventReceiver};
use super::Subscriber;

/// Subscriber configuration options
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Per-connection buffer capacity (events)
    pub connection_buffer: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            connection_buffer: 256,
        }
    }
}

impl SubscriberConfig {
    /// Set the per-connection buffer capacity
    pub fn connection_buffer(mut self, capacity: usize) -> Self {
        self.connection_buffer = capacity.max(1);
        self
    }
}

/// Subscriber delivering to in-process `mpsc` receivers
pub struct ChannelSubscriber {
    id: String,
    config: SubscriberConfig,
    connections: Mutex<Vec<Connection>>,
    link: Mutex<Option<StreamLink>>,
    next_connection_id: AtomicU64,
}

impl ChannelSubscriber {
    /// Create a subscriber with default configuration
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, SubscriberConfig::default())
    }

    /// Create a subscriber with custom configuration
    pub fn with_config(id: impl Into<String>, config: SubscriberConfig) -> Self {
        Self {
            id: id.into(),
            config,
            connections: Mutex::new(Vec::new()),
            link: Mutex::new(None),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Open a new connection
    ///
    /// If the subscriber is registered on a stream with replay enabled, the
    /// stream's history is pushed into the connection before any live event.
    pub async fn connect(&self) -> Result<EventReceiver> {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let replay_link = self.link().filter(StreamLink::replay_enabled);

        let (conn, rx) = if replay_link.is_some() {
            Connection::pending(id, self.config.connection_buffer)
        } else {
            Connection::new(id, self.config.connection_buffer)
        };
        self.connections().push(conn.clone());

        if let Some(link) = replay_link {
            if let Err(e) = link.request_replay(Arc::new(conn.clone())).await {
                conn.close();
                self.connections().retain(|c| c.id() != id);
                return Err(e);
            }
        }

        tracing::debug!(subscriber = %self.id, connection = id, "Connection opened");
        Ok(rx)
    }

    /// Deregister from the stream, which disconnects every connection
    ///
    /// Returns whether the stream still had this subscriber registered. An
    /// unbound subscriber, or one whose stream already closed, just drops its
    /// connections locally.
    pub async fn disconnect(&self) -> Result<bool> {
        match self.link() {
            Some(link) => match link.deregister().await {
                Ok(removed) => Ok(removed),
                Err(e) => {
                    tracing::debug!(subscriber = %self.id, error = %e, "Deregister failed");
                    self.disconnect_all();
                    Err(e)
                }
            },
            None => {
                self.disconnect_all();
                Ok(false)
            }
        }
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections().iter().filter(|c| c.is_open()).count()
    }

    /// Total events dropped across current connections
    pub fn dropped(&self) -> u64 {
        self.connections().iter().map(Connection::dropped).sum()
    }

    fn connections(&self) -> MutexGuard<'_, Vec<Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn link(&self) -> Option<StreamLink> {
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Subscriber for ChannelSubscriber {
    fn id(&self) -> &str {
        &self.id
    }

    fn bind(&self, link: StreamLink) {
        *self.link.lock().unwrap_or_else(PoisonError::into_inner) = Some(link);
    }

    fn broadcast(&self, event: &Event) {
        let mut connections = self.connections();
        connections.retain(Connection::is_open);
        for conn in connections.iter() {
            conn.deliver(event);
        }
    }

    fn disconnect_all(&self) {
        let drained: Vec<Connection> = self.connections().drain(..).collect();
        for conn in &drained {
            conn.close();
        }
        if !drained.is_empty() {
            tracing::debug!(
                subscriber = %self.id,
                connections = drained.len(),
                "Disconnected all connections"
            );
        }
    }

    fn has_connections(&self) -> bool {
        self.connections().iter().any(Connection::is_open)
    }
}

impl std::fmt::Debug for ChannelSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSubscriber")
            .field("id", &self.id)
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbound_connect_is_live() {
        let sub = ChannelSubscriber::new("alice");
        let mut rx = sub.connect().await.unwrap();

        sub.broadcast(&Event::new("a"));
        assert_eq!(rx.recv().await.unwrap().data, "a");
        assert!(sub.has_connections());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_connections() {
        let sub = ChannelSubscriber::new("alice");
        let mut rx1 = sub.connect().await.unwrap();
        let mut rx2 = sub.connect().await.unwrap();
        assert_eq!(sub.connection_count(), 2);

        sub.broadcast(&Event::new("a"));
        assert_eq!(rx1.recv().await.unwrap().data, "a");
        assert_eq!(rx2.recv().await.unwrap().data, "a");
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let sub = ChannelSubscriber::new("alice");
        let rx = sub.connect().await.unwrap();
        drop(rx);

        assert!(!sub.has_connections());
        sub.broadcast(&Event::new("a"));
        assert_eq!(sub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_all_is_idempotent() {
        let sub = ChannelSubscriber::new("alice");
        let mut rx = sub.connect().await.unwrap();

        sub.disconnect_all();
        sub.disconnect_all();

        assert!(!sub.has_connections());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unbound_disconnect() {
        let sub = ChannelSubscriber::new("alice");
        let _rx = sub.connect().await.unwrap();

        assert_eq!(sub.disconnect().await, Ok(false));
        assert!(!sub.has_connections());
    }

    #[tokio::test]
    async fn test_slow_connection_does_not_block() {
        let config = SubscriberConfig::default().connection_buffer(1);
        let sub = ChannelSubscriber::with_config("alice", config);
        let _rx = sub.connect().await.unwrap();

        for i in 0..10 {
            sub.broadcast(&Event::new(i.to_string()));
        }
        assert_eq!(sub.dropped(), 9);
    }
}
