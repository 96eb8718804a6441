//! Subscriber contract and the bundled channel-backed subscriber
//!
//! The stream never talks to a transport directly. It drives subscribers
//! through the [`Subscriber`] trait and pushes history into anything that
//! implements [`EventSink`].
//!
//! # Delivery path
//!
//! ```text
//!   Stream actor ──broadcast(&Event)──► ChannelSubscriber
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                  Connection         Connection         Connection
//!                  try_send()         try_send()         try_send()
//!                       │                  │                  │
//!                       ▼                  ▼                  ▼
//!                 mpsc::Receiver     mpsc::Receiver     mpsc::Receiver
//!                 (client task)      (client task)      (client task)
//! ```
//!
//! Every push is a non-blocking `try_send` into a bounded per-connection
//! buffer, so a stalled client drops its own events instead of stalling the
//! stream.

pub mod channel;
pub mod connection;

pub use channel::{ChannelSubscriber, SubscriberConfig};
pub use connection::{Connection, EventReceiver};

pub use crate::stream::StreamLink;

use crate::event::Event;

/// Something a single event can be pushed into without blocking
pub trait EventSink: Send + Sync {
    /// Push one event
    ///
    /// Returns `false` if the event was not accepted (buffer full or closed).
    fn send_event(&self, event: &Event) -> bool;

    /// Called by the stream right after a history replay into this sink
    fn replay_complete(&self) {}
}

/// A logical client registered on a stream
///
/// All methods are invoked from the stream's processing step and must
/// return promptly.
pub trait Subscriber: Send + Sync + 'static {
    /// Stable identifier
    fn id(&self) -> &str;

    /// Receive back-references to the stream at registration
    fn bind(&self, _link: StreamLink) {}

    /// Deliver one event to every connection
    fn broadcast(&self, event: &Event);

    /// Drop every connection (must tolerate repeat calls)
    fn disconnect_all(&self);

    /// Whether any connection is still open
    fn has_connections(&self) -> bool;
}
